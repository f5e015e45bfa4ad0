use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError};
use tracing::warn;

use crate::CollaboratorError;

/// Runs a collaborator call, giving up after `timeout`.
///
/// Without a timeout the call runs inline. With one it runs on a worker thread; when the
/// deadline passes the worker is left to finish on its own and its result is dropped.
pub fn run_bounded<T, F>(timeout: Option<Duration>, call: F) -> Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
{
    let timeout = match timeout {
        Some(timeout) => timeout,
        None => return call(),
    };

    let (sender, receiver) = channel::bounded(1);
    thread::Builder::new()
        .name("fishcount-collaborator".into())
        .spawn(move || {
            // the receiver is gone once the caller timed out
            let _ = sender.send(call());
        })?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(?timeout, "collaborator call timed out");
            Err(CollaboratorError::Timeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(CollaboratorError::WorkerLost),
    }
}
