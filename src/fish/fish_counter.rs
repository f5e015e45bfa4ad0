use serde::Serialize;

use crate::fish::{Classification, FishClass};
use crate::Mask;

/// Per-class tallies. Both classes are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    kilu: usize,
    raim: usize,
}

impl ClassCounts {
    pub fn new(kilu: usize, raim: usize) -> ClassCounts {
        ClassCounts { kilu, raim }
    }

    pub fn get(&self, class: FishClass) -> usize {
        match class {
            FishClass::Kilu => self.kilu,
            FishClass::Raim => self.raim,
        }
    }

    fn increment(&mut self, class: FishClass) {
        match class {
            FishClass::Kilu => self.kilu += 1,
            FishClass::Raim => self.raim += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.kilu + self.raim
    }

    pub fn iter(&self) -> impl Iterator<Item = (FishClass, usize)> + '_ {
        FishClass::ALL.into_iter().map(move |class| (class, self.get(class)))
    }
}

pub struct Tally<'a> {
    pub total_count: usize,
    pub per_class_counts: ClassCounts,
    /// Masks to outline, in input order.
    pub accepted: Vec<(&'a Mask, FishClass)>,
}

/// Counts classified instances. Instances without a classification are dropped entirely.
pub fn aggregate<'a, I>(instances: I) -> Tally<'a>
where
    I: IntoIterator<Item = (&'a Mask, Option<&'a Classification>)>,
{
    let mut per_class_counts = ClassCounts::default();
    let mut accepted = Vec::new();

    for (mask, classification) in instances {
        if let Some(classification) = classification {
            per_class_counts.increment(classification.label);
            accepted.push((mask, classification.label));
        }
    }

    Tally {
        total_count: accepted.len(),
        per_class_counts,
        accepted,
    }
}
