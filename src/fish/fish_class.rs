use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FishClass {
    Kilu,
    Raim,
}

impl FishClass {
    pub const ALL: [FishClass; 2] = [FishClass::Kilu, FishClass::Raim];

    /// Maps a classifier output index onto a label. Indices outside the table have no label.
    pub fn from_class_id(class_id: usize) -> Option<FishClass> {
        match class_id {
            0 => Some(FishClass::Kilu),
            1 => Some(FishClass::Raim),
            _ => None,
        }
    }

    pub fn class_id(self) -> usize {
        match self {
            FishClass::Kilu => 0,
            FishClass::Raim => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FishClass::Kilu => "kilu",
            FishClass::Raim => "raim",
        }
    }
}

impl Display for FishClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub label: FishClass,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: FishClass, confidence: f32) -> Classification {
        Classification { label, confidence }
    }
}
