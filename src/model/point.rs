//! Prompt points placed by the user.

use serde::{Deserialize, Serialize};

/// Whether a prompt point asks the oracle to include or exclude a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
}

impl Polarity {
    /// Oracle label: 1 for positive, 0 for negative.
    pub fn label(&self) -> u8 {
        match self {
            Polarity::Positive => 1,
            Polarity::Negative => 0,
        }
    }
}

/// A prompt point in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub polarity: Polarity,
}

impl Point {
    pub fn new(x: i32, y: i32, polarity: Polarity) -> Self {
        Self { x, y, polarity }
    }

    pub fn positive(x: i32, y: i32) -> Self {
        Self::new(x, y, Polarity::Positive)
    }

    pub fn negative(x: i32, y: i32) -> Self {
        Self::new(x, y, Polarity::Negative)
    }
}
