use std::fmt;

use serde::{Deserialize, Serialize};

/// An elevation value, stored as a count of half-steps so that special
/// (transitional) levels like 1.5 compare exactly. Whole levels are firm
/// platforms; half levels only ever appear on step tiles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Level(i32);

impl Level {
    pub const fn new(whole: i32) -> Self {
        Self(whole * 2)
    }

    pub const fn from_halves(halves: i32) -> Self {
        Self(halves)
    }

    pub const fn halves(self) -> i32 {
        self.0
    }

    pub const fn is_whole(self) -> bool {
        self.0 % 2 == 0
    }

    /// The whole level at or below this one.
    pub const fn floor_whole(self) -> i32 {
        self.0.div_euclid(2)
    }

    /// The whole level at or above this one.
    pub const fn ceil_whole(self) -> i32 {
        (self.0 + 1).div_euclid(2)
    }

    /// Parses a decimal level token ("1", "2.5"). Only multiples of 0.5 are
    /// representable; anything finer is rejected.
    pub fn parse(token: &str) -> Option<Self> {
        let value: f64 = token.trim().parse().ok()?;
        let halves = value * 2.0;
        if halves.fract() != 0.0 || halves.abs() > i32::MAX as f64 {
            return None;
        }
        Some(Self(halves as i32))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_whole() {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.floor_whole())
        }
    }
}
