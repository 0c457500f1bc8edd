//! Task priority ranks.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Priority rank of a task, `S` highest and `D` lowest.
///
/// Ordering follows the rank weight, so `Priority::S > Priority::A`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Drop everything.
    S,
    /// Important and soon.
    A,
    /// Default rank for new tasks.
    #[default]
    B,
    /// Can slip a day.
    C,
    /// Whenever.
    D,
}

impl Priority {
    /// Every rank, highest first.
    pub const ALL: [Self; 5] = [Self::S, Self::A, Self::B, Self::C, Self::D];

    /// Numeric weight of the rank (`S` = 10 … `D` = 1).
    #[must_use]
    pub fn weight(self) -> u8 {
        match self {
            Self::S => 10,
            Self::A => 7,
            Self::B => 5,
            Self::C => 3,
            Self::D => 1,
        }
    }

    /// Single-letter token used on the wire and in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight().cmp(&other.weight())
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "S" | "s" => Ok(Self::S),
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            "D" | "d" => Ok(Self::D),
            other => Err(AppError::Validation(format!(
                "unknown priority '{other}'; expected one of S, A, B, C, D"
            ))),
        }
    }
}
