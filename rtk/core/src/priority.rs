//! Thread priorities

use core::fmt;
use crate::{RtkError, RtkResult};

/// Thread priority level, where 0 is the most urgent.
///
/// The derived ordering compares raw levels, so `Priority::HIGHEST` is the
/// *smallest* value. Prefer [`Priority::is_higher_than`] in scheduling code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(u8);

impl Priority {
    /// Most urgent priority level
    pub const HIGHEST: Priority = Priority(0);

    /// Least urgent priority level
    pub const LOWEST: Priority = Priority(u8::MAX);

    /// Create a priority level
    pub const fn new(level: u8) -> Self {
        Priority(level)
    }

    /// Create a priority from a wide integer, rejecting values above `u8::MAX`
    pub fn from_level(level: u32) -> RtkResult<Self> {
        u8::try_from(level)
            .map(Priority)
            .map_err(|_| RtkError::InvalidPriority)
    }

    /// Get the raw priority level
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// True if `self` should run in preference to `other`
    pub const fn is_higher_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl TryFrom<u32> for Priority {
    type Error = RtkError;

    fn try_from(level: u32) -> RtkResult<Self> {
        Priority::from_level(level)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Priority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Priority({})", self.0);
    }
}

/// Macro to create compile-time priority constants
#[macro_export]
macro_rules! priority {
    ($value:literal) => {
        $crate::Priority::new($value)
    };
}
