//! Pool slot identifiers
//!
//! Identifiers are slot indices. A slot is reused after its owner is
//! released, so an identifier is only meaningful while the owner is live.

use core::fmt;

/// Thread identifier (index into the thread pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(u8);

impl ThreadId {
    /// Create a thread identifier from a pool index
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Pool index of this thread
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw identifier value
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ThreadId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "T{}", self.0);
    }
}

/// Process identifier (index into the process pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u8);

impl ProcessId {
    /// Create a process identifier from a pool index
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Pool index of this process
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ProcessId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "P{}", self.0);
    }
}
