#![no_std]
#![forbid(unsafe_code)]

//! # RTK Core
//!
//! Leaf types shared by the RTK kernel and its collaborators: thread
//! priorities, pool identifiers, opaque memory segment handles and the
//! millisecond system clock.

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

pub mod ids;
pub mod priority;
pub mod segment;
pub mod time;

pub use ids::*;
pub use priority::*;
pub use segment::*;
pub use time::*;

/// RTK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used by the leaf types
pub type RtkResult<T> = Result<T, RtkError>;

/// Error types for leaf-level operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtkError {
    /// Priority outside the supported range
    InvalidPriority,
    /// Clock configuration that cannot represent a timestamp
    InvalidClock,
    /// Cycle arithmetic does not fit in 32 bits
    Overflow,
}

impl fmt::Display for RtkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtkError::InvalidPriority => write!(f, "Invalid priority level"),
            RtkError::InvalidClock => write!(f, "Invalid clock configuration"),
            RtkError::Overflow => write!(f, "Counter overflow"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RtkError {}

#[cfg(feature = "defmt")]
impl defmt::Format for RtkError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            RtkError::InvalidPriority => defmt::write!(fmt, "InvalidPriority"),
            RtkError::InvalidClock => defmt::write!(fmt, "InvalidClock"),
            RtkError::Overflow => defmt::write!(fmt, "Overflow"),
        }
    }
}
