#![no_std]
#![forbid(unsafe_code)]

//! # RTK Heap
//!
//! First-fit allocator over a fixed word array, used to load process text
//! and data segments and to reclaim them when a process dies.
//!
//! Every block is framed by two signed boundary tags holding its payload
//! size in words: positive while free, negative while in use. Freeing a
//! block merges it with free neighbours on both sides.

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

pub mod heap;
pub mod shared;

pub use heap::{Block, Heap, HEAP_WORDS};
pub use shared::SharedHeap;

/// Heap errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// Handle does not name an allocated block
    InvalidBlock,
    /// No free block is large enough
    OutOfMemory,
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::InvalidBlock => write!(f, "Invalid heap block"),
            HeapError::OutOfMemory => write!(f, "Out of heap memory"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HeapError {}

#[cfg(feature = "defmt")]
impl defmt::Format for HeapError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            HeapError::InvalidBlock => defmt::write!(fmt, "InvalidBlock"),
            HeapError::OutOfMemory => defmt::write!(fmt, "OutOfMemory"),
        }
    }
}

/// Result type for heap operations
pub type HeapResult<T> = Result<T, HeapError>;

/// Heap usage, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Total heap size including tags
    pub size: usize,
    /// Payload bytes handed out
    pub used: usize,
    /// Payload bytes available
    pub free: usize,
    /// Allocated blocks
    pub used_blocks: usize,
    /// Free blocks
    pub free_blocks: usize,
}

impl HeapStats {
    /// Bytes taken by boundary tags
    pub const fn overhead(&self) -> usize {
        self.size - self.used - self.free
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HeapStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "HeapStats{{ size: {}, used: {}, free: {}, blocks: {}/{} }}",
            self.size,
            self.used,
            self.free,
            self.used_blocks,
            self.free_blocks
        );
    }
}
