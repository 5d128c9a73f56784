#![no_std]
#![forbid(unsafe_code)]

//! # RTK Kernel
//!
//! Preemptive, priority-based thread scheduler for a single-core
//! microcontroller.
//!
//! Key features:
//! - Priority-ordered ready ring with round-robin among equal priorities
//! - Counting and binary semaphores with priority-ordered blocked lists
//! - Tick-driven sleep manager
//! - Thread and process lifecycle with process memory reclamation
//! - Periodic and edge-triggered background tasks
//! - Mailbox and interrupt-fed FIFO built on the semaphores
//!
//! The register-level context switch lives behind the [`Port`] trait.
//! [`HostPort`] simulates it for tests: entry points pend a switch, and the
//! test completes it by calling [`Kernel::switch_context`] the way the
//! switch interrupt would.

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod error;
pub mod fifo;
pub mod kernel;
pub mod lifecycle;
pub mod mailbox;
pub mod pool;
pub mod port;
pub mod scheduler;
pub mod semaphore;
pub mod shared;
pub mod thread;
pub mod timing;

pub use config::{KernelConfig, KernelConfigBuilder};
pub use error::{KernelError, KernelResult};
pub use fifo::Fifo;
pub use kernel::{Hook, Kernel, KernelStats};
pub use lifecycle::MIN_STACK_BYTES;
pub use mailbox::Mailbox;
pub use pool::PoolStats;
pub use port::{HostPort, Port, StackPointer};
pub use semaphore::Semaphore;
pub use shared::KernelCell;
pub use thread::{EntryPoint, Owner, ProcessRecord, ThreadConfig, ThreadRecord, ThreadState};
pub use timing::{EdgeLine, JitterStats};

pub use rtk_core::{Priority, ProcessId, Segment, SegmentAllocator, ThreadId, Timestamp};
