//! Thread and process records.
//!
//! A thread record is a member of exactly one of: the ready ring, one
//! semaphore's blocked list, or the sleep list. All three structures thread
//! through the same `link` field.

use core::fmt;

use rtk_core::{Priority, ProcessId, Segment, SleepCounter, ThreadId};

use crate::config::STACK_BYTES;
use crate::port::StackPointer;

/// Thread execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadState {
    /// Thread owns the CPU.
    Running,
    /// Thread is in the ready ring, waiting for the CPU.
    Ready,
    /// Thread is waiting on a semaphore.
    Blocked,
    /// Thread is counting down on the sleep list.
    Sleeping,
    /// Slot is free or the thread has killed itself.
    #[default]
    Terminated,
}

impl ThreadState {
    /// True for states that place a thread in the ready ring.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Ready)
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Ready => "ready",
            Self::Blocked => "blocked",
            Self::Sleeping => "sleeping",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ThreadState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Running => defmt::write!(fmt, "Running"),
            Self::Ready => defmt::write!(fmt, "Ready"),
            Self::Blocked => defmt::write!(fmt, "Blocked"),
            Self::Sleeping => defmt::write!(fmt, "Sleeping"),
            Self::Terminated => defmt::write!(fmt, "Terminated"),
        }
    }
}

/// Code address a new thread starts executing at.
///
/// Kernel threads start at a function; process threads start at an address
/// inside their process text segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryPoint(usize);

impl EntryPoint {
    /// Entry at a function compiled into the image.
    pub fn from_fn(entry: fn()) -> Self {
        Self(entry as usize)
    }

    /// Entry at a raw code address.
    pub const fn from_address(address: usize) -> Self {
        Self(address)
    }

    /// Raw code address.
    pub const fn address(self) -> usize {
        self.0
    }
}

/// Per-thread descriptor held in the thread pool.
#[derive(Debug, Clone, Default)]
pub struct ThreadRecord {
    pub(crate) priority: Priority,
    pub(crate) state: ThreadState,
    pub(crate) sleep: SleepCounter,
    pub(crate) sp: StackPointer,
    pub(crate) elapsed: u32,
    pub(crate) process: Option<ProcessId>,
    pub(crate) link: Option<ThreadId>,
}

impl ThreadRecord {
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Ticks left before a sleeping thread wakes.
    pub fn sleep_ticks(&self) -> u32 {
        self.sleep.ticks()
    }

    /// Saved context; meaningful only while the thread is not running.
    pub fn stack_pointer(&self) -> StackPointer {
        self.sp
    }

    /// Slice time consumed when the thread was last preempted.
    pub fn elapsed_slice(&self) -> u32 {
        self.elapsed
    }

    pub fn process(&self) -> Option<ProcessId> {
        self.process
    }
}

/// Per-process descriptor held in the process pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRecord {
    pub(crate) text: Segment,
    pub(crate) data: Segment,
}

impl ProcessRecord {
    pub fn text(&self) -> Segment {
        self.text
    }

    pub fn data(&self) -> Segment {
        self.data
    }
}

/// Who owns a thread being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Owner {
    /// Kernel-only thread.
    #[default]
    Kernel,
    /// Same process as the calling thread.
    Caller,
    /// Explicit process.
    Process(ProcessId),
}

/// Configuration for creating a thread.
#[derive(Debug, Clone, Copy)]
pub struct ThreadConfig {
    /// Code address the thread starts at.
    pub entry: EntryPoint,
    /// Stack size in bytes.
    pub stack_size: usize,
    /// Thread priority, 0 is the most urgent.
    pub priority: Priority,
    /// Owning process.
    pub owner: Owner,
}

impl ThreadConfig {
    /// Creates a kernel thread configuration with a full stack and the
    /// lowest priority.
    pub fn new(entry: EntryPoint) -> Self {
        Self {
            entry,
            stack_size: STACK_BYTES,
            priority: Priority::LOWEST,
            owner: Owner::Kernel,
        }
    }

    /// Sets the stack size for the thread.
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    /// Sets the thread priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the owning process.
    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }
}
