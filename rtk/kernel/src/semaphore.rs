//! Counting and binary semaphores.
//!
//! A semaphore is plain state: a signed value and the head of its blocked
//! list. The wait and signal protocol lives on [`Kernel`](crate::Kernel),
//! which owns the thread records the blocked list threads through.
//!
//! A negative value counts the threads blocked on a counting semaphore.
//! Binary semaphores stay in `{0, 1}`.

use rtk_core::ThreadId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semaphore {
    pub(crate) value: i32,
    pub(crate) head: Option<ThreadId>,
}

impl Semaphore {
    /// Create a semaphore with an initial value and no waiters.
    pub const fn new(value: i32) -> Self {
        Self { value, head: None }
    }

    /// Create a binary semaphore, initially available or taken.
    pub const fn binary(available: bool) -> Self {
        Self::new(if available { 1 } else { 0 })
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    /// True if at least one thread is blocked here.
    pub fn has_waiters(&self) -> bool {
        self.head.is_some()
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Semaphore {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Semaphore({=i32})", self.value);
    }
}
