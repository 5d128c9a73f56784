//! Static placement of a kernel shared by threads and interrupt handlers.

use core::cell::RefCell;

use critical_section::Mutex;
use rtk_core::SegmentAllocator;

use crate::kernel::Kernel;
use crate::port::Port;

/// Kernel slot suitable for a `static`.
///
/// Interrupt handlers and thread code reach the kernel through
/// [`with`](Self::with), which holds the critical section for the duration
/// of the closure.
pub struct KernelCell<P: Port, A: SegmentAllocator> {
    inner: Mutex<RefCell<Option<Kernel<P, A>>>>,
}

impl<P: Port, A: SegmentAllocator> KernelCell<P, A> {
    /// Create an empty cell
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Place a kernel in the cell, returning the previous one
    pub fn install(&self, kernel: Kernel<P, A>) -> Option<Kernel<P, A>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(kernel))
    }

    /// Run `f` on the installed kernel; `None` if none is installed
    pub fn with<R>(&self, f: impl FnOnce(&mut Kernel<P, A>) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Check if a kernel is installed
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_some())
    }
}

impl<P: Port, A: SegmentAllocator> Default for KernelCell<P, A> {
    fn default() -> Self {
        Self::new()
    }
}
