//! Bounded FIFO fed from interrupt context and drained by a thread.

use heapless::Deque;
use rtk_core::SegmentAllocator;

use crate::kernel::Kernel;
use crate::port::Port;
use crate::semaphore::Semaphore;

/// Fixed-capacity FIFO whose counting semaphore tracks stored items.
///
/// Producers never block, so `put` is safe from interrupt handlers.
pub struct Fifo<T, const N: usize> {
    items: Deque<T, N>,
    data: Semaphore,
}

impl<T, const N: usize> Fifo<T, N> {
    /// Create a new empty FIFO
    pub const fn new() -> Self {
        Self {
            items: Deque::new(),
            data: Semaphore::new(0),
        }
    }

    /// Append an item; hands it back when the FIFO is full.
    pub fn put<P: Port, A: SegmentAllocator>(
        &mut self,
        kernel: &mut Kernel<P, A>,
        item: T,
    ) -> Result<(), T> {
        self.items.push_back(item)?;
        kernel.signal(&mut self.data);
        Ok(())
    }

    /// Remove the oldest item, blocking while the FIFO is empty.
    ///
    /// Returns `None` only when the caller blocked and the port completes
    /// switches after the call (host simulation).
    pub fn get<P: Port, A: SegmentAllocator>(&mut self, kernel: &mut Kernel<P, A>) -> Option<T> {
        kernel.wait(&mut self.data);
        self.items.pop_front()
    }

    /// Remove the oldest item without blocking.
    pub fn try_get<P: Port, A: SegmentAllocator>(
        &mut self,
        kernel: &mut Kernel<P, A>,
    ) -> nb::Result<T, core::convert::Infallible> {
        if !kernel.try_wait(&mut self.data) {
            return Err(nb::Error::WouldBlock);
        }
        self.items.pop_front().ok_or(nb::Error::WouldBlock)
    }

    /// Number of stored items
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Get the maximum capacity of the FIFO
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Check if the FIFO is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Semaphore consumers wait on.
    pub fn data(&self) -> &Semaphore {
        &self.data
    }
}

impl<T, const N: usize> Default for Fifo<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
