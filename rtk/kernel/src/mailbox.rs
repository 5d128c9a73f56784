//! Single-slot mailbox for one-item producer/consumer handoff.

use rtk_core::SegmentAllocator;

use crate::kernel::Kernel;
use crate::port::Port;
use crate::semaphore::Semaphore;

/// One-item mailbox built from two binary semaphores.
///
/// `box_free` is taken by a sender and given back by the receiver;
/// `data_valid` is given by the sender and taken by the receiver.
pub struct Mailbox<T> {
    slot: Option<T>,
    box_free: Semaphore,
    data_valid: Semaphore,
}

impl<T> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            slot: None,
            box_free: Semaphore::binary(true),
            data_valid: Semaphore::binary(false),
        }
    }

    /// Post `item`, blocking while earlier mail is unread.
    ///
    /// The item is handed back if the box is still occupied once the wait
    /// returns, which only happens when the port completes switches after
    /// the call (host simulation).
    pub fn send<P: Port, A: SegmentAllocator>(
        &mut self,
        kernel: &mut Kernel<P, A>,
        item: T,
    ) -> Result<(), T> {
        kernel.bwait(&mut self.box_free);
        if self.slot.is_some() {
            return Err(item);
        }
        self.slot = Some(item);
        kernel.bsignal(&mut self.data_valid);
        Ok(())
    }

    /// Take the mail, blocking while the box is empty.
    ///
    /// Returns `None` only when the caller blocked and the port completes
    /// switches after the call (host simulation).
    pub fn recv<P: Port, A: SegmentAllocator>(&mut self, kernel: &mut Kernel<P, A>) -> Option<T> {
        kernel.bwait(&mut self.data_valid);
        let item = self.slot.take()?;
        kernel.bsignal(&mut self.box_free);
        Some(item)
    }

    /// Take the mail without blocking.
    pub fn try_recv<P: Port, A: SegmentAllocator>(
        &mut self,
        kernel: &mut Kernel<P, A>,
    ) -> nb::Result<T, core::convert::Infallible> {
        if !kernel.try_bwait(&mut self.data_valid) {
            return Err(nb::Error::WouldBlock);
        }
        let item = self.slot.take().ok_or(nb::Error::WouldBlock)?;
        kernel.bsignal(&mut self.box_free);
        Ok(item)
    }

    /// True while unread mail is waiting.
    pub fn is_full(&self) -> bool {
        self.slot.is_some()
    }

    /// Semaphore senders wait on.
    pub fn box_free(&self) -> &Semaphore {
        &self.box_free
    }

    /// Semaphore receivers wait on.
    pub fn data_valid(&self) -> &Semaphore {
        &self.data_valid
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
