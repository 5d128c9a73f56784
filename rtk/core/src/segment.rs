//! Opaque memory segment handles and the allocator seam

/// Handle to a block of memory owned by an allocator.
///
/// The kernel never dereferences a segment. It only stores process text and
/// data handles, passes the data handle to process threads as their implicit
/// argument, and hands both back to the allocator at process teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Segment(usize);

impl Segment {
    /// Wrap an allocator-defined handle value
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Allocator-defined handle value
    pub const fn raw(self) -> usize {
        self.0
    }

    /// Value placed in a general-purpose register of a new process thread
    pub const fn register_value(self) -> u32 {
        self.0 as u32
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Segment {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Segment({=usize:#x})", self.0);
    }
}

/// Memory allocator consumed by the kernel at process teardown
pub trait SegmentAllocator {
    /// Return a segment to the allocator
    fn release(&mut self, segment: Segment);
}

/// Kernels without processes need no allocator
impl SegmentAllocator for () {
    fn release(&mut self, _segment: Segment) {}
}

impl<A: SegmentAllocator + ?Sized> SegmentAllocator for &mut A {
    fn release(&mut self, segment: Segment) {
        (**self).release(segment);
    }
}
