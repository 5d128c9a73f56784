//! Heap shared between threads and the kernel's process teardown.

use core::cell::RefCell;

use critical_section::Mutex;
use rtk_core::{Segment, SegmentAllocator};

use crate::heap::{Block, Heap, HEAP_WORDS};
use crate::{HeapResult, HeapStats};

/// Heap guarded by a critical section, suitable for a `static`.
///
/// A `&SharedHeap` is itself a [`SegmentAllocator`], so one heap can serve
/// both the process loader and the kernel.
pub struct SharedHeap<const W: usize = HEAP_WORDS> {
    inner: Mutex<RefCell<Heap<W>>>,
}

impl<const W: usize> SharedHeap<W> {
    /// Create a heap holding one free block
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Heap::new())),
        }
    }

    /// Run `f` with exclusive access to the heap
    pub fn with<R>(&self, f: impl FnOnce(&mut Heap<W>) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.inner.borrow_ref_mut(cs)))
    }

    pub fn malloc(&self, bytes: usize) -> HeapResult<Block> {
        self.with(|heap| heap.malloc(bytes))
    }

    pub fn calloc(&self, bytes: usize) -> HeapResult<Block> {
        self.with(|heap| heap.calloc(bytes))
    }

    pub fn realloc(&self, block: Block, bytes: usize) -> HeapResult<Block> {
        self.with(|heap| heap.realloc(block, bytes))
    }

    pub fn free(&self, block: Block) -> HeapResult<()> {
        self.with(|heap| heap.free(block))
    }

    pub fn stats(&self) -> HeapStats {
        self.with(|heap| heap.stats())
    }
}

impl<const W: usize> Default for SharedHeap<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize> SegmentAllocator for &SharedHeap<W> {
    fn release(&mut self, segment: Segment) {
        self.with(|heap| heap.release(segment));
    }
}
