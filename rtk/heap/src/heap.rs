//! Boundary-tag heap over a word array.

use log::{trace, warn};
use rtk_core::{Segment, SegmentAllocator};

use crate::{HeapError, HeapResult, HeapStats};

/// Default heap size in 32-bit words.
pub const HEAP_WORDS: usize = 2048;

/// Header plus trailer.
const TAG_WORDS: usize = 2;

/// Handle to an allocated block: the word index of its first payload word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block(usize);

impl Block {
    /// Word index of the first payload word
    pub const fn index(self) -> usize {
        self.0
    }

    /// Segment handle the kernel stores for this block
    pub const fn segment(self) -> Segment {
        Segment::new(self.0)
    }

    /// Block named by a segment handle issued by [`segment`](Self::segment)
    pub const fn from_segment(segment: Segment) -> Self {
        Self(segment.raw())
    }
}

impl From<Block> for Segment {
    fn from(block: Block) -> Self {
        block.segment()
    }
}

/// Walks block headers from the bottom of the heap.
struct Tags<'a> {
    words: &'a [i32],
    at: usize,
}

impl Iterator for Tags<'_> {
    /// Header index and tag.
    type Item = (usize, i32);

    fn next(&mut self) -> Option<Self::Item> {
        let tag = *self.words.get(self.at)?;
        let size = tag.unsigned_abs() as usize;
        let end = self.at + size + 1;
        if tag == 0 || end >= self.words.len() || self.words[end] != tag {
            // corrupted tags end the walk
            self.at = self.words.len();
            return None;
        }
        let header = self.at;
        self.at = end + 1;
        Some((header, tag))
    }
}

/// First-fit heap of `W` words.
///
/// Payload sizes are whole words; byte requests are rounded up.
pub struct Heap<const W: usize = HEAP_WORDS> {
    words: [i32; W],
}

impl<const W: usize> Heap<W> {
    /// Create a heap holding one free block
    pub const fn new() -> Self {
        assert!(W > TAG_WORDS, "heap must hold at least one payload word");
        let mut words = [0; W];
        let payload = (W - TAG_WORDS) as i32;
        words[0] = payload;
        words[W - 1] = payload;
        Self { words }
    }

    /// Drop every allocation
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn tags(&self) -> Tags<'_> {
        Tags {
            words: &self.words,
            at: 0,
        }
    }

    fn words_for(bytes: usize) -> usize {
        bytes.div_ceil(4).max(1)
    }

    fn mark_used(&mut self, header: usize, size: usize) {
        let tag = -(size as i32);
        self.words[header] = tag;
        self.words[header + size + 1] = tag;
    }

    fn mark_free(&mut self, header: usize, size: usize) {
        let tag = size as i32;
        self.words[header] = tag;
        self.words[header + size + 1] = tag;
    }

    /// Payload size in words of an allocated block.
    fn validate(&self, block: Block) -> HeapResult<usize> {
        let header = block.0.checked_sub(1).ok_or(HeapError::InvalidBlock)?;
        self.tags()
            .find(|&(start, _)| start == header)
            .filter(|&(_, tag)| tag < 0)
            .map(|(_, tag)| tag.unsigned_abs() as usize)
            .ok_or(HeapError::InvalidBlock)
    }

    /// Allocate at least `bytes`, contents unspecified
    pub fn malloc(&mut self, bytes: usize) -> HeapResult<Block> {
        let needed = Self::words_for(bytes);
        let Some((header, tag)) = self
            .tags()
            .find(|&(_, tag)| tag > 0 && tag as usize >= needed)
        else {
            warn!("heap: no block of {} words", needed);
            return Err(HeapError::OutOfMemory);
        };

        let size = tag as usize;
        if size >= needed + TAG_WORDS + 1 {
            let rest = header + needed + TAG_WORDS;
            self.mark_used(header, needed);
            self.mark_free(rest, size - needed - TAG_WORDS);
        } else {
            // too small a remainder to carry its own tags
            self.mark_used(header, size);
        }
        trace!("heap: {} words at {}", needed, header + 1);
        Ok(Block(header + 1))
    }

    /// Allocate at least `bytes`, zero-filled
    pub fn calloc(&mut self, bytes: usize) -> HeapResult<Block> {
        let block = self.malloc(bytes)?;
        self.payload_mut(block)?.fill(0);
        Ok(block)
    }

    /// Move `block` into a new allocation of `bytes`, copying what fits.
    ///
    /// On failure the original block is left untouched.
    pub fn realloc(&mut self, block: Block, bytes: usize) -> HeapResult<Block> {
        let old_size = self.validate(block)?;
        let fresh = self.malloc(bytes)?;
        let new_size = self.validate(fresh)?;
        let keep = old_size.min(new_size);
        self.words
            .copy_within(block.0..block.0 + keep, fresh.0);
        self.free(block)?;
        Ok(fresh)
    }

    /// Return a block, merging it with free neighbours
    pub fn free(&mut self, block: Block) -> HeapResult<()> {
        let size = self.validate(block)?;
        let mut start = block.0 - 1;
        let mut end = block.0 + size;

        if start > 0 && self.words[start - 1] > 0 {
            start -= self.words[start - 1] as usize + TAG_WORDS;
        }
        if end + 1 < W && self.words[end + 1] > 0 {
            end += self.words[end + 1] as usize + TAG_WORDS;
        }
        self.mark_free(start, end - start - 1);
        trace!("heap: freed {} words at {}", size, block.0);
        Ok(())
    }

    /// Payload of an allocated block
    pub fn payload(&self, block: Block) -> HeapResult<&[i32]> {
        let size = self.validate(block)?;
        Ok(&self.words[block.0..block.0 + size])
    }

    /// Mutable payload of an allocated block
    pub fn payload_mut(&mut self, block: Block) -> HeapResult<&mut [i32]> {
        let size = self.validate(block)?;
        Ok(&mut self.words[block.0..block.0 + size])
    }

    /// Current usage
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            size: W * 4,
            ..HeapStats::default()
        };
        for (_, tag) in self.tags() {
            let bytes = tag.unsigned_abs() as usize * 4;
            if tag > 0 {
                stats.free += bytes;
                stats.free_blocks += 1;
            } else {
                stats.used += bytes;
                stats.used_blocks += 1;
            }
        }
        stats
    }

    /// True when the tags tile the whole array and no two free blocks touch
    pub fn is_consistent(&self) -> bool {
        let mut covered = 0;
        let mut previous_free = false;
        for (header, tag) in self.tags() {
            if header != covered || (tag > 0 && previous_free) {
                return false;
            }
            covered = header + tag.unsigned_abs() as usize + TAG_WORDS;
            previous_free = tag > 0;
        }
        covered == W
    }
}

impl<const W: usize> Default for Heap<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const W: usize> SegmentAllocator for Heap<W> {
    fn release(&mut self, segment: Segment) {
        if let Err(err) = self.free(Block::from_segment(segment)) {
            warn!("heap: release of {:?} failed: {}", segment, err);
        }
    }
}
