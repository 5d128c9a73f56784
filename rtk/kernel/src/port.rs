//! Platform boundary: context seeding, deferred switching and timer sources.
//!
//! The kernel decides *whether* and *to what* to switch. A port owns the
//! register-level work: it lays out the initial context of new threads, pends
//! the switch interrupt and, from that interrupt, calls
//! [`Kernel::switch_context`](crate::Kernel::switch_context) to swap saved
//! stack pointers.

use core::fmt;

use rtk_core::{Priority, Segment, ThreadId};

use crate::config::{EDGE_LINES, MAX_PERIODIC, MAX_THREADS, STACK_WORDS};
use crate::thread::EntryPoint;
use crate::timing::EdgeLine;

/// Opaque saved-context handle produced by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackPointer(usize);

impl StackPointer {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for StackPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sp:{:#x}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StackPointer {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "sp:{=usize:#x}", self.0);
    }
}

/// Hardware services the kernel consumes.
///
/// Every method is called with the kernel's critical section held.
pub trait Port {
    /// Build the initial context of `thread` so that its first dispatch
    /// starts at `entry`, with the process data segment (if any) in the
    /// argument register.
    fn seed_context(
        &mut self,
        thread: ThreadId,
        stack_bytes: usize,
        entry: EntryPoint,
        data: Option<Segment>,
    ) -> StackPointer;

    /// Request the deferred context switch.
    fn pend_switch(&mut self);

    /// Start the preemption tick with a period of `slice` timer counts.
    fn start_slice_timer(&mut self, slice: u32);

    /// Counts left before the next preemption tick.
    fn slice_remaining(&self) -> u32;

    /// Give the running thread a fresh slice.
    fn restart_slice(&mut self);

    /// Arm the hardware source of periodic task `slot`.
    fn arm_periodic(&mut self, slot: usize, period_ms: u32, priority: Priority);

    /// Arm the edge interrupt of `line`.
    fn arm_edge(&mut self, line: EdgeLine, priority: Priority);

    /// Bus cycles elapsed inside the current millisecond.
    fn sub_ms_cycles(&self) -> u32;
}

pub mod armv7m {
    //! ARMv7-M exception frame layout.

    /// Words in a seeded frame: eight hardware-stacked, eight software-stacked.
    pub const FRAME_WORDS: usize = 16;

    /// xPSR with only the Thumb bit set.
    pub const XPSR_THUMB: u32 = 0x0100_0000;

    /// R9 value for threads without a process.
    pub const NO_DATA_MARKER: u32 = 0x0909_0909;

    /// Write an initial frame at the top of `stack`.
    ///
    /// Returns the word index of the saved stack pointer, or `None` when the
    /// stack cannot hold a frame. Unused registers carry a recognisable fill
    /// pattern.
    pub fn seed_frame(stack: &mut [u32], entry: u32, r9: u32) -> Option<usize> {
        let sp = stack.len().checked_sub(FRAME_WORDS)?;
        let frame: [u32; FRAME_WORDS] = [
            0x0404_0404, // R4
            0x0505_0505, // R5
            0x0606_0606, // R6
            0x0707_0707, // R7
            0x0808_0808, // R8
            r9,          // R9
            0x1010_1010, // R10
            0x1111_1111, // R11
            0x0000_0000, // R0
            0x0101_0101, // R1
            0x0202_0202, // R2
            0x0303_0303, // R3
            0x1212_1212, // R12
            0x1414_1414, // LR
            entry,       // PC
            XPSR_THUMB,  // xPSR
        ];
        stack[sp..].copy_from_slice(&frame);
        Some(sp)
    }
}

/// Deterministic in-memory port for host tests and simulation.
///
/// Owns one stack per thread slot and records every request the kernel
/// makes instead of touching hardware. Saved stack pointers encode
/// `slot * STACK_WORDS + word`.
pub struct HostPort {
    stacks: [[u32; STACK_WORDS]; MAX_THREADS],
    pended: usize,
    restarts: usize,
    slice: Option<u32>,
    remaining: u32,
    sub_ms: u32,
    periodic: heapless::Vec<(usize, u32, Priority), MAX_PERIODIC>,
    edges: [Option<Priority>; EDGE_LINES],
}

impl HostPort {
    pub fn new() -> Self {
        Self {
            stacks: [[0; STACK_WORDS]; MAX_THREADS],
            pended: 0,
            restarts: 0,
            slice: None,
            remaining: 0,
            sub_ms: 0,
            periodic: heapless::Vec::new(),
            edges: [None; EDGE_LINES],
        }
    }

    /// Consume pending switch requests; true if at least one was made.
    pub fn take_pended(&mut self) -> bool {
        let pended = self.pended > 0;
        self.pended = 0;
        pended
    }

    /// Switch requests made since the last [`take_pended`](Self::take_pended).
    pub fn pended(&self) -> usize {
        self.pended
    }

    /// Number of slice restarts requested so far.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Slice length passed at launch.
    pub fn slice(&self) -> Option<u32> {
        self.slice
    }

    /// Pretend the preemption timer has `counts` left.
    pub fn set_slice_remaining(&mut self, counts: u32) {
        self.remaining = counts;
    }

    /// Pretend `cycles` have elapsed inside the current millisecond.
    pub fn set_sub_ms_cycles(&mut self, cycles: u32) {
        self.sub_ms = cycles;
    }

    /// Periodic sources armed so far as `(slot, period_ms, priority)`.
    pub fn periodic(&self) -> &[(usize, u32, Priority)] {
        &self.periodic
    }

    /// Priority an edge line was armed with.
    pub fn edge(&self, line: EdgeLine) -> Option<Priority> {
        self.edges[line.index()]
    }

    /// Seeded frame a saved stack pointer refers to.
    pub fn frame(&self, sp: StackPointer) -> Option<&[u32]> {
        let stack = self.stacks.get(sp.raw() / STACK_WORDS)?;
        let word = sp.raw() % STACK_WORDS;
        stack.get(word..word + armv7m::FRAME_WORDS)
    }
}

impl Default for HostPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Port for HostPort {
    fn seed_context(
        &mut self,
        thread: ThreadId,
        stack_bytes: usize,
        entry: EntryPoint,
        data: Option<Segment>,
    ) -> StackPointer {
        let slot = thread.index();
        let words = (stack_bytes / 4).min(STACK_WORDS);
        let r9 = data.map_or(armv7m::NO_DATA_MARKER, Segment::register_value);
        let word = armv7m::seed_frame(&mut self.stacks[slot][..words], entry.address() as u32, r9)
            .unwrap_or(0);
        StackPointer::new(slot * STACK_WORDS + word)
    }

    fn pend_switch(&mut self) {
        self.pended += 1;
    }

    fn start_slice_timer(&mut self, slice: u32) {
        self.slice = Some(slice);
        self.remaining = slice;
    }

    fn slice_remaining(&self) -> u32 {
        self.remaining
    }

    fn restart_slice(&mut self) {
        self.restarts += 1;
        if let Some(slice) = self.slice {
            self.remaining = slice;
        }
    }

    fn arm_periodic(&mut self, slot: usize, period_ms: u32, priority: Priority) {
        let _ = self.periodic.push((slot, period_ms, priority));
    }

    fn arm_edge(&mut self, line: EdgeLine, priority: Priority) {
        self.edges[line.index()] = Some(priority);
    }

    fn sub_ms_cycles(&self) -> u32 {
        self.sub_ms
    }
}

#[cfg(test)]
mod tests {
    use super::armv7m::*;
    use super::*;

    #[test]
    fn frame_layout_matches_exception_entry() {
        let mut stack = [0u32; 32];
        let sp = seed_frame(&mut stack, 0x0800_1235, NO_DATA_MARKER).unwrap();
        assert_eq!(sp, 16);
        assert_eq!(stack[31], XPSR_THUMB);
        assert_eq!(stack[30], 0x0800_1235);
        assert_eq!(stack[29], 0x1414_1414);
        assert_eq!(stack[24], 0);
        assert_eq!(stack[21], NO_DATA_MARKER);
        assert_eq!(stack[16], 0x0404_0404);
    }

    #[test]
    fn frame_needs_room() {
        let mut stack = [0u32; FRAME_WORDS - 1];
        assert_eq!(seed_frame(&mut stack, 0, 0), None);
    }

    #[test]
    fn host_port_seeds_data_register() {
        let mut port = HostPort::new();
        let sp = port.seed_context(
            ThreadId::new(2),
            256,
            EntryPoint::from_address(0x2000),
            Some(Segment::new(0x2000_1000)),
        );
        assert_eq!(sp.raw(), 2 * STACK_WORDS + 64 - FRAME_WORDS);
        let frame = port.frame(sp).unwrap();
        assert_eq!(frame[5], 0x2000_1000);
        assert_eq!(frame[14], 0x2000);
    }

    #[test]
    fn host_port_records_requests() {
        let mut port = HostPort::new();
        assert!(!port.take_pended());
        port.pend_switch();
        port.pend_switch();
        assert!(port.take_pended());
        assert!(!port.take_pended());

        port.start_slice_timer(100);
        port.set_slice_remaining(40);
        port.restart_slice();
        assert_eq!(port.slice_remaining(), 100);
        assert_eq!(port.restarts(), 1);
    }
}
