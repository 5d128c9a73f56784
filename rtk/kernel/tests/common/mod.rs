#![allow(dead_code)]

use rtk_kernel::{
    HostPort, Kernel, KernelConfig, Priority, Segment, SegmentAllocator, ThreadConfig, ThreadId,
    EntryPoint,
};

pub const SLICE: u32 = 1_000;
pub const STACK: usize = 256;

/// Allocator that remembers every segment handed back to it.
#[derive(Debug, Default)]
pub struct Recorder {
    pub released: Vec<Segment>,
}

impl SegmentAllocator for Recorder {
    fn release(&mut self, segment: Segment) {
        self.released.push(segment);
    }
}

pub type TestKernel = Kernel<HostPort, Recorder>;

pub fn kernel() -> TestKernel {
    kernel_with(KernelConfig::default())
}

pub fn kernel_with(config: KernelConfig) -> TestKernel {
    Kernel::new(config, HostPort::new(), Recorder::default()).expect("valid config")
}

pub fn body() {}

/// Kernel-only thread at `level`.
pub fn spawn(kernel: &mut TestKernel, level: u8) -> ThreadId {
    kernel
        .create_thread(
            ThreadConfig::new(EntryPoint::from_fn(body))
                .with_stack_size(STACK)
                .with_priority(Priority::new(level)),
        )
        .expect("thread slot")
}

pub fn launch(kernel: &mut TestKernel) {
    kernel.launch(SLICE).expect("launch");
}

/// Complete pended switches the way the switch interrupt would.
/// Returns the number of switches committed.
pub fn settle(kernel: &mut TestKernel) -> usize {
    let mut switches = 0;
    while kernel.port_mut().take_pended() {
        let saved = kernel
            .current_thread()
            .and_then(|id| kernel.thread(id))
            .map(|record| record.stack_pointer())
            .unwrap_or_default();
        kernel.switch_context(saved);
        switches += 1;
    }
    switches
}

pub fn current(kernel: &TestKernel) -> ThreadId {
    kernel.current_thread().expect("a running thread")
}

/// Small deterministic generator for randomized traces.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}
