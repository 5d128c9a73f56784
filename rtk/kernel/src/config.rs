//! Kernel sizing and runtime configuration.

use rtk_core::{ClockScale, RtkResult};

/// Thread pool capacity.
pub const MAX_THREADS: usize = 10;

/// Process pool capacity.
pub const MAX_PROCESSES: usize = 10;

/// Words reserved for each thread stack.
pub const STACK_WORDS: usize = 128;

/// Bytes reserved for each thread stack.
pub const STACK_BYTES: usize = STACK_WORDS * 4;

/// Concurrently registered periodic tasks.
pub const MAX_PERIODIC: usize = 2;

/// External edge-triggered lines.
pub const EDGE_LINES: usize = 2;

/// Buckets in each periodic jitter histogram.
pub const JITTER_BINS: usize = 64;

/// Runtime configuration for a kernel instance.
///
/// Pool limits are clamped to the compile-time capacities above.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub name: &'static str,
    pub max_threads: usize,
    pub max_processes: usize,
    /// Bus cycles per millisecond of the system clock.
    pub cycles_per_ms: u32,
    /// Milliseconds before the millisecond counter wraps.
    pub ms_wrap: u32,
    /// Width of one jitter histogram bucket, in bus cycles.
    pub jitter_bucket_cycles: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "RTK",
            max_threads: MAX_THREADS,
            max_processes: MAX_PROCESSES,
            cycles_per_ms: 80_000,
            ms_wrap: 10_000,
            jitter_bucket_cycles: 80,
        }
    }
}

impl KernelConfig {
    /// Creates a new kernel configuration builder.
    pub fn builder() -> KernelConfigBuilder {
        KernelConfigBuilder::default()
    }

    /// Clock scale described by this configuration.
    pub fn clock_scale(&self) -> RtkResult<ClockScale> {
        ClockScale::new(self.cycles_per_ms, self.ms_wrap)
    }
}

/// Builder for ergonomic kernel configuration construction.
#[derive(Debug, Clone, Default)]
pub struct KernelConfigBuilder {
    config: KernelConfig,
}

impl KernelConfigBuilder {
    /// Sets the kernel name.
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    /// Sets the number of usable thread slots.
    pub fn max_threads(mut self, max: usize) -> Self {
        self.config.max_threads = max.min(MAX_THREADS);
        self
    }

    /// Sets the number of usable process slots.
    pub fn max_processes(mut self, max: usize) -> Self {
        self.config.max_processes = max.min(MAX_PROCESSES);
        self
    }

    /// Sets the bus frequency in cycles per millisecond.
    pub fn cycles_per_ms(mut self, cycles: u32) -> Self {
        self.config.cycles_per_ms = cycles;
        self
    }

    /// Sets the millisecond counter wrap point.
    pub fn ms_wrap(mut self, ms: u32) -> Self {
        self.config.ms_wrap = ms;
        self
    }

    /// Sets the jitter histogram bucket width.
    pub fn jitter_bucket_cycles(mut self, cycles: u32) -> Self {
        self.config.jitter_bucket_cycles = cycles.max(1);
        self
    }

    /// Builds the kernel configuration.
    pub fn build(self) -> KernelConfig {
        self.config
    }
}
