//! System time, periodic tasks and edge-triggered tasks.

use core::fmt;

use log::{debug, warn};
use rtk_core::{Priority, SegmentAllocator, Timestamp};

use crate::config::{EDGE_LINES, JITTER_BINS, MAX_PERIODIC};
use crate::error::{KernelError, KernelResult};
use crate::kernel::{Hook, Kernel};
use crate::port::Port;

/// External button lines that can trigger a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLine {
    Sw1,
    Sw2,
}

impl EdgeLine {
    pub const ALL: [EdgeLine; EDGE_LINES] = [EdgeLine::Sw1, EdgeLine::Sw2];

    pub const fn index(self) -> usize {
        match self {
            EdgeLine::Sw1 => 0,
            EdgeLine::Sw2 => 1,
        }
    }
}

impl fmt::Display for EdgeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeLine::Sw1 => write!(f, "SW1"),
            EdgeLine::Sw2 => write!(f, "SW2"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EdgeLine {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            EdgeLine::Sw1 => defmt::write!(fmt, "SW1"),
            EdgeLine::Sw2 => defmt::write!(fmt, "SW2"),
        }
    }
}

/// Deviation of a periodic task's actual period from its nominal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitterStats {
    bucket_cycles: u32,
    max_cycles: u32,
    samples: u32,
    histogram: [u32; JITTER_BINS],
}

impl JitterStats {
    pub fn new(bucket_cycles: u32) -> Self {
        Self {
            bucket_cycles: bucket_cycles.max(1),
            max_cycles: 0,
            samples: 0,
            histogram: [0; JITTER_BINS],
        }
    }

    /// Add one deviation sample; the last bucket collects the overflow.
    pub fn record(&mut self, deviation: u32) {
        self.max_cycles = self.max_cycles.max(deviation);
        self.samples = self.samples.saturating_add(1);
        let bin = ((deviation / self.bucket_cycles) as usize).min(JITTER_BINS - 1);
        self.histogram[bin] = self.histogram[bin].saturating_add(1);
    }

    /// Largest deviation seen, in bus cycles.
    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn histogram(&self) -> &[u32; JITTER_BINS] {
        &self.histogram
    }

    pub fn bucket_cycles(&self) -> u32 {
        self.bucket_cycles
    }
}

pub(crate) struct PeriodicTask<P: Port, A: SegmentAllocator> {
    hook: Hook<P, A>,
    period_ms: u32,
    last: Option<Timestamp>,
    jitter: JitterStats,
}

impl<P: Port, A: SegmentAllocator> Kernel<P, A> {
    /// Register a background task run every `period_ms` by a hardware timer.
    ///
    /// Returns the slot the port's timer interrupt passes to
    /// [`on_periodic`](Self::on_periodic).
    pub fn add_periodic_task(
        &mut self,
        hook: Hook<P, A>,
        period_ms: u32,
        priority: Priority,
    ) -> KernelResult<usize> {
        critical_section::with(|_| {
            let slot = self.periodic.len();
            let task = PeriodicTask {
                hook,
                period_ms,
                last: None,
                jitter: JitterStats::new(self.config.jitter_bucket_cycles),
            };
            if self.periodic.push(task).is_err() {
                warn!("periodic task rejected: {} slots in use", MAX_PERIODIC);
                return Err(KernelError::PeriodicSlotsFull);
            }
            self.port.arm_periodic(slot, period_ms, priority);
            debug!("periodic task {} every {} ms at {}", slot, period_ms, priority);
            Ok(slot)
        })
    }

    /// Timer interrupt of periodic slot `slot`: measure jitter, run the hook.
    pub fn on_periodic(&mut self, slot: usize) {
        let hook = critical_section::with(|_| {
            let now = self.now();
            let scale = self.scale;
            let task = self.periodic.get_mut(slot)?;
            if let Some(last) = task.last {
                let expected = task.period_ms.saturating_mul(scale.cycles_per_ms());
                let actual = scale.difference(last, now);
                task.jitter.record(actual.abs_diff(expected));
            }
            task.last = Some(now);
            Some(task.hook)
        });
        if let Some(hook) = hook {
            hook(self);
        }
    }

    /// Jitter measured for periodic slot `slot`.
    pub fn jitter(&self, slot: usize) -> Option<&JitterStats> {
        self.periodic.get(slot).map(|task| &task.jitter)
    }

    /// Register the task run on each edge of `line`, replacing any previous one.
    pub fn add_edge_task(&mut self, line: EdgeLine, hook: Hook<P, A>, priority: Priority) {
        critical_section::with(|_| {
            self.edges[line.index()] = Some(hook);
            self.port.arm_edge(line, priority);
            debug!("edge task on {} at {}", line, priority);
        });
    }

    /// Edge interrupt of `line`.
    pub fn on_edge(&mut self, line: EdgeLine) {
        let hook = critical_section::with(|_| self.edges[line.index()]);
        if let Some(hook) = hook {
            hook(self);
        }
    }

    /// Cycle-resolution time inside the current clock window.
    pub fn now(&self) -> Timestamp {
        self.scale.timestamp(self.clock.ms(), self.port.sub_ms_cycles())
    }

    /// Cycles from `start` to `stop`, correcting one clock window wrap.
    pub fn time_difference(&self, start: Timestamp, stop: Timestamp) -> u32 {
        self.scale.difference(start, stop)
    }

    /// Milliseconds inside the current clock window.
    pub fn ms_time(&self) -> u32 {
        self.clock.ms()
    }

    /// Milliseconds since the clock was last cleared.
    pub fn uptime_ms(&self) -> u64 {
        self.clock.uptime_ms()
    }

    pub fn clear_ms_time(&mut self) {
        critical_section::with(|_| self.clock.clear());
    }
}
