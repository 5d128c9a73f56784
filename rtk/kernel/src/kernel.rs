//! Scheduler driver: the entry points that decide whether a context switch
//! is needed and hand the decision to the port.
//!
//! Every entry point mutates kernel state inside `critical_section::with`.
//! A switch is two-phase: entry points update `next` and pend the switch;
//! the port's switch interrupt later calls [`Kernel::switch_context`] to
//! commit it.

use heapless::Vec;
use log::{debug, error, trace};
use rtk_core::{ClockScale, SegmentAllocator, SystemClock, ThreadId};

use crate::config::{KernelConfig, EDGE_LINES, MAX_PERIODIC, MAX_PROCESSES, MAX_THREADS};
use crate::error::{KernelError, KernelResult};
use crate::pool::{Pool, PoolStats};
use crate::port::{Port, StackPointer};
use crate::scheduler::Scheduler;
use crate::semaphore::Semaphore;
use crate::thread::{ProcessRecord, ThreadRecord, ThreadState};
use crate::timing::PeriodicTask;

/// Callback run by a periodic or edge-triggered source.
///
/// Hooks run to completion outside the kernel critical section. They may
/// signal semaphores or create threads, but must not block, sleep or kill.
pub type Hook<P, A> = fn(&mut Kernel<P, A>);

/// Thread and process pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelStats {
    pub threads: PoolStats,
    pub processes: PoolStats,
}

/// A kernel instance: pools, queues, timing sources and the port it drives.
pub struct Kernel<P: Port, A: SegmentAllocator = ()> {
    pub(crate) config: KernelConfig,
    pub(crate) scale: ClockScale,
    pub(crate) sched: Scheduler,
    pub(crate) processes: Pool<ProcessRecord, MAX_PROCESSES>,
    pub(crate) periodic: Vec<PeriodicTask<P, A>, MAX_PERIODIC>,
    pub(crate) edges: [Option<Hook<P, A>>; EDGE_LINES],
    pub(crate) clock: SystemClock,
    pub(crate) port: P,
    pub(crate) allocator: A,
    launched: bool,
    slice: u32,
    switch_pending: bool,
}

impl<P: Port, A: SegmentAllocator> Kernel<P, A> {
    /// Create a kernel with no threads.
    pub fn new(config: KernelConfig, port: P, allocator: A) -> KernelResult<Self> {
        let scale = config.clock_scale()?;
        debug!(
            "{}: {} threads, {} processes, {} cycles/ms",
            config.name, config.max_threads, config.max_processes, config.cycles_per_ms
        );
        Ok(Self {
            sched: Scheduler::new(config.max_threads),
            processes: Pool::new(config.max_processes),
            periodic: Vec::new(),
            edges: [None; EDGE_LINES],
            clock: SystemClock::new(config.ms_wrap),
            scale,
            config,
            port,
            allocator,
            launched: false,
            slice: 0,
            switch_pending: false,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Time slice passed at launch.
    pub fn slice(&self) -> u32 {
        self.slice
    }

    /// True between a pended switch and its commit.
    pub fn is_switch_pending(&self) -> bool {
        self.switch_pending
    }

    /// Start dispatching. Returns the initial stack pointer of the most
    /// urgent thread; start-up code loads it and never returns.
    pub fn launch(&mut self, slice: u32) -> KernelResult<StackPointer> {
        critical_section::with(|_| {
            if self.launched {
                return Err(KernelError::AlreadyLaunched);
            }
            let Some(first) = self.sched.run() else {
                return Err(KernelError::NoThreads);
            };
            self.launched = true;
            self.slice = slice;
            self.sched.set_next(Some(first));
            let record = self.sched.record_mut(first);
            record.state = ThreadState::Running;
            let sp = record.sp;
            self.port.start_slice_timer(slice);
            debug!("launched {} with a slice of {}", first, slice);
            Ok(sp)
        })
    }

    /// Commit a pended switch.
    ///
    /// Called by the port's switch interrupt with the outgoing thread's saved
    /// stack pointer; returns the stack pointer to restore.
    pub fn switch_context(&mut self, saved: StackPointer) -> StackPointer {
        critical_section::with(|_| {
            self.switch_pending = false;
            if let Some(from) = self.sched.run() {
                // a killed thread's slot is already free; its context is dropped
                if let Some(record) = self.sched.threads_mut().get_mut(from.index()) {
                    record.sp = saved;
                    if record.state == ThreadState::Running {
                        record.state = ThreadState::Ready;
                    }
                }
            }
            let Some(to) = self.sched.next() else {
                return saved;
            };
            self.sched.set_run(Some(to));
            let record = self.sched.record_mut(to);
            record.state = ThreadState::Running;
            trace!("switched to {}", to);
            record.sp
        })
    }

    /// Preemption tick: round-robin among peers of the running thread.
    pub fn preempt_tick(&mut self) {
        critical_section::with(|_| self.reselect_lax());
    }

    /// System tick: advance the clock and run the sleep manager.
    pub fn system_tick(&mut self) {
        critical_section::with(|_| {
            self.clock.tick();
            let preempt = self.sched.tick_sleepers();
            self.after_insert(preempt);
        });
    }

    /// Counting wait: take one unit or block until signalled.
    pub fn wait(&mut self, sem: &mut Semaphore) {
        if sem.value <= 0 && !self.can_block() {
            return;
        }
        critical_section::with(|_| {
            sem.value -= 1;
            if sem.value < 0 {
                self.block_current(sem);
            }
        });
    }

    /// Counting signal: release one unit, waking the most urgent waiter.
    pub fn signal(&mut self, sem: &mut Semaphore) {
        critical_section::with(|_| {
            sem.value += 1;
            if sem.value <= 0 {
                if let Some(thread) = self.sched.pop_blocked(&mut sem.head) {
                    self.make_ready(thread);
                }
            }
        });
    }

    /// Binary wait: take the semaphore or block until signalled.
    pub fn bwait(&mut self, sem: &mut Semaphore) {
        if sem.value == 0 && !self.can_block() {
            return;
        }
        critical_section::with(|_| {
            if sem.value == 0 {
                self.block_current(sem);
            } else {
                sem.value = 0;
            }
        });
    }

    /// Binary signal: hand the semaphore to the most urgent waiter, or mark
    /// it available.
    pub fn bsignal(&mut self, sem: &mut Semaphore) {
        critical_section::with(|_| match self.sched.pop_blocked(&mut sem.head) {
            Some(thread) => self.make_ready(thread),
            None => sem.value = 1,
        });
    }

    /// Counting wait that never blocks; true if a unit was taken.
    pub fn try_wait(&mut self, sem: &mut Semaphore) -> bool {
        critical_section::with(|_| {
            if sem.value > 0 {
                sem.value -= 1;
                true
            } else {
                false
            }
        })
    }

    /// Binary wait that never blocks; true if the semaphore was taken.
    pub fn try_bwait(&mut self, sem: &mut Semaphore) -> bool {
        critical_section::with(|_| {
            if sem.value > 0 {
                sem.value = 0;
                true
            } else {
                false
            }
        })
    }

    /// Put the running thread to sleep for `ms` system ticks.
    ///
    /// `sleep(0)` is a cooperative yield to an equal-priority peer.
    pub fn sleep(&mut self, ms: u32) {
        if ms == 0 {
            self.yield_now();
            return;
        }
        critical_section::with(|_| {
            let Some(run) = self.current_in_ring() else {
                error!("sleep outside a running thread");
                return;
            };
            let next = self.sched.select_required();
            self.sched.set_next(next);
            self.sched.ring_remove(run);
            self.sched.push_sleeper(run, ms);
            trace!("{} sleeps {} ms", run, ms);
            self.request_switch();
        });
    }

    /// Give the CPU to the next equal-priority peer, if any.
    pub fn yield_now(&mut self) {
        critical_section::with(|_| self.reselect_lax());
    }

    fn reselect_lax(&mut self) {
        if self.switch_pending || self.current_in_ring().is_none() {
            return;
        }
        let next = self.sched.select_lax();
        self.sched.set_next(next);
        self.request_switch();
    }

    pub(crate) fn current_in_ring(&self) -> Option<ThreadId> {
        if !self.launched {
            return None;
        }
        self.sched.run().filter(|&run| self.sched.in_ring(run))
    }

    /// A wait that cannot be satisfied needs a running thread to park.
    fn can_block(&self) -> bool {
        let running = self.current_in_ring().is_some();
        if !running {
            error!("blocking wait outside a running thread");
        }
        debug_assert!(running, "blocking wait outside a running thread");
        running
    }

    fn block_current(&mut self, sem: &mut Semaphore) {
        let Some(run) = self.current_in_ring() else {
            return;
        };
        let next = self.sched.select_required();
        self.sched.set_next(next);
        self.sched.ring_remove(run);
        self.sched.enqueue_blocked(&mut sem.head, run);
        trace!("{} blocked", run);
        self.request_switch();
    }

    /// Move a detached thread into the ready ring.
    pub(crate) fn make_ready(&mut self, thread: ThreadId) {
        let preempt = self.sched.insert_ready(thread);
        self.after_insert(preempt);
    }

    /// Act on an insertion that outranked the running thread. Before launch
    /// the new thread simply becomes the one launch will dispatch.
    pub(crate) fn after_insert(&mut self, preempt: bool) {
        if !preempt {
            return;
        }
        if self.launched {
            self.request_switch();
        } else {
            self.sched.set_run(self.sched.next());
        }
    }

    /// Hand the current `next` decision to the port.
    pub(crate) fn request_switch(&mut self) {
        if self.sched.active() == 0 {
            error!("no ready thread left to dispatch");
            return;
        }
        let run = self.sched.run();
        if self.sched.next() == run {
            if let Some(run) = run {
                let record = self.sched.record_mut(run);
                record.elapsed = 0;
                if record.state == ThreadState::Ready {
                    record.state = ThreadState::Running;
                }
            }
            self.port.restart_slice();
            trace!("slice restarted");
        } else {
            if let Some(run) = run.filter(|r| self.sched.threads().is_live(r.index())) {
                let used = self.slice.saturating_sub(self.port.slice_remaining());
                self.sched.record_mut(run).elapsed = used;
            }
            self.switch_pending = true;
            self.port.pend_switch();
            trace!("switch pended to {:?}", self.sched.next());
        }
    }

    /// Thread whose context is live in the CPU.
    pub fn current_thread(&self) -> Option<ThreadId> {
        self.sched.run()
    }

    /// Record of a live thread.
    pub fn thread(&self, id: ThreadId) -> Option<&ThreadRecord> {
        self.sched.threads().get(id.index())
    }

    /// Ready ring in dispatch order, starting at the running thread.
    pub fn ready_threads(&self) -> Vec<ThreadId, MAX_THREADS> {
        self.sched.ring()
    }

    pub fn sleeping_threads(&self) -> Vec<ThreadId, MAX_THREADS> {
        self.sched.sleepers()
    }

    /// Threads blocked on `sem`, in release order.
    pub fn blocked_on(&self, sem: &Semaphore) -> Vec<ThreadId, MAX_THREADS> {
        self.sched.blocked(sem.head)
    }

    /// Live threads, whatever their state.
    pub fn thread_count(&self) -> usize {
        self.sched.threads().live_count()
    }

    /// Threads in the ready ring.
    pub fn active_count(&self) -> usize {
        self.sched.active()
    }

    pub fn process_count(&self) -> usize {
        self.processes.live_count()
    }

    pub fn pool_stats(&self) -> KernelStats {
        KernelStats {
            threads: self.sched.threads().stats(),
            processes: self.processes.stats(),
        }
    }
}
