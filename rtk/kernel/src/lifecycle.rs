//! Thread and process creation and termination.

use log::{debug, error, warn};
use rtk_core::{Priority, ProcessId, Segment, SegmentAllocator, ThreadId};

use crate::config::STACK_BYTES;
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::port::{armv7m::FRAME_WORDS, Port};
use crate::thread::{EntryPoint, Owner, ProcessRecord, ThreadConfig, ThreadState};

/// Smallest stack that holds an initial context.
pub const MIN_STACK_BYTES: usize = FRAME_WORDS * 4;

impl<P: Port, A: SegmentAllocator> Kernel<P, A> {
    /// Create a thread and insert it into the ready ring.
    ///
    /// Preempts the caller at once when the scheduler is running and the new
    /// thread outranks it.
    pub fn create_thread(&mut self, config: ThreadConfig) -> KernelResult<ThreadId> {
        if !(MIN_STACK_BYTES..=STACK_BYTES).contains(&config.stack_size) {
            return Err(KernelError::InvalidStackSize {
                requested: config.stack_size,
            });
        }
        critical_section::with(|_| {
            let process = match config.owner {
                Owner::Kernel => None,
                Owner::Caller => self
                    .current_in_ring()
                    .and_then(|run| self.sched.threads().get(run.index()))
                    .and_then(|record| record.process),
                Owner::Process(pid) => {
                    if !self.processes.is_live(pid.index()) {
                        return Err(KernelError::UnknownProcess(pid));
                    }
                    Some(pid)
                }
            };
            let data = process
                .and_then(|pid| self.processes.get(pid.index()))
                .map(ProcessRecord::data);

            // the slot of a thread that killed itself stays reserved until
            // the switch away from it commits
            let skip = self.sched.run().map(ThreadId::index);
            let Some(slot) = self.sched.threads_mut().claim(skip) else {
                warn!("thread rejected: pool exhausted");
                return Err(KernelError::ThreadPoolFull);
            };
            let id = ThreadId::new(slot as u8);
            let sp = self
                .port
                .seed_context(id, config.stack_size, config.entry, data);

            let record = self.sched.record_mut(id);
            record.priority = config.priority;
            record.process = process;
            record.sp = sp;
            self.make_ready(id);
            debug!("{} created at {}", id, config.priority);
            Ok(id)
        })
    }

    /// Create a thread owned by the calling thread's process.
    pub fn add_thread(
        &mut self,
        entry: fn(),
        stack_size: usize,
        priority: Priority,
    ) -> KernelResult<ThreadId> {
        self.create_thread(
            ThreadConfig::new(EntryPoint::from_fn(entry))
                .with_stack_size(stack_size)
                .with_priority(priority)
                .with_owner(Owner::Caller),
        )
    }

    /// Create a process from loaded segments and start its first thread.
    ///
    /// The first thread receives the data segment as its implicit argument.
    /// On failure the process slot is returned.
    pub fn create_process(
        &mut self,
        entry: EntryPoint,
        text: Segment,
        data: Segment,
        stack_size: usize,
        priority: Priority,
    ) -> KernelResult<(ProcessId, ThreadId)> {
        critical_section::with(|_| {
            let Some(slot) = self.processes.claim(None) else {
                warn!("process rejected: pool exhausted");
                return Err(KernelError::ProcessPoolFull);
            };
            if let Some(record) = self.processes.get_mut(slot) {
                *record = ProcessRecord { text, data };
            }
            let pid = ProcessId::new(slot as u8);
            let config = ThreadConfig::new(entry)
                .with_stack_size(stack_size)
                .with_priority(priority)
                .with_owner(Owner::Process(pid));
            match self.create_thread(config) {
                Ok(thread) => {
                    debug!("{} created with {}", pid, thread);
                    Ok((pid, thread))
                }
                Err(err) => {
                    self.processes.release(slot);
                    Err(err)
                }
            }
        })
    }

    /// Record of a live process.
    pub fn process(&self, pid: ProcessId) -> Option<&ProcessRecord> {
        self.processes.get(pid.index())
    }

    /// Terminate the calling thread.
    ///
    /// When it was the last thread of its process, the process data and text
    /// segments go back to the allocator. The killed thread never resumes.
    pub fn kill(&mut self) {
        critical_section::with(|_| {
            let Some(run) = self.current_in_ring() else {
                error!("kill outside a running thread");
                return;
            };
            let next = self.sched.select_required();
            self.sched.set_next(next);
            self.sched.ring_remove(run);
            let record = self.sched.record_mut(run);
            record.state = ThreadState::Terminated;
            let process = record.process;
            self.sched.threads_mut().release(run.index());
            debug!("{} killed", run);

            if let Some(pid) = process {
                let orphaned = !self
                    .sched
                    .threads()
                    .live()
                    .any(|(_, record)| record.process == Some(pid));
                if orphaned {
                    self.release_process(pid);
                }
            }
            self.request_switch();
        });
    }

    fn release_process(&mut self, pid: ProcessId) {
        let Some(record) = self.processes.get(pid.index()).copied() else {
            return;
        };
        self.allocator.release(record.data);
        self.allocator.release(record.text);
        self.processes.release(pid.index());
        debug!("{} released", pid);
    }
}
