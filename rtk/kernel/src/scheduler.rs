//! Ready ring, sleep list and blocked-list bookkeeping.
//!
//! All runnable threads form one circular singly linked ring through the
//! `link` field of their records. The ring is cyclically ordered by
//! priority, with equal priorities kept in arrival order. Removal needs a
//! predecessor scan, which is fine for the handful of threads a pool holds.
//!
//! The scheduler here is pure bookkeeping. Deciding when to ask the port for
//! a switch is the job of [`Kernel`](crate::Kernel).

use heapless::Vec;
use rtk_core::{Priority, SleepCounter, ThreadId};

use crate::config::MAX_THREADS;
use crate::pool::Pool;
use crate::thread::{ThreadRecord, ThreadState};

/// Walks `link` fields from `cursor` until `stop`, the end of a list, or
/// the pool capacity is exhausted.
pub(crate) struct Links<'a> {
    threads: &'a Pool<ThreadRecord, MAX_THREADS>,
    cursor: Option<ThreadId>,
    stop: Option<ThreadId>,
    budget: usize,
}

impl Iterator for Links<'_> {
    type Item = ThreadId;

    fn next(&mut self) -> Option<ThreadId> {
        let current = self.cursor?;
        if self.cursor == self.stop || self.budget == 0 {
            return None;
        }
        self.budget -= 1;
        self.cursor = self.threads.slot(current.index()).link;
        Some(current)
    }
}

pub struct Scheduler {
    threads: Pool<ThreadRecord, MAX_THREADS>,
    /// Thread whose context is live in the CPU.
    run: Option<ThreadId>,
    /// Thread the next switch will dispatch; equals `run` when none is due.
    next: Option<ThreadId>,
    sleepers: Option<ThreadId>,
    /// Ring membership count.
    active: usize,
}

impl Scheduler {
    pub fn new(max_threads: usize) -> Self {
        Self {
            threads: Pool::new(max_threads),
            run: None,
            next: None,
            sleepers: None,
            active: 0,
        }
    }

    pub fn threads(&self) -> &Pool<ThreadRecord, MAX_THREADS> {
        &self.threads
    }

    pub(crate) fn threads_mut(&mut self) -> &mut Pool<ThreadRecord, MAX_THREADS> {
        &mut self.threads
    }

    pub fn run(&self) -> Option<ThreadId> {
        self.run
    }

    pub fn next(&self) -> Option<ThreadId> {
        self.next
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn set_run(&mut self, thread: Option<ThreadId>) {
        self.run = thread;
    }

    pub(crate) fn set_next(&mut self, thread: Option<ThreadId>) {
        self.next = thread;
    }

    pub(crate) fn record(&self, thread: ThreadId) -> &ThreadRecord {
        self.threads.slot(thread.index())
    }

    pub(crate) fn record_mut(&mut self, thread: ThreadId) -> &mut ThreadRecord {
        self.threads.slot_mut(thread.index())
    }

    fn priority(&self, thread: ThreadId) -> Priority {
        self.record(thread).priority
    }

    fn link(&self, thread: ThreadId) -> Option<ThreadId> {
        self.record(thread).link
    }

    fn set_link(&mut self, thread: ThreadId, link: Option<ThreadId>) {
        self.record_mut(thread).link = link;
    }

    pub(crate) fn links(&self, start: Option<ThreadId>, stop: Option<ThreadId>) -> Links<'_> {
        Links {
            threads: &self.threads,
            cursor: start,
            stop,
            budget: MAX_THREADS,
        }
    }

    /// True if `thread` is in the ready ring.
    pub fn in_ring(&self, thread: ThreadId) -> bool {
        self.threads.is_live(thread.index()) && self.record(thread).state.is_active()
    }

    /// Ring members in dispatch order, starting at the running thread (or the
    /// thread about to run when the running one has left the ring).
    pub fn ring(&self) -> Vec<ThreadId, MAX_THREADS> {
        let start = match self.run {
            Some(run) if self.in_ring(run) => Some(run),
            _ => self.next.filter(|&next| self.in_ring(next)),
        };
        let mut members = Vec::new();
        if let Some(start) = start {
            let _ = members.push(start);
            for thread in self.links(self.link(start), Some(start)) {
                let _ = members.push(thread);
            }
        }
        members
    }

    /// Threads on the sleep list, most recent first.
    pub fn sleepers(&self) -> Vec<ThreadId, MAX_THREADS> {
        self.links(self.sleepers, None).collect()
    }

    /// Threads queued behind a blocked-list head, in release order.
    pub fn blocked(&self, head: Option<ThreadId>) -> Vec<ThreadId, MAX_THREADS> {
        self.links(head, None).collect()
    }

    /// Ring member whose link points at `thread`.
    fn predecessor(&self, thread: ThreadId) -> Option<ThreadId> {
        let mut cursor = thread;
        for _ in 0..MAX_THREADS {
            let following = self.link(cursor)?;
            if following == thread {
                return Some(cursor);
            }
            cursor = following;
        }
        None
    }

    fn insert_before(&mut self, anchor: ThreadId, thread: ThreadId) {
        if let Some(prev) = self.predecessor(anchor) {
            self.set_link(prev, Some(thread));
        }
        self.set_link(thread, Some(anchor));
    }

    /// Splice `thread` out of the ready ring.
    pub(crate) fn ring_remove(&mut self, thread: ThreadId) {
        debug_assert!(self.in_ring(thread), "{} is not in the ready ring", thread);
        match self.link(thread) {
            Some(following) if following != thread => {
                if let Some(prev) = self.predecessor(thread) {
                    self.set_link(prev, Some(following));
                }
            }
            _ => {}
        }
        self.set_link(thread, None);
        self.active = self.active.saturating_sub(1);
    }

    /// Round-robin choice on slice expiry: the next equal-priority peer of
    /// the running thread, otherwise whatever is already selected.
    pub fn select_lax(&self) -> Option<ThreadId> {
        let Some(run) = self.run.filter(|&run| self.in_ring(run)) else {
            return self.next;
        };
        let priority = self.priority(run);
        self.links(self.link(run), Some(run))
            .find(|&peer| self.priority(peer) == priority)
            .or(self.next)
    }

    /// Choice when the running thread is about to leave the ring.
    ///
    /// Keeps a thread already staged for dispatch. Otherwise prefers an
    /// equal-priority peer, then the most urgent remaining member in ring
    /// order. `None` means the running thread is the last ring member.
    pub fn select_required(&self) -> Option<ThreadId> {
        if self.next.is_some() && self.next != self.run {
            return self.next;
        }
        let run = self.run?;
        let priority = self.priority(run);
        let mut best: Option<ThreadId> = None;
        for candidate in self.links(self.link(run), Some(run)) {
            let level = self.priority(candidate);
            if level == priority {
                return Some(candidate);
            }
            if best.map_or(true, |b| level.is_higher_than(self.priority(b))) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Priority-ordered insertion into the ready ring.
    ///
    /// The ring keeps one cyclic priority order no matter which member is
    /// running, so the slot is found from the order itself: behind the last
    /// member of the thread's own class, or at the wrap from least to most
    /// urgent. A ring of one priority level has no wrap and the thread goes
    /// just before the anchor, behind every peer in dispatch order.
    ///
    /// The anchor is the thread selected to run next; it equals the running
    /// thread unless the running thread is leaving the ring or a switch is
    /// already due. Returns true when the caller must request a switch: the
    /// thread outranks the running thread and no switch is already due.
    pub(crate) fn insert_ready(&mut self, thread: ThreadId) -> bool {
        {
            let record = self.record_mut(thread);
            record.state = ThreadState::Ready;
            record.sleep = SleepCounter::ZERO;
        }
        self.active += 1;

        let Some(anchor) = self.next.filter(|&next| self.in_ring(next) && next != thread) else {
            self.set_link(thread, Some(thread));
            self.next = Some(thread);
            return true;
        };
        let staging = self.next != self.run;
        let priority = self.priority(thread);

        let slot = self.ordered_slot(anchor, priority).unwrap_or(anchor);
        self.insert_before(slot, thread);

        if priority.is_higher_than(self.priority(anchor)) {
            self.next = Some(thread);
            return !staging;
        }
        false
    }

    /// Member a thread of `priority` must be linked in front of to keep the
    /// ring cyclically ordered. `None` when the ring holds a single level.
    fn ordered_slot(&self, anchor: ThreadId, priority: Priority) -> Option<ThreadId> {
        let mut member = anchor;
        for _ in 0..self.active {
            let following = self.link(member)?;
            let here = self.priority(member);
            let there = self.priority(following);
            let at_or_above = !priority.is_higher_than(here);
            if at_or_above && priority.is_higher_than(there) {
                return Some(following);
            }
            if there.is_higher_than(here) && (at_or_above || priority.is_higher_than(there)) {
                return Some(following);
            }
            if following == anchor {
                break;
            }
            member = following;
        }
        None
    }

    /// Move the running thread from the ring to the sleep list.
    pub(crate) fn push_sleeper(&mut self, thread: ThreadId, ticks: u32) {
        {
            let record = self.record_mut(thread);
            record.state = ThreadState::Sleeping;
            record.sleep = SleepCounter::new(ticks);
        }
        let head = self.sleepers;
        self.set_link(thread, head);
        self.sleepers = Some(thread);
    }

    /// One system tick of the sleep manager.
    ///
    /// Every sleeper is decremented once; those reaching zero are reinserted
    /// into the ring. Returns true if any reinsertion asked for a switch.
    pub(crate) fn tick_sleepers(&mut self) -> bool {
        let mut cursor = self.sleepers;
        let mut budget = MAX_THREADS;
        while let Some(thread) = cursor {
            if budget == 0 {
                break;
            }
            budget -= 1;
            self.record_mut(thread).sleep.decrement();
            cursor = self.link(thread);
        }

        let mut preempt = false;
        let mut prev: Option<ThreadId> = None;
        let mut cursor = self.sleepers;
        let mut budget = MAX_THREADS;
        while let Some(thread) = cursor {
            if budget == 0 {
                break;
            }
            budget -= 1;
            let following = self.link(thread);
            if self.record(thread).sleep.is_zero() {
                match prev {
                    Some(prev) => self.set_link(prev, following),
                    None => self.sleepers = following,
                }
                self.set_link(thread, None);
                preempt |= self.insert_ready(thread);
            } else {
                prev = Some(thread);
            }
            cursor = following;
        }
        preempt
    }

    /// Queue the running thread behind `head`, most urgent first and in
    /// arrival order among equals.
    pub(crate) fn enqueue_blocked(&mut self, head: &mut Option<ThreadId>, thread: ThreadId) {
        self.record_mut(thread).state = ThreadState::Blocked;
        let priority = self.priority(thread);

        let mut prev: Option<ThreadId> = None;
        let mut cursor = *head;
        let mut budget = MAX_THREADS;
        while let Some(waiter) = cursor {
            if budget == 0 || priority.is_higher_than(self.priority(waiter)) {
                break;
            }
            budget -= 1;
            prev = Some(waiter);
            cursor = self.link(waiter);
        }

        self.set_link(thread, cursor);
        match prev {
            Some(prev) => self.set_link(prev, Some(thread)),
            None => *head = Some(thread),
        }
    }

    /// Detach the first thread queued behind `head`.
    pub(crate) fn pop_blocked(&mut self, head: &mut Option<ThreadId>) -> Option<ThreadId> {
        let thread = (*head)?;
        *head = self.link(thread);
        self.set_link(thread, None);
        Some(thread)
    }
}
