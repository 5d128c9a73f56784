//! Dispatch order, preemption and time slicing.

mod common;

use common::*;
use rtk_kernel::{KernelError, Priority, Semaphore, ThreadState};

#[test]
fn launch_requires_threads_and_happens_once() {
    let mut kernel = kernel();
    assert_eq!(kernel.launch(SLICE), Err(KernelError::NoThreads));

    let first = spawn(&mut kernel, 2);
    let sp = kernel.launch(SLICE).expect("launch");
    assert_eq!(sp, kernel.thread(first).unwrap().stack_pointer());
    assert_eq!(kernel.launch(SLICE), Err(KernelError::AlreadyLaunched));
    assert_eq!(kernel.port().slice(), Some(SLICE));
    assert_eq!(kernel.thread(first).unwrap().state(), ThreadState::Running);
}

#[test]
fn launch_dispatches_most_urgent_thread() {
    let mut kernel = kernel();
    let _low = spawn(&mut kernel, 5);
    let high = spawn(&mut kernel, 1);
    let _mid = spawn(&mut kernel, 3);
    launch(&mut kernel);
    assert_eq!(current(&kernel), high);
}

#[test]
fn equal_priorities_rotate_in_creation_order() {
    let mut kernel = kernel();
    let threads = [spawn(&mut kernel, 2), spawn(&mut kernel, 2), spawn(&mut kernel, 2)];
    let _idle = spawn(&mut kernel, 7);
    launch(&mut kernel);
    assert_eq!(current(&kernel), threads[0]);

    let mut order = Vec::new();
    for _ in 0..9 {
        kernel.preempt_tick();
        assert_eq!(settle(&mut kernel), 1);
        order.push(current(&kernel));
    }
    let expected: Vec<_> = threads.iter().cycle().skip(1).take(9).copied().collect();
    assert_eq!(order, expected);
}

#[test]
fn lone_top_priority_keeps_cpu_on_slice_expiry() {
    let mut kernel = kernel();
    let top = spawn(&mut kernel, 1);
    let _other = spawn(&mut kernel, 4);
    launch(&mut kernel);

    let restarts = kernel.port().restarts();
    kernel.preempt_tick();
    assert_eq!(settle(&mut kernel), 0);
    assert_eq!(current(&kernel), top);
    assert_eq!(kernel.port().restarts(), restarts + 1);
}

#[test]
fn higher_priority_thread_preempts_on_creation() {
    let mut kernel = kernel();
    let low = spawn(&mut kernel, 4);
    launch(&mut kernel);

    let high = spawn(&mut kernel, 1);
    assert!(kernel.is_switch_pending());
    assert_eq!(settle(&mut kernel), 1);
    assert_eq!(current(&kernel), high);
    assert_eq!(kernel.thread(low).unwrap().state(), ThreadState::Ready);

    let _lower = spawn(&mut kernel, 6);
    assert_eq!(settle(&mut kernel), 0);
    assert_eq!(current(&kernel), high);
}

#[test]
fn ready_ring_orders_by_priority_then_arrival() {
    let mut kernel = kernel();
    let a = spawn(&mut kernel, 3);
    let b = spawn(&mut kernel, 1);
    let c = spawn(&mut kernel, 3);
    let d = spawn(&mut kernel, 1);
    let e = spawn(&mut kernel, 2);
    assert_eq!(kernel.ready_threads().as_slice(), &[b, d, e, a, c]);
    assert_eq!(kernel.active_count(), 5);
}

#[test]
fn peer_arriving_after_rotation_queues_behind_its_class() {
    let mut kernel = kernel();
    let a = spawn(&mut kernel, 1);
    let b = spawn(&mut kernel, 1);
    let c = spawn(&mut kernel, 2);
    launch(&mut kernel);
    kernel.preempt_tick();
    settle(&mut kernel);
    assert_eq!(current(&kernel), b);

    let e = spawn(&mut kernel, 2);
    assert_eq!(kernel.ready_threads().as_slice(), &[b, c, e, a]);

    let mut first = Semaphore::new(0);
    let mut second = Semaphore::new(0);
    kernel.wait(&mut first);
    settle(&mut kernel);
    assert_eq!(current(&kernel), a);
    kernel.wait(&mut second);
    settle(&mut kernel);
    assert_eq!(current(&kernel), c, "c reached priority 2 before e");

    kernel.yield_now();
    settle(&mut kernel);
    assert_eq!(current(&kernel), e);
}

#[test]
fn yield_hands_over_to_peer_only() {
    let mut kernel = kernel();
    let a = spawn(&mut kernel, 2);
    let b = spawn(&mut kernel, 2);
    let _low = spawn(&mut kernel, 5);
    launch(&mut kernel);

    kernel.sleep(0);
    settle(&mut kernel);
    assert_eq!(current(&kernel), b);
    kernel.yield_now();
    settle(&mut kernel);
    assert_eq!(current(&kernel), a);

    let mut solo = common::kernel();
    let only = spawn(&mut solo, 2);
    let _low = spawn(&mut solo, 5);
    launch(&mut solo);
    solo.sleep(0);
    assert_eq!(settle(&mut solo), 0);
    assert_eq!(current(&solo), only);
}

#[test]
fn preemption_records_consumed_slice() {
    let mut kernel = kernel();
    let a = spawn(&mut kernel, 2);
    let b = spawn(&mut kernel, 2);
    launch(&mut kernel);

    kernel.port_mut().set_slice_remaining(400);
    kernel.yield_now();
    assert_eq!(kernel.thread(a).unwrap().elapsed_slice(), SLICE - 400);
    settle(&mut kernel);
    assert_eq!(current(&kernel), b);

    // keeping the CPU clears the record
    kernel.sleep(1);
    settle(&mut kernel);
    assert_eq!(current(&kernel), a);
    kernel.preempt_tick();
    assert_eq!(kernel.thread(a).unwrap().elapsed_slice(), 0);
}

#[test]
fn switch_stores_outgoing_context() {
    let mut kernel = kernel();
    let a = spawn(&mut kernel, 2);
    let b = spawn(&mut kernel, 2);
    launch(&mut kernel);

    kernel.preempt_tick();
    let restored = kernel.switch_context(rtk_kernel::StackPointer::new(0xBEEF));
    assert_eq!(restored, kernel.thread(b).unwrap().stack_pointer());
    assert_eq!(kernel.thread(a).unwrap().stack_pointer().raw(), 0xBEEF);
    assert!(!kernel.is_switch_pending());
    let _ = kernel.port_mut().take_pended();
}

#[test]
fn kernel_stats_track_pools() {
    let mut kernel = kernel_with(
        rtk_kernel::KernelConfig::builder()
            .max_threads(2)
            .build(),
    );
    spawn(&mut kernel, 1);
    spawn(&mut kernel, 1);
    let stats = kernel.pool_stats();
    assert!(stats.threads.is_exhausted());
    assert_eq!(stats.threads.headroom(), 0);
    assert_eq!(stats.processes.live, 0);
    assert_eq!(kernel.thread_count(), 2);
    assert_eq!(
        kernel.add_thread(body, STACK, Priority::new(1)),
        Err(KernelError::ThreadPoolFull)
    );
}
