//! Sleep manager: wake-up accuracy and switch coalescing.

mod common;

use common::*;
use rtk_kernel::ThreadState;

/// Ticks until a thread that slept `ms` is dispatched again.
fn ticks_until_resumed(ms: u32) -> u32 {
    let mut kernel = kernel();
    let sleeper = spawn(&mut kernel, 1);
    let idle = spawn(&mut kernel, 5);
    launch(&mut kernel);
    assert_eq!(current(&kernel), sleeper);

    kernel.sleep(ms);
    settle(&mut kernel);
    if ms == 0 {
        assert_eq!(current(&kernel), sleeper);
        return 0;
    }
    assert_eq!(current(&kernel), idle);
    assert_eq!(kernel.thread(sleeper).unwrap().state(), ThreadState::Sleeping);

    let mut ticks = 0;
    while current(&kernel) != sleeper {
        kernel.system_tick();
        ticks += 1;
        settle(&mut kernel);
        assert!(ticks <= ms, "sleeper overslept");
    }
    ticks
}

#[test]
fn sleeper_resumes_after_exactly_its_duration() {
    for ms in [0, 1, 100, 10_000] {
        assert_eq!(ticks_until_resumed(ms), ms, "sleep({ms})");
    }
}

#[test]
fn sleeping_thread_leaves_the_ring() {
    let mut kernel = kernel();
    let sleeper = spawn(&mut kernel, 1);
    let idle = spawn(&mut kernel, 5);
    launch(&mut kernel);

    kernel.sleep(3);
    assert!(kernel.is_switch_pending());
    settle(&mut kernel);
    assert_eq!(kernel.ready_threads().as_slice(), &[idle]);
    assert_eq!(kernel.sleeping_threads().as_slice(), &[sleeper]);
    assert_eq!(kernel.thread(sleeper).unwrap().sleep_ticks(), 3);

    kernel.system_tick();
    assert_eq!(kernel.thread(sleeper).unwrap().sleep_ticks(), 2);
    assert_eq!(kernel.ms_time(), 1);
}

#[test]
fn simultaneous_wakes_request_one_switch() {
    let mut kernel = kernel();
    let a = spawn(&mut kernel, 1);
    let b = spawn(&mut kernel, 1);
    let c = spawn(&mut kernel, 2);
    let idle = spawn(&mut kernel, 5);
    launch(&mut kernel);

    for expected in [a, b, c] {
        assert_eq!(current(&kernel), expected);
        kernel.sleep(2);
        settle(&mut kernel);
    }
    assert_eq!(current(&kernel), idle);
    assert_eq!(kernel.sleeping_threads().len(), 3);

    kernel.system_tick();
    assert_eq!(kernel.port().pended(), 0);
    kernel.system_tick();
    assert_eq!(kernel.port().pended(), 1);
    assert_eq!(settle(&mut kernel), 1);

    assert!([a, b].contains(&current(&kernel)));
    assert!(kernel.sleeping_threads().is_empty());
    assert_eq!(kernel.active_count(), 4);
    let ring = kernel.ready_threads();
    assert_eq!(&ring[2..], &[c, idle]);
}

#[test]
fn lower_priority_wake_does_not_preempt() {
    let mut kernel = kernel();
    let high = spawn(&mut kernel, 1);
    let low = spawn(&mut kernel, 3);
    let _idle = spawn(&mut kernel, 9);
    launch(&mut kernel);

    kernel.sleep(1);
    settle(&mut kernel);
    assert_eq!(current(&kernel), low);
    kernel.sleep(2);
    settle(&mut kernel);

    kernel.system_tick();
    assert_eq!(settle(&mut kernel), 1);
    assert_eq!(current(&kernel), high);

    kernel.system_tick();
    assert_eq!(kernel.port().pended(), 0);
    assert_eq!(current(&kernel), high);
    assert_eq!(kernel.thread(low).unwrap().state(), ThreadState::Ready);
}
