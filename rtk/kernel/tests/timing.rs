//! System clock, periodic tasks with jitter measurement and edge tasks.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::*;
use rtk_kernel::{
    EdgeLine, HostPort, Kernel, KernelConfig, KernelError, Priority, Timestamp,
};

static PERIODIC_RUNS: AtomicUsize = AtomicUsize::new(0);
static EDGE_RUNS: AtomicUsize = AtomicUsize::new(0);

fn count_periodic(_: &mut TestKernel) {
    PERIODIC_RUNS.fetch_add(1, Ordering::SeqCst);
}

fn count_edge(_: &mut TestKernel) {
    EDGE_RUNS.fetch_add(1, Ordering::SeqCst);
}

fn spawn_urgent(kernel: &mut TestKernel) {
    spawn(kernel, 1);
}

fn nothing(_: &mut TestKernel) {}

#[test]
fn periodic_slots_are_bounded_and_armed() {
    let mut kernel = kernel();
    let p = Priority::new(2);
    assert_eq!(kernel.add_periodic_task(nothing, 1, p), Ok(0));
    assert_eq!(kernel.add_periodic_task(nothing, 5, p), Ok(1));
    assert_eq!(
        kernel.add_periodic_task(nothing, 10, p),
        Err(KernelError::PeriodicSlotsFull)
    );
    assert_eq!(kernel.port().periodic(), &[(0, 1, p), (1, 5, p)]);
}

#[test]
fn periodic_hook_runs_and_jitter_is_binned() {
    let mut kernel = kernel();
    let slot = kernel
        .add_periodic_task(count_periodic, 1, Priority::new(1))
        .expect("slot");

    kernel.on_periodic(slot);
    assert_eq!(PERIODIC_RUNS.load(Ordering::SeqCst), 1);
    assert_eq!(kernel.jitter(slot).unwrap().samples(), 0);

    // one period plus 160 cycles late
    kernel.system_tick();
    kernel.port_mut().set_sub_ms_cycles(160);
    kernel.on_periodic(slot);
    let stats = kernel.jitter(slot).unwrap();
    assert_eq!(stats.samples(), 1);
    assert_eq!(stats.max_cycles(), 160);
    assert_eq!(stats.histogram()[2], 1);

    // exactly on time
    kernel.system_tick();
    kernel.on_periodic(slot);
    let stats = kernel.jitter(slot).unwrap();
    assert_eq!(stats.histogram()[0], 1);
    assert_eq!(stats.samples(), 2);
    assert_eq!(PERIODIC_RUNS.load(Ordering::SeqCst), 3);

    kernel.on_periodic(7);
    assert!(kernel.jitter(7).is_none());
}

#[test]
fn edge_tasks_run_on_their_line_only() {
    let mut kernel = kernel();
    kernel.add_edge_task(EdgeLine::Sw1, count_edge, Priority::new(2));
    assert_eq!(kernel.port().edge(EdgeLine::Sw1), Some(Priority::new(2)));
    assert_eq!(kernel.port().edge(EdgeLine::Sw2), None);

    kernel.on_edge(EdgeLine::Sw2);
    assert_eq!(EDGE_RUNS.load(Ordering::SeqCst), 0);
    kernel.on_edge(EdgeLine::Sw1);
    kernel.on_edge(EdgeLine::Sw1);
    assert_eq!(EDGE_RUNS.load(Ordering::SeqCst), 2);
}

#[test]
fn hook_created_thread_preempts_running_thread() {
    let mut kernel = kernel();
    let low = spawn(&mut kernel, 5);
    kernel.add_edge_task(EdgeLine::Sw2, spawn_urgent, Priority::new(3));
    launch(&mut kernel);

    kernel.on_edge(EdgeLine::Sw2);
    assert!(kernel.is_switch_pending());
    assert_eq!(settle(&mut kernel), 1);
    assert_ne!(current(&kernel), low);
    assert_eq!(kernel.thread_count(), 2);
}

#[test]
fn clock_wraps_and_differences_correct_one_wrap() {
    let mut kernel = kernel_with(KernelConfig::builder().ms_wrap(10).build());
    for _ in 0..9 {
        kernel.system_tick();
    }
    assert_eq!(kernel.ms_time(), 9);
    let start = kernel.now();
    assert_eq!(start, Timestamp::from_cycles(9 * 80_000));

    kernel.system_tick();
    kernel.system_tick();
    assert_eq!(kernel.ms_time(), 1);
    assert_eq!(kernel.uptime_ms(), 11);
    let stop = kernel.now();
    assert_eq!(kernel.time_difference(start, stop), 2 * 80_000);

    kernel.port_mut().set_sub_ms_cycles(1_000_000);
    assert_eq!(kernel.now().cycles(), 80_000 + 79_999);

    kernel.clear_ms_time();
    assert_eq!(kernel.ms_time(), 0);
    assert_eq!(kernel.uptime_ms(), 0);
}

#[test]
fn invalid_clock_configuration_is_rejected() {
    let config = KernelConfig::builder().cycles_per_ms(0).build();
    let result = Kernel::new(config, HostPort::new(), Recorder::default());
    assert!(matches!(result, Err(KernelError::Config(_))));

    let config = KernelConfig::builder()
        .cycles_per_ms(u32::MAX)
        .ms_wrap(2)
        .build();
    let result = Kernel::new(config, HostPort::new(), ());
    assert!(matches!(result, Err(KernelError::Config(_))));
}
