//! Checks that a thread busy outside the kernel stops making progress while a
//! more urgent thread or an interrupt handler runs.
use rtbench::{prelude::*, SemaphoreId, ThreadId};
use rtbench_port_std::PortInstance;
use rtbench_test_suite::kernel_tests::Driver;
use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    thread::spawn,
    time::{Duration, Instant},
};

pub trait SupportedSystem: Bench + PortInstance {}
impl<T: Bench + PortInstance> SupportedSystem for T {}

const URGENT: ThreadId = ThreadId::new(1);
const SEM: SemaphoreId = SemaphoreId::new(1);

static COUNTER: AtomicU64 = AtomicU64::new(0);
static DONE: AtomicBool = AtomicBool::new(false);

/// Spin for `duration` and return how far `COUNTER` advanced meanwhile.
fn counter_delta_over(duration: Duration) -> u64 {
    let start = Instant::now();
    let before = COUNTER.load(Ordering::Relaxed);
    while start.elapsed() < duration {}
    COUNTER.load(Ordering::Relaxed) - before
}

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::sem_create(SEM, 0, 1).unwrap();
    System::thread_create(URGENT, "urgent", -5, urgent_body::<System, D>, 0).unwrap();
    System::thread_start(URGENT);

    // No kernel calls from here on
    while !DONE.load(Ordering::Relaxed) {
        COUNTER.fetch_add(1, Ordering::Relaxed);
    }

    D::success();
}

fn urgent_body<System: SupportedSystem, D: Driver>(_: usize) {
    // Wait until `main` is in its loop
    while COUNTER.load(Ordering::Relaxed) == 0 {
        System::sync_ticks();
    }

    // Woken up by a tick while `main` was looping
    System::sync_ticks();
    let delta = counter_delta_over(Duration::from_millis(20));
    log::debug!("main advanced by {delta} while the urgent thread ran");
    assert_eq!(delta, 0);

    spawn(|| {
        rtbench_port_std::raise_interrupt::<System>(isr::<System, D>, 0);
    });
    System::sem_take(SEM).unwrap();

    DONE.store(true, Ordering::Relaxed);
}

fn isr<System: SupportedSystem, D: Driver>(_: usize) {
    let delta = counter_delta_over(Duration::from_millis(20));
    log::debug!("main advanced by {delta} while the interrupt handler ran");
    assert_eq!(delta, 0);

    System::sem_give(SEM);
}
