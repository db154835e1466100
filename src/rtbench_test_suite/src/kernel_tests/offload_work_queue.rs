//! Submits work to the offload work queue from an interrupt handler and from a
//! thread. Also checks that the work item runs on the work-queue thread while
//! the submitter is blocked.
use core::sync::atomic::{AtomicUsize, Ordering};
use rtbench::{prelude::*, SemaphoreId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchSemaphore + BenchOffload {}
impl<T: BenchThreading + BenchSemaphore + BenchOffload> SupportedSystem for T {}

const SEM: SemaphoreId = SemaphoreId::new(1);

static SEQ: SeqTracker = SeqTracker::new();
static RUN_COUNT: AtomicUsize = AtomicUsize::new(0);

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    // Not set up yet; no-op
    System::offload_submit_work();

    System::offload_setup();
    System::offload_setup();

    // No work item; no-op
    System::offload_submit_work();
    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 0);

    System::offload_create_work(work::<System>);

    SEQ.expect_and_replace(0, 1);

    // The work item runs after the handler returns and before `irq_offload`
    // returns. Submitting twice in a row runs it only once.
    System::irq_offload(isr::<System, D>, 0);

    SEQ.expect_and_replace(3, 4);
    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 1);

    // The work queue is more urgent than `main`
    System::offload_submit_work();

    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 2);

    // Outrank the work queue. The work item now waits until `main` blocks,
    // and `main` waits for the work item.
    System::sem_create(SEM, 0, 1).unwrap();
    System::thread_set_priority(-2);
    System::offload_submit_work();
    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 2);

    SEQ.expect_and_replace(4, 5);
    System::sem_take(SEM).unwrap();
    SEQ.expect_and_replace(6, 7);
    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 3);

    D::success();
}

fn isr<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(1, 2);

    System::offload_submit_work();
    System::offload_submit_work();

    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 0);
}

fn work<System: SupportedSystem>() {
    assert!(System::is_task_context());
    match RUN_COUNT.fetch_add(1, Ordering::Relaxed) {
        0 => SEQ.expect_and_replace(2, 3),
        2 => {
            SEQ.expect_and_replace(5, 6);
            System::sem_give(SEM);
        }
        _ => {}
    }
}
