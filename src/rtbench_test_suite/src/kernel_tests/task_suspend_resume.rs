//! Suspends and resumes a thread in various states.
use core::sync::atomic::{AtomicUsize, Ordering};
use rtbench::{prelude::*, SemaphoreId, ThreadId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchSemaphore {}
impl<T: BenchThreading + BenchSemaphore> SupportedSystem for T {}

const TASK: ThreadId = ThreadId::new(1);
const SEM: SemaphoreId = SemaphoreId::new(1);

static SEQ: SeqTracker = SeqTracker::new();
static RUN_COUNT: AtomicUsize = AtomicUsize::new(0);

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::sem_create(SEM, 0, 1).unwrap();

    // `TASK` preempts `main` whenever it's runnable
    System::thread_set_priority(10);
    System::thread_create(TASK, "task", 5, task_body::<System, D>, 0).unwrap();

    // Resuming a thread that isn't suspended is a no-op
    System::thread_resume(TASK);

    SEQ.expect_and_replace(0, 1);

    // Started while suspended
    System::thread_suspend(TASK);
    System::thread_suspend(TASK);
    System::thread_start(TASK);

    SEQ.expect_and_replace(1, 2);
    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 0);

    System::thread_resume(TASK); // switching to `TASK`

    SEQ.expect_and_replace(3, 4);

    System::thread_resume(TASK); // switching to `TASK`

    SEQ.expect_and_replace(5, 6);

    // Suspended while waiting. The semaphore is handed over, but `TASK`
    // doesn't run until it's resumed.
    System::thread_suspend(TASK);
    System::sem_give(SEM);

    SEQ.expect_and_replace(6, 7);

    System::thread_resume(TASK); // switching to `TASK`

    SEQ.expect_and_replace(8, 9);
    assert_eq!(RUN_COUNT.load(Ordering::Relaxed), 1);

    D::success();
}

fn task_body<System: SupportedSystem, D: Driver>(_: usize) {
    RUN_COUNT.fetch_add(1, Ordering::Relaxed);

    SEQ.expect_and_replace(2, 3);

    System::thread_suspend(TASK); // switching to `main`

    SEQ.expect_and_replace(4, 5);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `main`

    SEQ.expect_and_replace(7, 8);
}
