//! Signals a semaphore, waking up a task.
use rtbench::{prelude::*, SemaphoreId, ThreadId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchSemaphore {}
impl<T: BenchThreading + BenchSemaphore> SupportedSystem for T {}

const SEM: SemaphoreId = SemaphoreId::new(1);
const TASK1: ThreadId = ThreadId::new(1);
const TASK2: ThreadId = ThreadId::new(2);
const TASK3: ThreadId = ThreadId::new(3);

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::sem_create(SEM, 0, 2).unwrap();

    System::thread_create(TASK1, "task1", 2, task1_body::<System, D>, 0).unwrap();
    System::thread_create(TASK2, "task2", 1, task2_body::<System, D>, 0).unwrap();
    System::thread_create(TASK3, "task3", 1, task3_body::<System, D>, 0).unwrap();
    System::thread_start(TASK1);
    System::thread_start(TASK2);
    System::thread_start(TASK3);

    // Yield the processor to the tasks. The main thread doesn't run again
    // before `D::success` is called.
    System::thread_set_priority(10);
}

fn task1_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(2, 3);

    System::sem_give(SEM); // unblocks `task2`

    SEQ.expect_and_replace(4, 5);

    System::sem_give(SEM); // unblocks `task3`

    SEQ.expect_and_replace(6, 7);

    System::sem_give(SEM); // unblocks `task2`

    SEQ.expect_and_replace(8, 9);

    // No waiters; the count goes to one
    System::sem_give(SEM);
    System::sem_take(SEM).unwrap();

    SEQ.expect_and_replace(9, 10);

    D::success();
}

fn task2_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(0, 1);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `task3`

    SEQ.expect_and_replace(3, 4);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `task1`

    SEQ.expect_and_replace(7, 8);
}

fn task3_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(1, 2);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `task1`

    SEQ.expect_and_replace(5, 6);
}
