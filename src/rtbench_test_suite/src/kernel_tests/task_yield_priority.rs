//! Yields the processor. A thread is never preempted by a less urgent one by
//! yielding.
use rtbench::{prelude::*, ThreadId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading {}
impl<T: BenchThreading> SupportedSystem for T {}

const TASK1: ThreadId = ThreadId::new(1);
const TASK2: ThreadId = ThreadId::new(2);
const TASK3: ThreadId = ThreadId::new(3);

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::thread_create(TASK1, "task1", 2, task1_body::<System, D>, 0).unwrap();
    System::thread_create(TASK2, "task2", 2, task2_body::<System, D>, 0).unwrap();
    System::thread_create(TASK3, "task3", 3, task3_body::<System, D>, 0).unwrap();
    System::thread_start(TASK3);
    System::thread_start(TASK1);
    System::thread_start(TASK2);

    // A yield doesn't switch to less urgent threads
    System::yield_now();

    SEQ.expect_and_replace(0, 1);

    // Yield the processor to the tasks. The main thread doesn't run again
    // before `D::success` is called.
    System::thread_set_priority(10);
}

fn task1_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(1, 2);

    System::yield_now(); // switching to `task2`

    SEQ.expect_and_replace(3, 4);
}

fn task2_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(2, 3);

    System::yield_now(); // switching to `task1`

    SEQ.expect_and_replace(4, 5);

    System::yield_now(); // no other threads of the same priority

    SEQ.expect_and_replace(5, 6);
}

fn task3_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(6, 7);

    System::yield_now(); // `main` is less urgent

    SEQ.expect_and_replace(7, 8);

    D::success();
}
