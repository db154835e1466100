//! Changes the priority of the running thread, checking the resulting
//! dispatch decisions.
use rtbench::{prelude::*, ThreadId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading {}
impl<T: BenchThreading> SupportedSystem for T {}

const TASK: ThreadId = ThreadId::new(1);

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::thread_create(TASK, "task", 2, task_body::<System, D>, 0).unwrap();
    System::thread_start(TASK);

    // Raising the priority doesn't yield
    System::thread_set_priority(-1);
    System::thread_set_priority(0);

    SEQ.expect_and_replace(0, 1);

    // `TASK` gets to run before this call returns
    System::thread_set_priority(3);

    SEQ.expect_and_replace(2, 3);

    // Lowering to the same priority as `TASK` places `main` behind it
    System::thread_set_priority(4);

    SEQ.expect_and_replace(4, 5);

    D::success();
}

fn task_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(1, 2);

    // `main` is more urgent now
    System::thread_set_priority(4);

    SEQ.expect_and_replace(3, 4);
}
