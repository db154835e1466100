//! Signals a semaphore from an interrupt handler. The waiting thread doesn't
//! run until the handler returns.
use assert_matches::assert_matches;
use rtbench::{prelude::*, SemaphoreId, TakeSemaphoreError, ThreadId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchSemaphore + BenchOffload {}
impl<T: BenchThreading + BenchSemaphore + BenchOffload> SupportedSystem for T {}

const SEM: SemaphoreId = SemaphoreId::new(1);
const TASK: ThreadId = ThreadId::new(1);

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::sem_create(SEM, 0, 1).unwrap();
    System::thread_create(TASK, "task", 1, task_body::<System, D>, 0).unwrap();
    System::thread_start(TASK);

    SEQ.expect_and_replace(0, 1);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `task`

    SEQ.expect_and_replace(4, 5);

    D::success();
}

fn task_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(1, 2);

    System::irq_offload(isr::<System, D>, 0);

    // `main` is more urgent, and it doesn't return control to us
    unreachable!();
}

fn isr<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(2, 3);

    assert!(System::is_interrupt_context());
    assert_matches!(System::sem_take(SEM), Err(TakeSemaphoreError::BadContext));

    System::sem_give(SEM); // unblocks `main` after this handler returns

    SEQ.expect_and_replace(3, 4);
}
