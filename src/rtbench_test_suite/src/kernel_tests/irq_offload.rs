//! Runs routines in interrupt context by `irq_offload`.
use core::sync::atomic::{AtomicUsize, Ordering};
use rtbench::{prelude::*, ThreadId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchOffload {}
impl<T: BenchThreading + BenchOffload> SupportedSystem for T {}

const TASK: ThreadId = ThreadId::new(1);

static SEQ: SeqTracker = SeqTracker::new();
static PARAM: AtomicUsize = AtomicUsize::new(0);

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(0, 1);

    // Returns after the routine completes
    System::irq_offload(isr::<System, D>, 42);

    SEQ.expect_and_replace(4, 5);
    assert!(System::is_task_context());

    // From another thread
    System::thread_create(TASK, "task", -1, task_body::<System, D>, 0).unwrap();
    System::thread_start(TASK);

    SEQ.expect_and_replace(6, 7);
    assert_eq!(PARAM.load(Ordering::Relaxed), 43);

    D::success();
}

fn isr<System: SupportedSystem, D: Driver>(param: usize) {
    SEQ.expect_and_replace(1, 2);

    assert_eq!(param, 42);
    assert!(System::is_interrupt_context());
    assert!(!System::is_task_context());

    // Runs directly
    System::irq_offload(nested_isr::<System, D>, 7);

    SEQ.expect_and_replace(3, 4);
}

fn nested_isr<System: SupportedSystem, D: Driver>(param: usize) {
    SEQ.expect_and_replace(2, 3);

    assert_eq!(param, 7);
    assert!(System::is_interrupt_context());
}

fn task_body<System: SupportedSystem, D: Driver>(_: usize) {
    System::irq_offload(task_isr::<System, D>, 43);

    SEQ.expect_and_replace(5, 6);
}

fn task_isr<System: SupportedSystem, D: Driver>(param: usize) {
    PARAM.store(param, Ordering::Relaxed);
}
