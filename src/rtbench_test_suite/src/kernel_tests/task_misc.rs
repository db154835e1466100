//! Validates error codes returned by thread manipulation methods. Also,
//! checks miscellaneous properties of threads.
use arrayvec::ArrayVec;
use core::{
    hash::{Hash, Hasher},
    sync::atomic::{AtomicUsize, Ordering},
};
use rtbench::{prelude::*, CreateThreadError, ThreadId};
use wyhash::WyHash;

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchOffload {}
impl<T: BenchThreading + BenchOffload> SupportedSystem for T {}

const TASK: ThreadId = ThreadId::new(1);
const BAD_TASK: ThreadId = ThreadId::new(42);

static SEQ: SeqTracker = SeqTracker::new();
static RECEIVED_PARAM: AtomicUsize = AtomicUsize::new(0);

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    assert!(System::is_task_context());
    assert!(!System::is_interrupt_context());

    // `Hash`
    let hash = |x: ThreadId| {
        let mut hasher = WyHash::with_seed(42);
        x.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash(TASK), hash(TASK));
    assert_eq!(hash(BAD_TASK), hash(BAD_TASK));

    System::thread_create(TASK, "task", 1, task_body::<System, D>, 42).unwrap();
    assert_eq!(
        System::thread_create(TASK, "task", 1, task_body::<System, D>, 0),
        Err(CreateThreadError::BadObjectState)
    );

    // Invalid thread ID. These are no-ops.
    System::thread_start(BAD_TASK);
    System::thread_suspend(BAD_TASK);
    System::thread_resume(BAD_TASK);
    System::thread_abort(BAD_TASK);

    // Starting a thread twice is a no-op
    System::thread_start(TASK);
    System::thread_start(TASK);

    SEQ.expect_and_replace(0, 1);

    // Let `TASK` run to completion
    System::thread_set_priority(5);

    SEQ.expect_and_replace(2, 3);
    assert_eq!(RECEIVED_PARAM.load(Ordering::Relaxed), 42);

    // The ID of an exited thread can be reused
    System::thread_create(TASK, "task", 1, task_body::<System, D>, 43).unwrap();

    // So can the ID of an aborted thread
    System::thread_abort(TASK);
    System::thread_create(TASK, "task", 1, task_body::<System, D>, 44).unwrap();
    System::thread_abort(TASK);

    // Many dormant threads
    let ids: ArrayVec<ThreadId, 4> = (10..14).map(ThreadId::new).collect();
    for &id in &ids {
        System::thread_create(id, "dormant", 1, task_body::<System, D>, 0).unwrap();
    }
    for &id in &ids {
        assert_eq!(
            System::thread_create(id, "dormant", 1, task_body::<System, D>, 0),
            Err(CreateThreadError::BadObjectState)
        );
        System::thread_abort(id);
    }

    // Interrupt context
    System::irq_offload(isr::<System, D>, 0);

    SEQ.expect_and_replace(4, 5);

    D::success();
}

fn task_body<System: SupportedSystem, D: Driver>(param: usize) {
    SEQ.expect_and_replace(1, 2);

    assert!(System::is_task_context());
    RECEIVED_PARAM.store(param, Ordering::Relaxed);
}

fn isr<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(3, 4);

    assert!(!System::is_task_context());
    assert_eq!(
        System::thread_create(BAD_TASK, "task", 1, task_body::<System, D>, 0),
        Err(CreateThreadError::BadContext)
    );
}
