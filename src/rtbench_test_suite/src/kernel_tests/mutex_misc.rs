//! Validates error codes returned by mutex manipulation methods. Also,
//! checks that a mutex stays locked when its owner is aborted.
use core::hash::{Hash, Hasher};
use rtbench::{
    prelude::*, CreateMutexError, DestroyMutexError, LockMutexError, MutexId, ThreadId,
    UnlockMutexError,
};
use wyhash::WyHash;

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchMutex + BenchOffload {}
impl<T: BenchThreading + BenchMutex + BenchOffload> SupportedSystem for T {}

const M1: MutexId = MutexId::new(1);
const M2: MutexId = MutexId::new(2);
const BAD_M: MutexId = MutexId::new(42);
const TASK: ThreadId = ThreadId::new(1);

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    // `Hash`
    let hash = |x: MutexId| {
        let mut hasher = WyHash::with_seed(42);
        x.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash(M1), hash(M1));
    assert_eq!(hash(M2), hash(M2));

    System::mutex_create(M1).unwrap();
    System::mutex_create(M2).unwrap();
    assert_eq!(
        System::mutex_create(M1),
        Err(CreateMutexError::BadObjectState)
    );

    // Invalid mutex ID
    assert_eq!(System::mutex_lock(BAD_M), Err(LockMutexError::NoAccess));
    assert_eq!(System::mutex_unlock(BAD_M), Err(UnlockMutexError::NoAccess));
    assert_eq!(
        System::mutex_destroy(BAD_M),
        Err(DestroyMutexError::NoAccess)
    );

    // Not locked
    assert_eq!(System::mutex_unlock(M1), Err(UnlockMutexError::NotOwner));

    // Double lock
    System::mutex_lock(M1).unwrap();
    assert_eq!(System::mutex_lock(M1), Err(LockMutexError::WouldDeadlock));
    assert_eq!(
        System::mutex_destroy(M1),
        Err(DestroyMutexError::BadObjectState)
    );

    // Interrupt context
    System::irq_offload(isr::<System, D>, 0);

    SEQ.expect_and_replace(1, 2);

    // `TASK` fails to unlock `M1` and then blocks on it
    System::thread_create(TASK, "task", -1, task_body::<System, D>, 0).unwrap();
    System::thread_start(TASK);

    SEQ.expect_and_replace(3, 4);

    System::mutex_unlock(M1).unwrap(); // hands `M1` over to `TASK`

    SEQ.expect_and_replace(5, 6);

    // `TASK` is suspended while owning `M1`
    assert_eq!(System::mutex_unlock(M1), Err(UnlockMutexError::NotOwner));
    System::thread_abort(TASK);

    // Aborting the owner doesn't unlock the mutex
    assert_eq!(System::mutex_unlock(M1), Err(UnlockMutexError::NotOwner));
    assert_eq!(
        System::mutex_destroy(M1),
        Err(DestroyMutexError::BadObjectState)
    );

    System::mutex_destroy(M2).unwrap();
    assert_eq!(System::mutex_lock(M2), Err(LockMutexError::NoAccess));

    SEQ.expect_and_replace(6, 7);

    D::success();
}

fn task_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(2, 3);

    assert_eq!(System::mutex_unlock(M1), Err(UnlockMutexError::NotOwner));
    System::mutex_lock(M1).unwrap(); // start waiting, switching to `main`

    SEQ.expect_and_replace(4, 5);

    System::thread_suspend(TASK); // switching to `main`

    unreachable!();
}

fn isr<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(0, 1);

    assert_eq!(System::mutex_lock(M2), Err(LockMutexError::BadContext));
    assert_eq!(System::mutex_unlock(M1), Err(UnlockMutexError::BadContext));
    assert_eq!(
        System::mutex_create(BAD_M),
        Err(CreateMutexError::BadContext)
    );
    assert_eq!(
        System::mutex_destroy(M2),
        Err(DestroyMutexError::BadContext)
    );
}
