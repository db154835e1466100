//! Aborts threads in various states.
use assert_matches::assert_matches;
use core::sync::atomic::{AtomicBool, Ordering};
use rtbench::{
    prelude::*, DestroyMutexError, MutexId, SemaphoreId, ThreadId, UnlockMutexError,
};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchSemaphore + BenchMutex {}
impl<T: BenchThreading + BenchSemaphore + BenchMutex> SupportedSystem for T {}

const DORMANT: ThreadId = ThreadId::new(1);
const WAITER: ThreadId = ThreadId::new(2);
const SELF_ABORTER: ThreadId = ThreadId::new(3);
const OWNER: ThreadId = ThreadId::new(4);

const SEM: SemaphoreId = SemaphoreId::new(1);
const M: MutexId = MutexId::new(1);

static SEQ: SeqTracker = SeqTracker::new();
static NEVER_RAN: AtomicBool = AtomicBool::new(true);

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::sem_create(SEM, 0, 1).unwrap();
    System::mutex_create(M).unwrap();

    // Aborted before it gets to run
    System::thread_create(DORMANT, "dormant", 1, never_body::<System, D>, 0).unwrap();
    System::thread_start(DORMANT);
    System::thread_abort(DORMANT);
    System::thread_set_priority(5);
    System::thread_set_priority(0);
    assert!(NEVER_RAN.load(Ordering::Relaxed));

    // Aborted while waiting for a semaphore
    System::thread_create(WAITER, "waiter", -1, waiter_body::<System, D>, 0).unwrap();
    System::thread_start(WAITER);

    SEQ.expect_and_replace(1, 2);

    System::thread_abort(WAITER);

    // `WAITER` isn't waiting anymore, so the permit stays
    System::sem_give(SEM);
    System::sem_take(SEM).unwrap();

    // Aborts itself
    System::thread_create(SELF_ABORTER, "self-aborter", -1, self_aborter_body::<System, D>, 0)
        .unwrap();
    System::thread_start(SELF_ABORTER);

    SEQ.expect_and_replace(3, 4);

    // Aborted while owning a mutex
    System::thread_create(OWNER, "owner", -1, owner_body::<System, D>, 0).unwrap();
    System::thread_start(OWNER);

    SEQ.expect_and_replace(5, 6);

    System::thread_abort(OWNER);
    assert_matches!(System::mutex_unlock(M), Err(UnlockMutexError::NotOwner));
    assert_matches!(
        System::mutex_destroy(M),
        Err(DestroyMutexError::BadObjectState)
    );

    // The ID of an aborted thread can be reused
    System::thread_create(DORMANT, "dormant", -1, reused_body::<System, D>, 7).unwrap();
    System::thread_start(DORMANT);

    SEQ.expect_and_replace(7, 8);
    assert!(NEVER_RAN.load(Ordering::Relaxed));

    D::success();
}

fn never_body<System: SupportedSystem, D: Driver>(_: usize) {
    NEVER_RAN.store(false, Ordering::Relaxed);
}

fn waiter_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(0, 1);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `main`

    unreachable!();
}

fn self_aborter_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(2, 3);

    System::thread_abort(SELF_ABORTER); // doesn't return

    unreachable!();
}

fn owner_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(4, 5);

    System::mutex_lock(M).unwrap();
    System::thread_suspend(OWNER); // switching to `main`

    unreachable!();
}

fn reused_body<System: SupportedSystem, D: Driver>(param: usize) {
    assert_eq!(param, 7);
    SEQ.expect_and_replace(6, 7);
}
