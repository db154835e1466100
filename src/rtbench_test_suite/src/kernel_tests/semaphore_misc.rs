//! Validates error codes returned by semaphore manipulation methods. Also,
//! checks miscellaneous properties of semaphores.
use core::hash::{Hash, Hasher};
use rtbench::{
    prelude::*, CreateSemaphoreError, DestroySemaphoreError, SemaphoreId, TakeSemaphoreError,
    ThreadId,
};
use wyhash::WyHash;

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchSemaphore + BenchOffload {}
impl<T: BenchThreading + BenchSemaphore + BenchOffload> SupportedSystem for T {}

const SEM: SemaphoreId = SemaphoreId::new(1);
const BAD_SEM: SemaphoreId = SemaphoreId::new(42);
const WAITER: ThreadId = ThreadId::new(1);

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    // `Hash`
    let hash = |x: SemaphoreId| {
        let mut hasher = WyHash::with_seed(42);
        x.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash(SEM), hash(SEM));
    assert_ne!(SEM, BAD_SEM);

    // Invalid parameters
    assert_eq!(
        System::sem_create(SEM, 3, 2),
        Err(CreateSemaphoreError::BadParam)
    );
    assert_eq!(
        System::sem_create(SEM, 0, 0),
        Err(CreateSemaphoreError::BadParam)
    );

    System::sem_create(SEM, 0, 2).unwrap();
    assert_eq!(
        System::sem_create(SEM, 0, 2),
        Err(CreateSemaphoreError::BadObjectState)
    );

    // Invalid semaphore ID
    assert_eq!(System::sem_take(BAD_SEM), Err(TakeSemaphoreError::NoAccess));
    assert_eq!(
        System::sem_destroy(BAD_SEM),
        Err(DestroySemaphoreError::NoAccess)
    );
    System::sem_give(BAD_SEM); // no-op

    // Permits beyond the maximum are dropped
    System::sem_give(SEM);
    System::sem_give(SEM);
    System::sem_give(SEM);
    System::sem_take(SEM).unwrap();
    System::sem_take(SEM).unwrap();

    SEQ.expect_and_replace(0, 1);

    // The count is zero now, so `WAITER` blocks
    System::thread_create(WAITER, "waiter", -1, waiter_body::<System, D>, 0).unwrap();
    System::thread_start(WAITER);

    SEQ.expect_and_replace(2, 3);

    assert_eq!(
        System::sem_destroy(SEM),
        Err(DestroySemaphoreError::BadObjectState)
    );

    System::sem_give(SEM); // preempted by `WAITER`

    SEQ.expect_and_replace(4, 5);

    // Destroy and re-create
    System::sem_destroy(SEM).unwrap();
    assert_eq!(System::sem_take(SEM), Err(TakeSemaphoreError::NoAccess));
    System::sem_create(SEM, 1, 1).unwrap();
    System::sem_take(SEM).unwrap();

    // Interrupt context
    System::irq_offload(isr::<System, D>, 0);

    SEQ.expect_and_replace(6, 7);

    System::sem_destroy(SEM).unwrap();
    D::success();
}

fn waiter_body<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(1, 2);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `main`

    SEQ.expect_and_replace(3, 4);
}

fn isr<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(5, 6);

    assert_eq!(System::sem_take(SEM), Err(TakeSemaphoreError::BadContext));
    assert_eq!(
        System::sem_create(BAD_SEM, 0, 1),
        Err(CreateSemaphoreError::BadContext)
    );
    assert_eq!(
        System::sem_destroy(SEM),
        Err(DestroySemaphoreError::BadContext)
    );
}
