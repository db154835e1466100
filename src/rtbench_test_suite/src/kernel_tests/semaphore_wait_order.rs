//! Checks that semaphore waiters are released in the order of priority, and
//! in the order they started waiting among the ones of the same priority.
use arrayvec::ArrayVec;
use core::hash::Hasher;
use rtbench::{prelude::*, Priority, SemaphoreId, ThreadId};
use wyhash::WyHash;

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchSemaphore {}
impl<T: BenchThreading + BenchSemaphore> SupportedSystem for T {}

const N: usize = 8;

const SEM: SemaphoreId = SemaphoreId::new(1);

static SEQ: SeqTracker = SeqTracker::new();
static RELEASE_ORDER: spin::Mutex<ArrayVec<usize, N>> = spin::Mutex::new(ArrayVec::new_const());

/// A pseudo-random priority in `1..=3` for the `i`-th waiter.
fn waiter_priority(i: usize) -> Priority {
    let mut hasher = WyHash::with_seed(42);
    hasher.write_usize(i);
    (hasher.finish() % 3) as Priority + 1
}

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::sem_create(SEM, 0, 1).unwrap();

    // Every waiter preempts `main` as soon as it's started
    System::thread_set_priority(10);

    for i in 0..N {
        let priority = waiter_priority(i);
        log::debug!("waiter {i}: priority {priority}");
        System::thread_create(ThreadId::new(i), "waiter", priority, waiter_body::<System, D>, i)
            .unwrap();
        System::thread_start(ThreadId::new(i));
    }

    SEQ.expect_and_replace(N, N + 1);

    for _ in 0..N {
        System::sem_give(SEM);
    }

    let mut expected: ArrayVec<(Priority, usize), N> =
        (0..N).map(|i| (waiter_priority(i), i)).collect();
    expected.sort_unstable();
    let expected: ArrayVec<usize, N> = expected.into_iter().map(|(_, i)| i).collect();

    assert_eq!(*RELEASE_ORDER.lock(), expected);

    D::success();
}

fn waiter_body<System: SupportedSystem, D: Driver>(i: usize) {
    SEQ.expect_and_replace(i, i + 1);

    System::sem_take(SEM).unwrap(); // start waiting, switching to `main`

    RELEASE_ORDER.lock().push(i);
}
