//! Unlocks a mutex, handing it over to the most urgent waiter. Waiters of the
//! same priority acquire the mutex in the order they started waiting.
use rtbench::{prelude::*, MutexId, Priority, ThreadId};

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchMutex {}
impl<T: BenchThreading + BenchMutex> SupportedSystem for T {}

const M: MutexId = MutexId::new(1);

/// The priorities of the waiters, in the order they start waiting.
const PRIORITIES: [Priority; 4] = [3, 1, 2, 1];

/// The position of each waiter in the acquisition order.
const ACQUISITION_ORDER: [usize; 4] = [3, 0, 2, 1];

const N: usize = PRIORITIES.len();

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::mutex_create(M).unwrap();
    System::mutex_lock(M).unwrap();

    // Every waiter preempts `main` as soon as it's started
    System::thread_set_priority(10);

    for (i, &priority) in PRIORITIES.iter().enumerate() {
        System::thread_create(ThreadId::new(i), "waiter", priority, waiter_body::<System, D>, i)
            .unwrap();
        System::thread_start(ThreadId::new(i));
    }

    SEQ.expect_and_replace(N, N + 1);

    // The waiters run to completion one by one
    System::mutex_unlock(M).unwrap();

    SEQ.expect_and_replace(2 * N + 1, 2 * N + 2);

    // Nobody owns `M` now
    System::mutex_lock(M).unwrap();
    System::mutex_unlock(M).unwrap();
    System::mutex_destroy(M).unwrap();

    D::success();
}

fn waiter_body<System: SupportedSystem, D: Driver>(i: usize) {
    SEQ.expect_and_replace(i, i + 1);

    System::mutex_lock(M).unwrap(); // start waiting, switching to `main`

    let pos = N + 1 + ACQUISITION_ORDER[i];
    SEQ.expect_and_replace(pos, pos + 1);

    System::mutex_unlock(M).unwrap();
}
