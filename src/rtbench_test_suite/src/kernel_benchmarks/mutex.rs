//! Measures the execution times of mutex operations.
//!
//! ```text
//!          main               task1
//!           │ │                 ┊
//!           │ │   mutex lock    ┊     ┐
//!           │ │                 ┊     │ I_LOCK
//!           │ │                 ┊     ┘
//!           │ │  mutex unlock   ┊     ┐
//!           │ │                 ┊     │ I_UNLOCK
//!           │ │                 ┊     ┘
//!           │ │   mutex lock    ┊
//!           │ │     start       ┊
//!           └┬┘ ─────────────► ┌┴┐
//!            │                 │ │
//!            │    mutex lock   │ │    ┐
//!           ┌┴┐ ◀────────────  └┬┘    │ I_LOCK_DISPATCHING
//!           │ │                 │     ┘
//!           │ │  mutex unlock   │     ┐
//!           └┬┘ ─────────────► ┌┴┐    │ I_UNLOCK_DISPATCHING
//!            ┊                 │ │    ┘
//!            ┊   mutex unlock  │ │
//!            ┊      exit       │ │
//!           ┌┴┐ ◀───────────── └┬┘
//!           │ │                 ┊
//! ```
//!
use rtbench::{prelude::*, MutexId, ThreadId};

use crate::utils::benchmark::{Bencher, Interval};

pub trait SupportedSystem: Bench {}
impl<T: Bench> SupportedSystem for T {}

use_benchmark_in_kernel_benchmark!();

const M: MutexId = MutexId::new(1);
const TASK1: ThreadId = ThreadId::new(1);

const I_LOCK: Interval = "lock mutex";
const I_UNLOCK: Interval = "unlock mutex";
const I_LOCK_DISPATCHING: Interval = "lock mutex with dispatch";
const I_UNLOCK_DISPATCHING: Interval = "unlock mutex with dispatch";

fn setup<System: SupportedSystem, B: Bencher<System>>() {
    System::mutex_create(M).unwrap();
}

fn iter<System: SupportedSystem, B: Bencher<System>>() {
    B::mark_start();
    System::mutex_lock(M).unwrap();
    B::mark_end(I_LOCK);

    B::mark_start();
    System::mutex_unlock(M).unwrap();
    B::mark_end(I_UNLOCK);

    System::mutex_lock(M).unwrap();
    System::thread_create(TASK1, "task1", 1, task1_body::<System, B>, 0).unwrap();
    System::thread_start(TASK1);
    B::mark_end(I_LOCK_DISPATCHING);

    B::mark_start(); // I_UNLOCK_DISPATCHING
    System::mutex_unlock(M).unwrap();
}

fn task1_body<System: SupportedSystem, B: Bencher<System>>(_: usize) {
    B::mark_start(); // I_LOCK_DISPATCHING
    System::mutex_lock(M).unwrap();
    B::mark_end(I_UNLOCK_DISPATCHING);

    System::mutex_unlock(M).unwrap();
}
