//! Measures the execution times of thread lifecycle operations.
//!
//! ```text
//!          main               task1
//!           │ │                 ┊
//!           │ │     create      ┊     ┐
//!           │ │                 ┊     │ I_CREATE
//!           │ │                 ┊     ┘
//!           │ │     start       ┊     ┐
//!           └┬┘ ─────────────► ┌┴┐    │ I_START_DISPATCHING
//!            │                 │ │    ┘
//!            │  exit by return │ │    ┐
//!           ┌┴┐ ◀───────────── └┬┘    │ I_EXIT
//!           │ │                 ┊     ┘
//!           │ │ create, abort   ┊     ┐
//!           │ │                 ┊     │ I_ABORT
//!           │ │                 ┊     ┘
//! ```
//!
use rtbench::{prelude::*, ThreadId};

use crate::utils::benchmark::{Bencher, Interval};

pub trait SupportedSystem: Bench {}
impl<T: Bench> SupportedSystem for T {}

use_benchmark_in_kernel_benchmark!();

const TASK1: ThreadId = ThreadId::new(1);
const TASK2: ThreadId = ThreadId::new(2);

const I_CREATE: Interval = "creating thread";
const I_START_DISPATCHING: Interval = "starting thread with dispatch";
const I_EXIT: Interval = "exiting thread by returning";
const I_ABORT: Interval = "aborting dormant thread";

fn setup<System: SupportedSystem, B: Bencher<System>>() {}

fn iter<System: SupportedSystem, B: Bencher<System>>() {
    B::mark_start();
    System::thread_create(TASK1, "task1", 1, task1_body::<System, B>, 0).unwrap();
    B::mark_end(I_CREATE);

    B::mark_start(); // I_START_DISPATCHING
    System::thread_start(TASK1);
    B::mark_end(I_EXIT);

    // Never started
    System::thread_create(TASK2, "task2", 1, task1_body::<System, B>, 0).unwrap();
    B::mark_start();
    System::thread_abort(TASK2);
    B::mark_end(I_ABORT);
}

fn task1_body<System: SupportedSystem, B: Bencher<System>>(_: usize) {
    B::mark_end(I_START_DISPATCHING);
    B::mark_start(); // I_EXIT
}
