//! Measures the execution times of yielding the processor and changing the
//! priority.
//!
//! ```text
//!          main               task1              task2
//!           │ │                 ┊                  ┊
//!           │ │    start        ┊                  ┊
//!           └┬┘ ─────────────► ┌┴┐                 ┊
//!            │                 │ │     start       ┊
//!            │                 │ │ ─────────────►  ┊
//!            │                 │ │                 ┊
//!            │                 │ │     yield       ┊     ┐
//!            │                 └┬┘ ─────────────► ┌┴┐    │ I_YIELD_DISPATCHING
//!            │                  │                 │ │    ┘
//!            │                  │      yield      │ │    ┐
//!            │                 ┌┴┐ ◀───────────── └┬┘    │ I_YIELD_DISPATCHING
//!            │                 │ │                 │     ┘
//!            │                 │ │ exit by return  │
//!            │                 └┬┘ ─────────────► ┌┴┐
//!            │                  ┊                 │ │    ┐
//!            │                  ┊      yield      │ │    │ I_YIELD
//!            │                  ┊                 │ │    ┘
//!            │    exit by return                  │ │
//!           ┌┴┐ ◀─────────────────────────────── └┬┘
//!           │ │                                    ┊
//!           │ │   set priority                     ┊     ┐
//!           │ │                                    ┊     │ I_SET_PRIORITY
//!           │ │                                    ┊     ┘
//! ```
//!
use rtbench::{prelude::*, ThreadId};

use crate::utils::benchmark::{Bencher, Interval, MAIN_PRIORITY};

pub trait SupportedSystem: Bench {}
impl<T: Bench> SupportedSystem for T {}

use_benchmark_in_kernel_benchmark!();

const TASK1: ThreadId = ThreadId::new(1);
const TASK2: ThreadId = ThreadId::new(2);

const I_YIELD_DISPATCHING: Interval = "yield with dispatch";
const I_YIELD: Interval = "yield without dispatch";
const I_SET_PRIORITY: Interval = "set priority without dispatch";

fn setup<System: SupportedSystem, B: Bencher<System>>() {}

fn iter<System: SupportedSystem, B: Bencher<System>>() {
    System::thread_create(TASK1, "task1", 1, task1_body::<System, B>, 0).unwrap();
    System::thread_create(TASK2, "task2", 1, task2_body::<System, B>, 0).unwrap();
    System::thread_start(TASK1);

    B::mark_start();
    System::thread_set_priority(MAIN_PRIORITY);
    B::mark_end(I_SET_PRIORITY);
}

fn task1_body<System: SupportedSystem, B: Bencher<System>>(_: usize) {
    // Same priority; doesn't preempt
    System::thread_start(TASK2);

    B::mark_start();
    System::yield_now();
    B::mark_end(I_YIELD_DISPATCHING);
}

fn task2_body<System: SupportedSystem, B: Bencher<System>>(_: usize) {
    B::mark_end(I_YIELD_DISPATCHING);

    B::mark_start();
    System::yield_now(); // switching to `task1`

    // `task1` has exited
    B::mark_start();
    System::yield_now();
    B::mark_end(I_YIELD);
}
