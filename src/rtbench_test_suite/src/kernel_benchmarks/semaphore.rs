//! Measures the execution times of semaphore operations.
//!
//! ```text
//!      sem      main               task1
//!      │1│       │ │                 ┊
//!      │ │       │ │                 ┊     ┐
//!      ├─┤       │ │ sem take        ┊     │ I_TAKE
//!      │0│       │ │                 ┊     ┘
//!      │ │       │ │     start       ┊
//!      │ │       └┬┘ ─────────────► ┌┴┐
//!      │ │        │                 │ │
//!      │ │        │     sem take    │ │    ┐
//!      │ │       ┌┴┐ ◀────────────  └┬┘    │ I_TAKE_DISPATCHING
//!      │ │       │ │                 │     ┘
//!      │ │       │ │   sem give      │     ┐
//!      ├─┤       └┬┘ ─────────────► ┌┴┐    │ I_GIVE_DISPATCHING
//!      │0│        ┊                 │ │    ┘
//!      │ │        ┊                 │ │             ┐
//!      ├─┤        ┊                 │ │  sem give   │ I_GIVE
//!      │1│        ┊      exit       │ │             ┘
//!      │ │       ┌┴┐ ◀───────────── └┬┘
//!      │ │       │ │                 ┊
//! ```
//!
use rtbench::{prelude::*, SemaphoreId, ThreadId};

use crate::utils::benchmark::{Bencher, Interval};

pub trait SupportedSystem: Bench {}
impl<T: Bench> SupportedSystem for T {}

use_benchmark_in_kernel_benchmark!();

const SEM: SemaphoreId = SemaphoreId::new(1);
const TASK1: ThreadId = ThreadId::new(1);

const I_TAKE_DISPATCHING: Interval = "take semaphore with dispatch";
const I_TAKE: Interval = "take semaphore";
const I_GIVE_DISPATCHING: Interval = "give semaphore with dispatch";
const I_GIVE: Interval = "give semaphore";

fn setup<System: SupportedSystem, B: Bencher<System>>() {
    System::sem_create(SEM, 1, 1).unwrap();
}

fn iter<System: SupportedSystem, B: Bencher<System>>() {
    B::mark_start(); // I_TAKE
    System::sem_take(SEM).unwrap();
    B::mark_end(I_TAKE);

    System::thread_create(TASK1, "task1", 1, task1_body::<System, B>, 0).unwrap();
    System::thread_start(TASK1);
    B::mark_end(I_TAKE_DISPATCHING);

    B::mark_start(); // I_GIVE_DISPATCHING
    System::sem_give(SEM);
}

fn task1_body<System: SupportedSystem, B: Bencher<System>>(_: usize) {
    B::mark_start(); // I_TAKE_DISPATCHING
    System::sem_take(SEM).unwrap();
    B::mark_end(I_GIVE_DISPATCHING);

    B::mark_start();
    System::sem_give(SEM);
    B::mark_end(I_GIVE);
}
