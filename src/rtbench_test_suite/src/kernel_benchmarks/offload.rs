//! Measures the latencies of interrupt offloading and the offload work queue.
//!
//! ```text
//!          main               interrupt          work queue
//!           │ │                  ┊                  ┊
//!           │ │   irq_offload    ┊                  ┊     ┐
//!           └┬┘ ──────────────► ┌┴┐                 ┊     │ I_IRQ_ENTRY
//!            │                  │ │                 ┊     ┘
//!            │     return       │ │                 ┊     ┐
//!           ┌┴┐ ◀────────────── └┬┘                 ┊     │ I_IRQ_EXIT
//!           │ │                  ┊                  ┊     ┘
//!           │ │   submit work    ┊                  ┊     ┐
//!           └┬┘ ───────────────────────────────►  ┌┴┐    │ I_SUBMIT_DISPATCHING
//!            │                   ┊                │ │    ┘
//!           ┌┴┐ ◀─────────────────────────────────└┬┘
//!           │ │   irq_offload    ┊                  ┊
//!           └┬┘ ──────────────► ┌┴┐                 ┊
//!            │    submit work   │ │                 ┊     ┐
//!            │                  └┬┘ ────────────► ┌┴┐    │ I_ISR_SUBMIT_DISPATCHING
//!            │                   ┊                │ │    ┘
//!           ┌┴┐ ◀─────────────────────────────────└┬┘
//!           │ │                  ┊                  ┊
//! ```
//!
use core::sync::atomic::{AtomicBool, Ordering};
use rtbench::prelude::*;

use crate::utils::benchmark::{Bencher, Interval};

pub trait SupportedSystem: Bench {}
impl<T: Bench> SupportedSystem for T {}

use_benchmark_in_kernel_benchmark!();

const I_IRQ_ENTRY: Interval = "entering interrupt by irq_offload";
const I_IRQ_EXIT: Interval = "returning from interrupt";
const I_SUBMIT_DISPATCHING: Interval = "submitting work with dispatch";
const I_ISR_SUBMIT_DISPATCHING: Interval = "submitting work from interrupt";

/// Selects the interval `work` ends.
static FROM_ISR: AtomicBool = AtomicBool::new(false);

fn setup<System: SupportedSystem, B: Bencher<System>>() {
    System::offload_setup();
    System::offload_create_work(work::<System, B>);
}

fn iter<System: SupportedSystem, B: Bencher<System>>() {
    B::mark_start(); // I_IRQ_ENTRY
    System::irq_offload(isr::<System, B>, 0);
    B::mark_end(I_IRQ_EXIT);

    FROM_ISR.store(false, Ordering::Relaxed);
    B::mark_start(); // I_SUBMIT_DISPATCHING
    System::offload_submit_work();

    FROM_ISR.store(true, Ordering::Relaxed);
    System::irq_offload(submit_isr::<System, B>, 0);
}

fn isr<System: SupportedSystem, B: Bencher<System>>(_: usize) {
    B::mark_end(I_IRQ_ENTRY);
    B::mark_start(); // I_IRQ_EXIT
}

fn submit_isr<System: SupportedSystem, B: Bencher<System>>(_: usize) {
    B::mark_start(); // I_ISR_SUBMIT_DISPATCHING
    System::offload_submit_work();
}

fn work<System: SupportedSystem, B: Bencher<System>>() {
    if FROM_ISR.load(Ordering::Relaxed) {
        B::mark_end(I_ISR_SUBMIT_DISPATCHING);
    } else {
        B::mark_end(I_SUBMIT_DISPATCHING);
    }
}
