//! Checks the behavior of the cycle counter.
use rtbench::prelude::*;

use super::Driver;
use crate::utils::SeqTracker;

pub trait SupportedSystem: BenchThreading + BenchTiming + BenchOffload {}
impl<T: BenchThreading + BenchTiming + BenchOffload> SupportedSystem for T {}

static SEQ: SeqTracker = SeqTracker::new();

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    // Idempotent
    System::timing_init();
    System::timing_init();

    System::timing_start();

    // Monotonic
    let mut last = System::timing_counter_get();
    for _ in 0..1000 {
        let now = System::timing_counter_get();
        assert!(now >= last, "{now:?} < {last:?}");
        last = now;
    }

    // Advances across ticks
    let start = System::timing_counter_get();
    System::sync_ticks();
    System::sync_ticks();
    let end = System::timing_counter_get();
    let elapsed_ns = System::timing_cycles_to_ns(System::timing_cycles_get(&start, &end));
    log::debug!("two ticks took {elapsed_ns}ns");
    assert!(elapsed_ns > 0);

    // Conversion
    let hz = System::COUNTER_FREQUENCY.as_hz();
    assert_eq!(System::timing_cycles_to_ns(0), 0);
    assert_eq!(System::timing_cycles_to_ns(hz), 1_000_000_000);
    assert_eq!(System::timing_cycles_get(&start, &start), 0);

    // Readable from an interrupt handler
    System::irq_offload(isr::<System, D>, 0);
    SEQ.expect_and_replace(1, 2);
    assert!(System::timing_counter_get() >= end);

    System::timing_stop();

    D::success();
}

fn isr<System: SupportedSystem, D: Driver>(_: usize) {
    SEQ.expect_and_replace(0, 1);

    let a = System::timing_counter_get();
    let b = System::timing_counter_get();
    assert!(b >= a);
}
