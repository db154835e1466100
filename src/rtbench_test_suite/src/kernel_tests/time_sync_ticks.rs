//! Checks that `sync_ticks` returns at tick boundaries.
use rtbench::{prelude::*, TimeSample};

use super::Driver;

pub trait SupportedSystem: BenchThreading + BenchTiming {}
impl<T: BenchThreading + BenchTiming> SupportedSystem for T {}

const NUM_ROUNDS: usize = 100;
const NUM_MID_TICK_ROUNDS: usize = 20;

fn elapsed_ns<System: SupportedSystem>(since: &TimeSample) -> u64 {
    let now = System::timing_counter_get();
    System::timing_cycles_to_ns(System::timing_cycles_get(since, &now))
}

/// The host may deschedule us at any time, so only most rounds have to pass.
fn assert_mostly(num_good: usize, num_rounds: usize, what: &str) {
    log::debug!("{num_good} of {num_rounds} rounds were {what}");
    assert!(
        num_good * 10 >= num_rounds * 9,
        "only {num_good} of {num_rounds} rounds were {what}"
    );
}

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::timing_init();
    System::timing_start();

    // Align to a tick boundary first
    System::sync_ticks();

    // Back-to-back calls are one tick period apart
    let mut num_good = 0;
    let mut last = System::timing_counter_get();
    for _ in 0..NUM_ROUNDS {
        System::sync_ticks();
        let now = System::timing_counter_get();
        let delta_ns = System::timing_cycles_to_ns(System::timing_cycles_get(&last, &now));
        log::trace!("delta = {delta_ns}ns");
        assert!(delta_ns > 0);
        if (D::TICK_PERIOD_NS / 2..=D::TICK_PERIOD_NS * 2).contains(&delta_ns) {
            num_good += 1;
        }
        last = now;
    }
    assert_mostly(num_good, NUM_ROUNDS, "one tick period long");

    // A call made halfway through a tick period returns at the next boundary
    let mut num_good = 0;
    for _ in 0..NUM_MID_TICK_ROUNDS {
        System::sync_ticks();
        let aligned = System::timing_counter_get();
        while elapsed_ns::<System>(&aligned) < D::TICK_PERIOD_NS / 2 {}

        let mid = System::timing_counter_get();
        System::sync_ticks();
        let from_mid_ns = elapsed_ns::<System>(&mid);
        let from_aligned_ns = elapsed_ns::<System>(&aligned);
        log::trace!("from mid = {from_mid_ns}ns, from aligned = {from_aligned_ns}ns");
        if from_mid_ns <= D::TICK_PERIOD_NS && from_aligned_ns >= D::TICK_PERIOD_NS * 3 / 4 {
            num_good += 1;
        }
    }
    assert_mostly(num_good, NUM_MID_TICK_ROUNDS, "aligned to the next boundary");

    System::timing_stop();

    D::success();
}
