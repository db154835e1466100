//! The benchmark framework that runs on `rtbench`.
use arrayvec::ArrayVec;
use core::fmt;
use rtbench::{Bench, TimeSample};

use crate::utils::sort::insertion_sort;

/// Identifies a measured interval.
pub type Interval = &'static str;

/// The number of samples taken per interval.
const NUM_SAMPLES: usize = 45;

/// The number of initial samples discarded as warm-up.
const NUM_WARMUP_SAMPLES: usize = 4;

/// The priority of the bencher's main thread. Threads created by a benchmark
/// use more urgent priorities to preempt it.
pub const MAIN_PRIORITY: rtbench::Priority = 3;

/// The options for the bencher.
pub trait BencherOptions<System: Bench> {
    /// Get a reference to the associated [`BencherState`].
    fn state() -> &'static BencherState;

    /// Execute a single benchmark iteration.
    ///
    /// The bencher calls this method for one or more times from its main
    /// thread.
    fn iter();

    /// Signal the completion of a benchmark run.
    fn finish();
}

/// The API to be used by a measured program. Automatically implemented on every
/// `T: `[`BencherOptions`]`<System>`.
pub trait Bencher<System> {
    fn mark_start();
    fn mark_end(int: Interval);
}

/// The measurement state of a benchmark. Each benchmark owns one in a static.
pub struct BencherState(spin::Mutex<BencherStateInner>);

struct BencherStateInner {
    mark: TimeSample,
    intervals: ArrayVec<IntervalRecord, 8>,
}

struct IntervalRecord {
    name: Interval,
    /// Nanoseconds
    samples: ArrayVec<u64, NUM_SAMPLES>,
}

impl BencherState {
    pub const fn new() -> Self {
        Self(spin::Mutex::new(BencherStateInner {
            mark: TimeSample::from_raw(0),
            intervals: ArrayVec::new_const(),
        }))
    }
}

impl<System: Bench, Options: BencherOptions<System>> Bencher<System> for Options {
    #[inline(never)]
    fn mark_start() {
        let now = System::timing_counter_get();
        Options::state().0.lock().mark = now;
    }

    #[inline(never)]
    fn mark_end(name: Interval) {
        let now = System::timing_counter_get();
        let mut state = Options::state().0.lock();
        let state = &mut *state;
        let delta = System::timing_cycles_to_ns(System::timing_cycles_get(&state.mark, &now));

        // Find the `IntervalRecord` for `int`. If there's none, create one
        let interval = if let Some(i) = state
            .intervals
            .iter()
            .position(|interval| interval.name == name)
        {
            &mut state.intervals[i]
        } else if state
            .intervals
            .try_push(IntervalRecord {
                name,
                samples: ArrayVec::new(),
            })
            .is_ok()
        {
            state.intervals.last_mut().unwrap()
        } else {
            panic!("too many unique measurement intervals");
        };

        // Record the measured duration. Drop any excessive samples.
        let _ = interval.samples.try_push(delta);
    }
}

/// The main thread body of a benchmark. Set the thread's priority to
/// [`MAIN_PRIORITY`], run [`BencherOptions::iter`] until every interval has
/// enough samples, and report the result through `log`.
pub fn main_task<System: Bench, Options: BencherOptions<System>>(_: usize) {
    System::thread_set_priority(MAIN_PRIORITY);
    System::timing_init();
    System::timing_start();

    while {
        // Start every iteration at a tick boundary so that the tick interrupt
        // is unlikely to land in a measured interval
        System::sync_ticks();

        <Options as Bencher<System>>::mark_start();
        <Options as Bencher<System>>::mark_end("(empty)");

        Options::iter();

        let state = Options::state().0.lock();

        // If there's no custom intervals defined at this point, it's a usage
        // error.
        if state.intervals.len() <= 1 {
            panic!("`mark_end` has never been called during the iteration");
        }

        // Repeat until all instances of `IntervalRecord::samples` are full.
        let incomplete = state.intervals.iter().any(|i| !i.samples.is_full());
        drop(state);
        incomplete
    } {}

    System::timing_stop();

    // Report the result
    {
        let mut state = Options::state().0.lock();
        for interval in state.intervals.iter_mut() {
            let summary = Summary::new(&mut interval.samples);

            log::warn!(
                "{}... mean = {}, med = {} [ns]",
                interval.name,
                summary.mean,
                summary.percentiles[2],
            );

            log::info!(
                "  (0/10/50/90/100th percentiles: {} ─ {} ═ {} ═ {} ─ {})",
                summary.percentiles[0],
                summary.percentiles[1],
                summary.percentiles[2],
                summary.percentiles[3],
                summary.percentiles[4],
            );
        }
    }

    Options::finish();
}

/// The statistics of one interval.
#[derive(Debug, PartialEq)]
struct Summary {
    mean: FixedPoint2,
    /// 0/10/50/90/100th percentiles
    percentiles: [u64; 5],
}

impl Summary {
    /// Summarize a full sample buffer. The warm-up samples are discarded and
    /// the rest is sorted in place.
    fn new(samples: &mut [u64]) -> Self {
        assert_eq!(samples.len(), NUM_SAMPLES);

        let samples = &mut samples[NUM_WARMUP_SAMPLES..];
        assert_eq!(samples.len(), 41);

        insertion_sort(samples);

        let percentiles = [
            samples[0],  // 0%
            samples[4],  // 10%
            samples[20], // 50%
            samples[36], // 90%
            samples[40], // 100%
        ];

        let sum: u64 = samples.iter().sum();
        let mean = FixedPoint2(sum * 100 / samples.len() as u64);

        Self { mean, percentiles }
    }
}

/// A fixed-point number with two fractional digits.
#[derive(Debug, PartialEq)]
struct FixedPoint2(u64);

impl fmt::Display for FixedPoint2 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn fixed_point_display() {
        assert_eq!(FixedPoint2(12345).to_string(), "123.45");
        assert_eq!(FixedPoint2(7).to_string(), "0.07");
    }

    #[test]
    fn summary_discards_warmup() {
        // The warm-up samples are outliers
        let mut samples = [0u64; NUM_SAMPLES];
        samples[..NUM_WARMUP_SAMPLES].fill(1_000_000);
        for (i, x) in samples[NUM_WARMUP_SAMPLES..].iter_mut().enumerate() {
            *x = 100 + (40 - i as u64);
        }

        let summary = Summary::new(&mut samples);
        assert_eq!(summary.percentiles, [100, 104, 120, 136, 140]);
        assert_eq!(summary.mean, FixedPoint2(12000));
    }

    #[quickcheck]
    fn qc_summary_is_ordered(samples: Vec<u64>) {
        let mut buf = [0u64; NUM_SAMPLES];
        for (x, y) in buf.iter_mut().zip(samples.iter().cycle()) {
            *x = y >> 16;
        }
        let summary = Summary::new(&mut buf);
        assert!(summary.percentiles.windows(2).all(|w| w[0] <= w[1]));
        let mean = summary.mean.0 / 100;
        assert!(summary.percentiles[0] <= mean && mean <= summary.percentiles[4]);
    }
}
