//! The simulated cycle counter and tick alignment
use rtbench::TimeSample;
use std::{sync::atomic::Ordering, time::Instant};

use crate::{
    sched::{Tsm, WaitReason},
    State, ThreadRole,
};

impl State {
    /// Get the point of time the counter counts from, establishing it if
    /// necessary.
    pub(crate) fn establish_origin(&self) -> &'static Instant {
        if let Some(x) = self.origin.load(Ordering::Acquire) {
            return x;
        }

        let origin = Box::leak(Box::new(Instant::now()));

        // If another thread won the race, discard `origin`. `AcqRel` makes
        // the contents of the canonical origin visible to other threads.
        match self.origin.compare_exchange(
            None,
            Some(origin),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => origin,
            Err(x) => x.unwrap_or(origin),
        }
    }

    pub fn timing_init(&self) {
        log::trace!("timing_init");
        self.session.init(|| {
            let origin = self.establish_origin();
            log::debug!(
                "counter origin = {origin:?}, frequency = {:?}",
                self.config.counter_frequency
            );
        });
    }

    pub fn timing_start(&self) {
        log::trace!("timing_start");
        self.session.start();
    }

    pub fn timing_stop(&self) {
        log::trace!("timing_stop");
        self.session.stop();
    }

    /// Read the counter. The counter is the host's monotonic clock scaled to
    /// `Config::counter_frequency`.
    pub fn timing_counter_get(&self) -> TimeSample {
        let origin = self.establish_origin();
        let elapsed_ns = u64::try_from(origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
        TimeSample::from_raw(self.config.counter_frequency.ns_to_cycles(elapsed_ns))
    }

    /// Block until the next tick interrupt is handled.
    pub fn sync_ticks(&'static self) {
        log::trace!("sync_ticks");
        let (mut lock, role) = self.enter();
        let ThreadRole::Task(me) = role else {
            panic!("`sync_ticks` must be called from task context");
        };
        let target = lock.tick_count + 1;
        lock.threads[me].st = Tsm::Waiting(WaitReason::Tick(target));
        lock.sleepers.push(me);
        self.leave(lock, role);
    }
}
