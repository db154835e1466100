//! Clock source values and the timing session.
use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

/// A count of counter cycles.
pub type Cycles = u64;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A raw reading of a port's cycle counter.
///
/// The value is only meaningful relative to another reading taken on the same
/// clock domain. See [`TimeSample::cycles_since`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TimeSample(u64);

impl TimeSample {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Get the number of cycles elapsed since `start`.
    ///
    /// The counter is allowed to wrap around once between the two readings.
    /// Anything beyond that produces a meaningless value.
    #[inline]
    pub const fn cycles_since(self, start: TimeSample) -> Cycles {
        self.0.wrapping_sub(start.0)
    }
}

impl fmt::Debug for TimeSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeSample({})", self.0)
    }
}

/// The frequency of a cycle counter, used to convert cycles to nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockFrequency {
    hz: u64,
}

impl ClockFrequency {
    /// A 1 GHz counter, whose cycles are nanoseconds.
    pub const GHZ: Self = Self::from_hz(1_000_000_000);

    /// Construct a `ClockFrequency`.
    ///
    /// # Panics
    ///
    /// Panics if `hz` is zero.
    pub const fn from_hz(hz: u64) -> Self {
        assert!(hz > 0, "counter frequency must be non-zero");
        Self { hz }
    }

    #[inline]
    pub const fn as_hz(self) -> u64 {
        self.hz
    }

    /// Convert `cycles` to nanoseconds, rounding to the nearest integer.
    ///
    /// The intermediate product is computed in 128 bits, so the result is
    /// within half a nanosecond of the exact value for every input. Results
    /// not representable in `u64` saturate.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtbench::ClockFrequency;
    /// let freq = ClockFrequency::from_hz(24_000_000);
    /// assert_eq!(freq.cycles_to_ns(24), 1_000);
    /// assert_eq!(freq.cycles_to_ns(1), 42); // 41.666...
    /// ```
    pub fn cycles_to_ns(self, cycles: Cycles) -> u64 {
        let hz = self.hz as u128;
        let ns = (cycles as u128 * NANOS_PER_SEC + hz / 2) / hz;
        u64::try_from(ns).unwrap_or(u64::MAX)
    }

    /// Convert `ns` to cycles, rounding to the nearest integer. Results not
    /// representable in `u64` saturate.
    pub fn ns_to_cycles(self, ns: u64) -> Cycles {
        let cycles = (ns as u128 * self.hz as u128 + NANOS_PER_SEC / 2) / NANOS_PER_SEC;
        u64::try_from(cycles).unwrap_or(u64::MAX)
    }
}

impl fmt::Debug for ClockFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.hz)
    }
}

/// The process-wide state of a timing session.
///
/// `init` runs the port's setup closure at most once. `start` and `stop`
/// delimit the window in which benchmark code takes counter readings. The
/// window is a usage convention: readings outside of it are not rejected.
pub struct TimingSession {
    init: spin::Once<()>,
    active: AtomicBool,
}

impl TimingSession {
    pub const fn new() -> Self {
        Self {
            init: spin::Once::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Run `setup` unless a previous call already did.
    pub fn init(&self, setup: impl FnOnce()) {
        self.init.call_once(setup);
    }

    pub fn is_initialized(&self) -> bool {
        self.init.is_completed()
    }

    pub fn start(&self) {
        if !self.is_initialized() {
            log::warn!("timing session started before `timing_init`");
        }
        if self.active.swap(true, Ordering::AcqRel) {
            log::warn!("timing session is already active");
        }
    }

    pub fn stop(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            log::warn!("timing session is not active");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Default for TimingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingSession")
            .field("initialized", &self.is_initialized())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn cycles_since_wraps() {
        let start = TimeSample::from_raw(u64::MAX - 1);
        let end = TimeSample::from_raw(3);
        assert_eq!(end.cycles_since(start), 5);
        assert_eq!(start.cycles_since(start), 0);
    }

    #[test]
    fn saturation() {
        let freq = ClockFrequency::from_hz(1);
        assert_eq!(freq.cycles_to_ns(u64::MAX), u64::MAX);
        assert_eq!(ClockFrequency::from_hz(u64::MAX).ns_to_cycles(u64::MAX), u64::MAX);
    }

    #[test]
    fn ghz_is_identity() {
        for x in [0, 1, 999, 1_000_000_007, u64::MAX] {
            assert_eq!(ClockFrequency::GHZ.cycles_to_ns(x), x);
            assert_eq!(ClockFrequency::GHZ.ns_to_cycles(x), x);
        }
    }

    /// The result of `cycles_to_ns` is the nearest integer to the exact value.
    #[quickcheck]
    fn qc_cycles_to_ns_is_nearest(cycles: u64, hz: u64) {
        let hz = hz.max(24_000_000);
        // Keep the exact result within `u64`
        let cycles = cycles >> 6;
        let freq = ClockFrequency::from_hz(hz);

        let got = freq.cycles_to_ns(cycles) as u128;
        let exact_scaled = cycles as u128 * NANOS_PER_SEC;
        let err_scaled = (got * hz as u128).abs_diff(exact_scaled);
        assert!(
            err_scaled * 2 <= hz as u128,
            "cycles = {cycles}, hz = {hz}, got = {got}"
        );
    }

    /// For counters running at 1 GHz or faster, converting nanoseconds to
    /// cycles and back is accurate to 1ns.
    #[quickcheck]
    fn qc_round_trip(ns: u64, extra_hz: u64) {
        let hz = 1_000_000_000 + extra_hz % 2_900_000_000;
        let ns = ns >> 2;
        let freq = ClockFrequency::from_hz(hz);

        let back = freq.cycles_to_ns(freq.ns_to_cycles(ns));
        assert!(back.abs_diff(ns) <= 1, "ns = {ns}, hz = {hz}, back = {back}");
    }

    #[test]
    fn round_trip_representative() {
        for hz in [1_000_000_000, 1_200_000_000, 2_400_000_000, 3_000_000_000] {
            let freq = ClockFrequency::from_hz(hz);
            for ns in [0, 1, 7, 1_000, 999_999_937, 1 << 40, (1 << 62) - 3] {
                let back = freq.cycles_to_ns(freq.ns_to_cycles(ns));
                assert!(back.abs_diff(ns) <= 1, "ns = {ns}, hz = {hz}, back = {back}");
            }
        }
    }

    #[test]
    fn session_init_is_idempotent() {
        let session = TimingSession::new();
        let mut count = 0;
        session.init(|| count += 1);
        session.init(|| count += 1);
        assert_eq!(count, 1);
        assert!(session.is_initialized());
    }

    #[test]
    fn session_start_stop() {
        let session = TimingSession::new();
        session.init(|| {});
        assert!(!session.is_active());
        session.start();
        assert!(session.is_active());
        // Repeated `start` is tolerated
        session.start();
        assert!(session.is_active());
        session.stop();
        assert!(!session.is_active());
        session.stop();
        assert!(!session.is_active());
    }
}
