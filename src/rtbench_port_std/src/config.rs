use rtbench::{ClockFrequency, Priority};
use std::time::Duration;

/// The build-time configuration of a port instance, given to [`use_port!`].
///
/// [`use_port!`]: crate::use_port
///
/// # Examples
///
/// ```rust,ignore
/// use rtbench_port_std::Config;
///
/// rtbench_port_std::use_port!(
///     unsafe struct System,
///     config = Config::new().tick_period_ms(5),
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// The period of the tick interrupt.
    pub tick_period: Duration,
    /// The frequency of the simulated cycle counter. The counter is derived
    /// from the host's monotonic clock, so frequencies above 1 GHz do not add
    /// resolution.
    pub counter_frequency: ClockFrequency,
    /// The priority of the main thread started by `test_init`.
    pub main_priority: Priority,
    /// The priority of the offload work-queue thread.
    pub work_queue_priority: Priority,
    /// The maximum number of live threads, not counting the main thread and
    /// the work-queue thread.
    pub max_threads: usize,
    pub max_semaphores: usize,
    pub max_mutexes: usize,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            tick_period: Duration::from_millis(1),
            counter_frequency: ClockFrequency::GHZ,
            main_priority: 0,
            work_queue_priority: -1,
            max_threads: 64,
            max_semaphores: 64,
            max_mutexes: 64,
        }
    }

    pub const fn tick_period_ms(self, ms: u64) -> Self {
        assert!(ms > 0, "the tick period must be non-zero");
        Self {
            tick_period: Duration::from_millis(ms),
            ..self
        }
    }

    pub const fn counter_frequency(self, counter_frequency: ClockFrequency) -> Self {
        Self {
            counter_frequency,
            ..self
        }
    }

    pub const fn main_priority(self, main_priority: Priority) -> Self {
        Self {
            main_priority,
            ..self
        }
    }

    pub const fn work_queue_priority(self, work_queue_priority: Priority) -> Self {
        Self {
            work_queue_priority,
            ..self
        }
    }

    pub const fn max_threads(self, max_threads: usize) -> Self {
        Self {
            max_threads,
            ..self
        }
    }

    pub const fn max_semaphores(self, max_semaphores: usize) -> Self {
        Self {
            max_semaphores,
            ..self
        }
    }

    pub const fn max_mutexes(self, max_mutexes: usize) -> Self {
        Self {
            max_mutexes,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        const CONFIG: Config = Config::new();
        assert_eq!(CONFIG.tick_period, Duration::from_millis(1));
        assert_eq!(CONFIG.counter_frequency.as_hz(), 1_000_000_000);
        assert_eq!(CONFIG.main_priority, 0);
        assert_eq!(CONFIG.work_queue_priority, -1);
        assert_eq!(CONFIG.max_threads, 64);
    }

    #[test]
    fn builder() {
        const CONFIG: Config = Config::new()
            .tick_period_ms(5)
            .main_priority(3)
            .max_semaphores(2);
        assert_eq!(CONFIG.tick_period, Duration::from_millis(5));
        assert_eq!(CONFIG.main_priority, 3);
        assert_eq!(CONFIG.max_semaphores, 2);
        assert_eq!(CONFIG.max_mutexes, 64);
    }
}
