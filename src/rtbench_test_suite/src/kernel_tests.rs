//! Kernel test cases. Each module exposes
//! `pub fn main<System: SupportedSystem, D: Driver>(_: usize)`, to be run by
//! `BenchThreading::test_init`.

/// Instantiation parameters of a test case.
///
/// This trait has two purposes: (1) It serves as an interface to a test driver.
/// It provides methods to notify the test driver of test success or failure.
/// (2) It provides runtime access to the port's configuration.
pub trait Driver: 'static {
    /// Signal to the test runner that a test has succeeded.
    fn success();

    /// The period of the tick interrupt in nanoseconds.
    const TICK_PERIOD_NS: u64;
}

pub mod irq_offload;
pub mod mutex_misc;
pub mod mutex_unlock_and_dispatch;
pub mod offload_work_queue;
pub mod semaphore_interrupt_handler;
pub mod semaphore_misc;
pub mod semaphore_signal_and_dispatch;
pub mod semaphore_wait_order;
pub mod task_abort;
pub mod task_misc;
pub mod task_set_priority;
pub mod task_suspend_resume;
pub mod task_yield_priority;
pub mod time_clock;
pub mod time_sync_ticks;
