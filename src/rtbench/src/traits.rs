//! The capability traits a port implements.
//!
//! Every operation is an associated function. A port implements the traits on
//! a zero-sized system type, and benchmark code is generic over
//! `System: `[`Bench`], so the backend is fixed when the final binary is
//! linked.
//!
//! # Contexts
//!
//! Operations run either in *task context* (a thread created by
//! [`BenchThreading::thread_create`] or the main thread started by
//! [`BenchThreading::test_init`]) or in *interrupt context* (a routine passed to
//! [`BenchOffload::irq_offload`] or a tick handler). Blocking operations are
//! only valid in task context. Each method documents where it may be called.
use crate::{
    error::*,
    handle::{MutexId, Priority, SemaphoreId, SemaphoreValue, ThreadId},
    time::{ClockFrequency, Cycles, TimeSample},
};

/// The clock source and the timing session.
pub trait BenchTiming: Sized + 'static {
    /// The frequency of the counter read by [`Self::timing_counter_get`].
    const COUNTER_FREQUENCY: ClockFrequency;

    /// Perform the one-time setup of the counter. Calling this more than once
    /// has no additional effect.
    fn timing_init();

    /// Open a measurement window.
    fn timing_start();

    /// Close a measurement window.
    fn timing_stop();

    /// Read the counter.
    ///
    /// The value never decreases (modulo wraparound) and reading it has no
    /// side effects. Callable from any context.
    fn timing_counter_get() -> TimeSample;

    /// Get the number of cycles elapsed from `start` to `end`.
    #[inline]
    fn timing_cycles_get(start: &TimeSample, end: &TimeSample) -> Cycles {
        end.cycles_since(*start)
    }

    /// Convert a cycle count to nanoseconds using [`Self::COUNTER_FREQUENCY`].
    #[inline]
    fn timing_cycles_to_ns(cycles: Cycles) -> u64 {
        Self::COUNTER_FREQUENCY.cycles_to_ns(cycles)
    }

    /// Block the calling thread until the next tick boundary.
    ///
    /// This must be called from task context.
    fn sync_ticks();
}

/// Thread lifecycle, priority control, and yielding.
pub trait BenchThreading: Sized + 'static {
    /// Boot the port and run `init(0)` as the main thread.
    ///
    /// Returns after `init` returns. Other threads are terminated by then. A
    /// panic in any thread or interrupt handler is re-raised from here.
    fn test_init(init: fn(usize));

    /// Set the priority of the calling thread.
    ///
    /// The change takes effect before this function returns: if another ready
    /// thread becomes more urgent than the caller, the caller is preempted
    /// here. The caller is placed behind the ready threads of its new
    /// priority.
    fn thread_set_priority(priority: Priority);

    /// Register a thread without making it runnable.
    fn thread_create(
        id: ThreadId,
        name: &str,
        priority: Priority,
        entry: fn(usize),
        param: usize,
    ) -> Result<(), CreateThreadError>;

    /// Make a created thread runnable. `entry(param)` will run on its own
    /// thread of execution.
    fn thread_start(id: ThreadId);

    /// Remove a thread from the runnable set. Suspending the calling thread
    /// blocks it until another thread resumes it.
    fn thread_suspend(id: ThreadId);

    /// Re-admit a suspended thread to the runnable set.
    fn thread_resume(id: ThreadId);

    /// Terminate a thread immediately.
    ///
    /// Mutexes the thread owns remain locked. If `id` is the calling thread,
    /// this function does not return.
    fn thread_abort(id: ThreadId);

    /// Place the calling thread behind all ready threads of equal priority.
    fn yield_now();

    /// Return a flag indicating whether the caller runs in interrupt context.
    fn is_interrupt_context() -> bool;

    /// Return a flag indicating whether the caller runs in task context.
    fn is_task_context() -> bool;
}

/// Counting semaphores.
pub trait BenchSemaphore: Sized + 'static {
    fn sem_create(
        id: SemaphoreId,
        initial: SemaphoreValue,
        maximum: SemaphoreValue,
    ) -> Result<(), CreateSemaphoreError>;

    /// Release a permit. Callable from interrupt context.
    ///
    /// If a thread is waiting, the permit is handed to the most urgent one.
    /// Otherwise the count is incremented, saturating at the maximum.
    fn sem_give(id: SemaphoreId);

    /// Wait without timeout until a permit is available, and take it.
    fn sem_take(id: SemaphoreId) -> Result<(), TakeSemaphoreError>;

    fn sem_destroy(id: SemaphoreId) -> Result<(), DestroySemaphoreError>;
}

/// Mutexes.
pub trait BenchMutex: Sized + 'static {
    fn mutex_create(id: MutexId) -> Result<(), CreateMutexError>;

    /// Wait without timeout until the mutex is unowned, and claim it.
    fn mutex_lock(id: MutexId) -> Result<(), LockMutexError>;

    /// Release the mutex, handing it to the most urgent waiter if any.
    fn mutex_unlock(id: MutexId) -> Result<(), UnlockMutexError>;

    fn mutex_destroy(id: MutexId) -> Result<(), DestroyMutexError>;
}

/// Moving work into and out of interrupt context.
pub trait BenchOffload: Sized + 'static {
    /// Create the work-queue thread. Calling this more than once has no
    /// additional effect. Must be called from task context.
    fn offload_setup();

    /// Register the routine run by the work-queue thread, replacing any
    /// previously registered one.
    fn offload_create_work(worker: fn());

    /// Ask the work-queue thread to run the registered routine. Callable from
    /// interrupt context; never blocks.
    ///
    /// Submissions made while the work item is still pending execute it once.
    fn offload_submit_work();

    /// Run `routine(param)` in interrupt context and return after it
    /// completes.
    fn irq_offload(routine: fn(usize), param: usize);
}

/// All capabilities of a port.
pub trait Bench:
    BenchTiming + BenchThreading + BenchSemaphore + BenchMutex + BenchOffload
{
}

impl<T> Bench for T where
    T: BenchTiming + BenchThreading + BenchSemaphore + BenchMutex + BenchOffload
{
}
