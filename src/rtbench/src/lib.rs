#![doc = include_str!("./lib.md")]
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(test), no_std)] // Link `std` only when building a test (`cfg(test)`)

pub mod error;
pub mod handle;
pub mod offload;
pub mod time;
pub mod traits;

pub use self::{
    error::{
        CreateMutexError, CreateSemaphoreError, CreateThreadError, DestroyMutexError,
        DestroySemaphoreError, LockMutexError, ResultCode, Status, TakeSemaphoreError,
        UnlockMutexError, BENCH_ERROR, BENCH_SUCCESS,
    },
    handle::{MutexId, Priority, SemaphoreId, SemaphoreValue, ThreadId},
    offload::{OffloadSlot, WorkItem},
    time::{ClockFrequency, Cycles, TimeSample, TimingSession},
    traits::{Bench, BenchMutex, BenchOffload, BenchSemaphore, BenchThreading, BenchTiming},
};

/// The prelude module.
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::traits::{
        Bench, BenchMutex, BenchOffload, BenchSemaphore, BenchThreading, BenchTiming,
    };
}
