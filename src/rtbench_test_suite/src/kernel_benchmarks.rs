//! Kernel benchmarks. Each module exposes
//! `pub fn main<System: SupportedSystem, D: Driver>(_: usize)`, to be run by
//! `BenchThreading::test_init`. The results are reported through `log`.

/// Instantiation parameters of a benchmark.
pub trait Driver: 'static {
    /// Signal to the test runner that a benchmark has completed.
    fn success();
}

/// Define the items every benchmark module exposes. The invoking module must
/// define `SupportedSystem` and the functions `setup::<System, B>()` and
/// `iter::<System, B>()`, where `B: Bencher<System>`.
macro_rules! use_benchmark_in_kernel_benchmark {
    () => {
        /// The [`BencherOptions`](crate::utils::benchmark::BencherOptions) of
        /// this benchmark.
        pub struct Options<System, D>(core::marker::PhantomData<(System, D)>);

        static STATE: crate::utils::benchmark::BencherState =
            crate::utils::benchmark::BencherState::new();

        impl<System: SupportedSystem, D: super::Driver>
            crate::utils::benchmark::BencherOptions<System> for Options<System, D>
        {
            fn state() -> &'static crate::utils::benchmark::BencherState {
                &STATE
            }

            fn iter() {
                iter::<System, Self>();
            }

            fn finish() {
                D::success();
            }
        }

        pub fn main<System: SupportedSystem, D: super::Driver>(_: usize) {
            setup::<System, Options<System, D>>();
            crate::utils::benchmark::main_task::<System, Options<System, D>>(0);
        }
    };
}

pub mod mutex;
pub mod offload;
pub mod semaphore;
pub mod thread_lifecycle;
pub mod thread_yield;
