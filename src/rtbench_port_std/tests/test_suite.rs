//! Runs test cases defined in `rtbench_test_suite`.
use rtbench_port_std::PortInstance;
use std::sync::atomic::{AtomicBool, Ordering};

struct KernelTestUtil {
    is_successful: AtomicBool,
}

impl KernelTestUtil {
    const fn new() -> Self {
        Self {
            is_successful: AtomicBool::new(false),
        }
    }

    fn success<System: PortInstance>(&self) {
        self.is_successful.store(true, Ordering::Relaxed);
        rtbench_port_std::shutdown::<System>();
    }

    fn run(&self, func: impl FnOnce()) {
        let _ = env_logger::try_init();

        if let Err(panic_info) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(func)) {
            std::panic::resume_unwind(panic_info);
        }

        if self.is_successful.load(Ordering::Relaxed) {
            return;
        }

        panic!("The program exited without calling `success`");
    }
}

mod kernel_tests {
    pub mod busy_thread_preemption;
    pub mod external_interrupt;
    pub mod object_limits;
}

macro_rules! instantiate_kernel_tests {
    ( $( { $($tt:tt)* }, )* ) => {
        instantiate_kernel_tests!(
            @inner

            $( { $($tt)* }, )*

            // Port-specific tests
            { path: crate::kernel_tests::busy_thread_preemption, name_ident: busy_thread_preemption, },
            { path: crate::kernel_tests::external_interrupt, name_ident: external_interrupt, },
            { path: crate::kernel_tests::object_limits, name_ident: object_limits, },
        );
    };
    ( @inner $(
        { path: $path:path, name_ident: $name_ident:ident, $($rest:tt)* },
    )*) => {$(
        mod $name_ident {
            use rtbench::BenchThreading;
            use rtbench_test_suite::kernel_tests;
            use $path as test_case;

            rtbench_port_std::use_port!(
                unsafe struct System,
                config = rtbench_port_std::Config::new()
                    .tick_period_ms(5)
                    .max_threads(16)
                    .max_semaphores(8)
                    .max_mutexes(8),
            );

            struct Driver;
            static TEST_UTIL: super::KernelTestUtil = super::KernelTestUtil::new();

            impl kernel_tests::Driver for Driver {
                fn success() {
                    TEST_UTIL.success::<System>();
                }

                const TICK_PERIOD_NS: u64 = port_std_impl::CONFIG.tick_period.as_nanos() as u64;
            }

            #[test]
            fn run() {
                TEST_UTIL.run(|| {
                    System::test_init(test_case::main::<System, Driver>);
                });
            }
        }
    )*};
}

rtbench_test_suite::get_kernel_tests!(instantiate_kernel_tests!());
