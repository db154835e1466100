use std::{env, fmt, fs, path::Path};

/// Every test case in `src/kernel_tests`.
const KERNEL_TESTS: &[&str] = &[
    "irq_offload",
    "mutex_misc",
    "mutex_unlock_and_dispatch",
    "offload_work_queue",
    "semaphore_interrupt_handler",
    "semaphore_misc",
    "semaphore_signal_and_dispatch",
    "semaphore_wait_order",
    "task_abort",
    "task_misc",
    "task_set_priority",
    "task_suspend_resume",
    "task_yield_priority",
    "time_clock",
    "time_sync_ticks",
];

/// Every benchmark in `src/kernel_benchmarks`.
const KERNEL_BENCHMARKS: &[&str] = &[
    "mutex",
    "offload",
    "semaphore",
    "thread_lifecycle",
    "thread_yield",
];

fn main() {
    let out_dir = env::var_os("OUT_DIR").unwrap();

    println!("cargo:rerun-if-changed=build.rs");

    // Selective building
    println!("cargo:rerun-if-env-changed=RTBENCH_TEST");

    let selected_tests_joined = match env::var("RTBENCH_TEST") {
        Ok(x) => x,
        Err(env::VarError::NotPresent) => String::new(),
        Err(env::VarError::NotUnicode(_)) => {
            panic!("RTBENCH_TEST is not a valid UTF-8 string");
        }
    };
    let selected_tests: Vec<&str> = selected_tests_joined
        .trim()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut kernel_test_list = Vec::new();
    let mut kernel_benchmark_list = Vec::new();

    if selected_tests.is_empty() {
        kernel_test_list.extend(KERNEL_TESTS.iter().map(|name| TestMeta("kernel_tests", name)));
        kernel_benchmark_list.extend(
            KERNEL_BENCHMARKS
                .iter()
                .map(|name| TestMeta("kernel_benchmarks", name)),
        );
    }

    for selected_test in selected_tests {
        if let Some(name) = selected_test.strip_prefix("kernel_tests::") {
            expect_known_test_name(name, KERNEL_TESTS);

            // Include it in `get_kernel_tests_inner`
            kernel_test_list.push(TestMeta("kernel_tests", name));
        } else if let Some(name) = selected_test.strip_prefix("kernel_benchmarks::") {
            expect_known_test_name(name, KERNEL_BENCHMARKS);

            // Include it in `get_kernel_benchmarks_inner`
            kernel_benchmark_list.push(TestMeta("kernel_benchmarks", name));
        } else {
            panic!(
                "Unrecognized test type: `{selected_test}`
                Test names should start with a prefix like `kernel_tests::`.",
            );
        }
    }

    let out_selective_tests_path = Path::new(&out_dir).join("selective_tests.rs");
    fs::write(
        out_selective_tests_path,
        format!(
            "#[macro_export]
            #[doc(hidden)]
            macro_rules! get_kernel_tests_inner {{
                (($($cb:tt)*), ($($pfx:tt)*)) => {{
                    $($cb)* ! {{ $($pfx)*
                        {}
                    }}
                }};
            }}

            #[macro_export]
            #[doc(hidden)]
            macro_rules! get_kernel_benchmarks_inner {{
                (($($cb:tt)*), ($($pfx:tt)*)) => {{
                    $($cb)* ! {{ $($pfx)*
                        {}
                    }}
                }};
            }}
            ",
            CommaSeparatedWithTrailingComma(&kernel_test_list),
            CommaSeparatedWithTrailingComma(&kernel_benchmark_list),
        ),
    )
    .unwrap();
}

fn expect_known_test_name(name: &str, known: &[&str]) {
    if name.contains(|c: char| !c.is_alphanumeric() && c != '_') || name.is_empty() {
        panic!(
            "Invalid test name: `{name}`
            Test names should match /[a-zA-Z0-9_]+/",
        )
    }
    if !known.contains(&name) {
        panic!("Unknown test: `{name}`. Known tests are: {known:?}");
    }
}

#[derive(Clone, Copy)]
struct TestMeta<'a>(&'a str, &'a str);

impl fmt::Display for TestMeta<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ path: $crate::{0}::{1}, name_ident: {1}, name_str: \"{1}\", }}",
            self.0, self.1
        )
    }
}

struct CommaSeparatedWithTrailingComma<T>(T);
impl<T> fmt::Display for CommaSeparatedWithTrailingComma<T>
where
    T: Clone + IntoIterator,
    T::Item: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in self.0.clone() {
            write!(f, "{e}, ")?;
        }
        Ok(())
    }
}
