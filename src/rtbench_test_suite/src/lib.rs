#![doc = include_str!("./lib.md")]
#![cfg_attr(not(test), no_std)] // Link `std` only when building a test (`cfg(test)`)

pub mod kernel_benchmarks;
pub mod kernel_tests;
mod utils;

include!(concat!(env!("OUT_DIR"), "/selective_tests.rs"));

/// Invoke the specified macro with a description of the kernel test cases
/// selected by `RTBENCH_TEST` (or all of them if it's unset).
///
/// ```rust,ignore
/// macro_rules! instantiate_kernel_tests {
///     ( $( { path: $path:path, name_ident: $name_ident:ident, name_str: $name_str:literal, }, )* ) => {};
/// }
///
/// rtbench_test_suite::get_kernel_tests!(instantiate_kernel_tests!());
/// ```
#[macro_export]
macro_rules! get_kernel_tests {
    ($cb:ident!( $($pfx:tt)* )) => {
        $crate::get_kernel_tests_inner!(($cb), ($($pfx)*));
    };
}

/// Invoke the specified macro with a description of the kernel benchmarks
/// selected by `RTBENCH_TEST` (or all of them if it's unset).
///
/// The format is the same as [`get_kernel_tests!`].
#[macro_export]
macro_rules! get_kernel_benchmarks {
    ($cb:ident!( $($pfx:tt)* )) => {
        $crate::get_kernel_benchmarks_inner!(($cb), ($($pfx)*));
    };
}
