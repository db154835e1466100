//! Caller-chosen object handles.
use core::fmt;

/// Thread priority. Lower values are more urgent.
pub type Priority = i32;

/// The count of a semaphore.
pub type SemaphoreValue = u32;

macro_rules! define_handle {
    (
        $( #[$meta:meta] )*
        pub struct $name:ident;
    ) => {
        $( #[$meta] )*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Construct a handle from a raw value.
            #[inline]
            pub const fn new(raw: usize) -> Self {
                Self(raw)
            }

            /// Get the raw value of the handle.
            #[inline]
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(raw: usize) -> Self {
                Self(raw)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }
    };
}

define_handle! {
    /// Identifies a thread.
    pub struct ThreadId;
}

define_handle! {
    /// Identifies a counting semaphore.
    pub struct SemaphoreId;
}

define_handle! {
    /// Identifies a mutex.
    pub struct MutexId;
}
