//! Result codes and per-operation error types.
use core::fmt;

/// The raw value of [`Status::Success`].
pub const BENCH_SUCCESS: i32 = 0;

/// The raw value of [`Status::Error`].
pub const BENCH_ERROR: i32 = 1;

/// The two-valued status every fallible operation reduces to.
///
/// Drivers that only care about "did it happen" can convert any operation
/// result with `Status::from(result)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation was performed.
    Success,
    /// The operation was not performed.
    Error,
}

impl Status {
    /// Get the raw status value ([`BENCH_SUCCESS`] or [`BENCH_ERROR`]).
    #[inline]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Success => BENCH_SUCCESS,
            Self::Error => BENCH_ERROR,
        }
    }

    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ResultCode> for Status {
    #[inline]
    fn from(x: ResultCode) -> Self {
        if x.is_ok() {
            Self::Success
        } else {
            Self::Error
        }
    }
}

/// The macro to define [`ResultCode`].
macro_rules! define_result_code {
    (
        $( #[$meta:meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident = $vd:expr
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        pub enum ResultCode {
            $(
                $( #[$vmeta] )*
                $vname = $vd
            ),*
        }

        impl ResultCode {
            /// Get the short name of the result code.
            ///
            /// # Examples
            ///
            /// ```
            /// use rtbench::ResultCode;
            /// assert_eq!(ResultCode::BadObjectState.as_str(), "BadObjectState");
            /// ```
            pub fn as_str(self) -> &'static str {
                match self {
                    $(
                        Self::$vname => stringify!($vname),
                    )*
                }
            }
        }

        impl fmt::Debug for ResultCode {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_result_code! {
    /// All result codes (including success) a port can report.
    ///
    /// The numeric values follow the closest μITRON4.0 error codes.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[repr(i8)]
    pub enum ResultCode {
        /// The operation was successful.
        Success = 0,
        /// A parameter is invalid.
        BadParam = -17,
        /// The specified handle does not name a live object.
        NoAccess = -18,
        /// The current context disallows the operation.
        BadContext = -25,
        /// The caller does not own the resource.
        NotOwner = -29,
        /// Resource deadlock would occur.
        WouldDeadlock = -30,
        /// The port ran out of object slots.
        OutOfMemory = -33,
        /// A target object is in a state that disallows the operation, e.g.,
        /// a handle passed to `*_create` is already in use.
        BadObjectState = -41,
    }
}

impl ResultCode {
    /// Get a flag indicating whether the code represents a failure.
    ///
    /// Failure codes have negative values.
    #[inline]
    pub fn is_err(self) -> bool {
        (self as i8) < 0
    }

    /// Get a flag indicating whether the code represents a success.
    #[inline]
    pub fn is_ok(self) -> bool {
        !self.is_err()
    }
}

/// The macro to define an operation-specific error type. Each variant shares
/// the discriminant of its [`ResultCode`] counterpart.
macro_rules! define_error {
    (
        $( #[$meta:meta] )*
        $vis:vis enum $name:ident {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident => $msg:literal
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        ///
        /// See [`ResultCode`] for all result codes and generic descriptions.
        #[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i8)]
        $vis enum $name {
            $(
                $( #[$vmeta] )*
                #[error($msg)]
                // Use the same discriminants as `ResultCode` for cost-free
                // conversion
                $vname = ResultCode::$vname as i8
            ),*
        }

        impl From<$name> for ResultCode {
            #[inline]
            fn from(x: $name) -> Self {
                match x {
                    $( $name::$vname => Self::$vname, )*
                }
            }
        }

        impl From<Result<(), $name>> for ResultCode {
            #[inline]
            fn from(x: Result<(), $name>) -> Self {
                match x {
                    Ok(()) => Self::Success,
                    Err(e) => Self::from(e),
                }
            }
        }

        impl From<$name> for Status {
            #[inline]
            fn from(_: $name) -> Self {
                Self::Error
            }
        }

        impl From<Result<(), $name>> for Status {
            #[inline]
            fn from(x: Result<(), $name>) -> Self {
                match x {
                    Ok(()) => Self::Success,
                    Err(_) => Self::Error,
                }
            }
        }
    };
}

define_error! {
    /// Error type for [`BenchThreading::thread_create`].
    ///
    /// [`BenchThreading::thread_create`]: crate::traits::BenchThreading::thread_create
    pub enum CreateThreadError {
        BadContext => "threads cannot be created from this context",
        /// The handle names a thread that is neither aborted nor exited.
        BadObjectState => "the thread handle is already in use",
        OutOfMemory => "the thread table is full",
    }
}

define_error! {
    /// Error type for [`BenchSemaphore::sem_create`].
    ///
    /// [`BenchSemaphore::sem_create`]: crate::traits::BenchSemaphore::sem_create
    pub enum CreateSemaphoreError {
        BadContext => "semaphores cannot be created from this context",
        /// `initial > maximum` or `maximum == 0`.
        BadParam => "invalid semaphore count",
        BadObjectState => "the semaphore handle is already in use",
        OutOfMemory => "the semaphore table is full",
    }
}

define_error! {
    /// Error type for [`BenchSemaphore::sem_take`].
    ///
    /// [`BenchSemaphore::sem_take`]: crate::traits::BenchSemaphore::sem_take
    pub enum TakeSemaphoreError {
        /// The caller is an interrupt handler, which cannot block.
        BadContext => "semaphores cannot be taken from this context",
        NoAccess => "no such semaphore",
    }
}

define_error! {
    /// Error type for [`BenchSemaphore::sem_destroy`].
    ///
    /// [`BenchSemaphore::sem_destroy`]: crate::traits::BenchSemaphore::sem_destroy
    pub enum DestroySemaphoreError {
        BadContext => "semaphores cannot be destroyed from this context",
        NoAccess => "no such semaphore",
        /// A thread is waiting on the semaphore.
        BadObjectState => "the semaphore is in use",
    }
}

define_error! {
    /// Error type for [`BenchMutex::mutex_create`].
    ///
    /// [`BenchMutex::mutex_create`]: crate::traits::BenchMutex::mutex_create
    pub enum CreateMutexError {
        BadContext => "mutexes cannot be created from this context",
        BadObjectState => "the mutex handle is already in use",
        OutOfMemory => "the mutex table is full",
    }
}

define_error! {
    /// Error type for [`BenchMutex::mutex_lock`].
    ///
    /// [`BenchMutex::mutex_lock`]: crate::traits::BenchMutex::mutex_lock
    pub enum LockMutexError {
        BadContext => "mutexes cannot be locked from this context",
        NoAccess => "no such mutex",
        /// The caller already owns the mutex.
        WouldDeadlock => "the mutex is already owned by the caller",
    }
}

define_error! {
    /// Error type for [`BenchMutex::mutex_unlock`].
    ///
    /// [`BenchMutex::mutex_unlock`]: crate::traits::BenchMutex::mutex_unlock
    pub enum UnlockMutexError {
        BadContext => "mutexes cannot be unlocked from this context",
        NoAccess => "no such mutex",
        NotOwner => "the mutex is not owned by the caller",
    }
}

define_error! {
    /// Error type for [`BenchMutex::mutex_destroy`].
    ///
    /// [`BenchMutex::mutex_destroy`]: crate::traits::BenchMutex::mutex_destroy
    pub enum DestroyMutexError {
        BadContext => "mutexes cannot be destroyed from this context",
        NoAccess => "no such mutex",
        /// The mutex is locked or has waiters.
        BadObjectState => "the mutex is in use",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn error_codes_are_failures() {
        let codes = [
            ResultCode::from(CreateThreadError::BadObjectState),
            ResultCode::from(CreateSemaphoreError::BadParam),
            ResultCode::from(TakeSemaphoreError::NoAccess),
            ResultCode::from(LockMutexError::WouldDeadlock),
            ResultCode::from(UnlockMutexError::NotOwner),
            ResultCode::from(CreateMutexError::OutOfMemory),
        ];
        for code in codes {
            assert!(code.is_err(), "{code:?}");
            assert_eq!(Status::from(code), Status::Error);
            assert_eq!(Status::from(code).as_raw(), BENCH_ERROR);
        }
        assert!(ResultCode::Success.is_ok());
    }

    #[test]
    fn discriminants_match_result_code() {
        assert_eq!(
            UnlockMutexError::NotOwner as i8,
            ResultCode::NotOwner as i8
        );
        assert_eq!(
            CreateSemaphoreError::BadParam as i8,
            ResultCode::BadParam as i8
        );
    }

    #[test]
    fn status_from_result() {
        assert_eq!(Status::from(Ok::<(), LockMutexError>(())), Status::Success);
        assert_eq!(Status::Success.as_raw(), BENCH_SUCCESS);
        assert_eq!(
            Status::from(Err::<(), _>(LockMutexError::NoAccess)),
            Status::Error
        );
        assert_eq!(
            ResultCode::from(Err::<(), _>(TakeSemaphoreError::BadContext)),
            ResultCode::BadContext
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            UnlockMutexError::NotOwner.to_string(),
            "the mutex is not owned by the caller"
        );
        assert_eq!(ResultCode::NoAccess.as_str(), "NoAccess");
    }

    #[test]
    fn result_code_of_destroy_errors() {
        assert_matches!(
            ResultCode::from(DestroyMutexError::BadObjectState),
            ResultCode::BadObjectState
        );
        assert_matches!(
            ResultCode::from(Ok::<(), DestroySemaphoreError>(())),
            ResultCode::Success
        );
        assert_matches!(
            ResultCode::from(DestroySemaphoreError::NoAccess),
            ResultCode::NoAccess
        );
    }
}
