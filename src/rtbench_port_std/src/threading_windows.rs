//! Remote park for host threads ([`Thread::park`]), implemented with
//! `SuspendThread` and `ResumeThread`.
use std::{mem::MaybeUninit, sync::Arc};
use winapi::um::{
    errhandlingapi, handleapi, processthreadsapi,
    winnt::{DUPLICATE_SAME_ACCESS, HANDLE},
};

thread_local! {
    static CURRENT: Thread = Thread {
        data: Arc::new(ThreadData {
            hthread: current_hthread(),
        }),
    };
}

/// A handle to a host thread supporting the remote park operation.
#[derive(Debug, Clone)]
pub struct Thread {
    data: Arc<ThreadData>,
}

#[derive(Debug)]
struct ThreadData {
    hthread: HANDLE,
}

unsafe impl Send for ThreadData {}
unsafe impl Sync for ThreadData {}

impl Drop for ThreadData {
    fn drop(&mut self) {
        unsafe { handleapi::CloseHandle(self.hthread) };
    }
}

/// Get a handle to the calling thread.
pub fn current() -> Thread {
    CURRENT.with(Thread::clone)
}

impl Thread {
    /// Resume the thread stopped by [`Self::park`].
    pub fn unpark(&self) {
        if unsafe { processthreadsapi::ResumeThread(self.data.hthread) } == u32::MAX {
            panic_last_error();
        }
    }

    /// Force the thread to park until a token is available.
    ///
    /// This returns after the thread has stopped. The target thread must not
    /// hold any lock the caller might need until the matching `unpark`, and
    /// must not be parked again before that.
    pub fn park(&self) {
        if unsafe { processthreadsapi::SuspendThread(self.data.hthread) } == u32::MAX {
            panic_last_error();
        }

        // Wait for the suspend request to complete
        // <https://devblogs.microsoft.com/oldnewthing/20150205-00/?p=44743>
        unsafe {
            processthreadsapi::GetThreadContext(
                self.data.hthread,
                MaybeUninit::uninit().as_mut_ptr(),
            );
        }
    }
}

fn current_hthread() -> HANDLE {
    // pseudo handle, which is converted to a "real" handle by
    // `DuplicateHandle`.
    let cur_pseudo_hthread = unsafe { processthreadsapi::GetCurrentThread() };

    let cur_hprocess = unsafe { processthreadsapi::GetCurrentProcess() };
    let mut cur_hthread = MaybeUninit::uninit();
    let ok = unsafe {
        handleapi::DuplicateHandle(
            cur_hprocess,
            cur_pseudo_hthread, // source handle
            cur_hprocess,
            cur_hthread.as_mut_ptr(), // target handle
            0,                        // desired access - ignored because of `DUPLICATE_SAME_ACCESS`
            0,                        // do not inherit
            DUPLICATE_SAME_ACCESS,
        )
    };
    if ok == 0 {
        panic_last_error();
    }

    unsafe { cur_hthread.assume_init() }
}

/// Panic with an error code returned by `GetLastError`.
#[cold]
fn panic_last_error() -> ! {
    panic!("Win32 error 0x{:08x}", unsafe {
        errhandlingapi::GetLastError()
    });
}
