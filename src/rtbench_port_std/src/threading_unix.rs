//! Remote park for host threads ([`Thread::park`]), implemented with a signal
//! handler that blocks on a socket pair.
use std::{
    mem::MaybeUninit,
    os::raw::{c_int, c_void},
    ptr::null_mut,
    sync::{
        atomic::{AtomicPtr, Ordering},
        Arc, Mutex, Once, PoisonError,
    },
    thread,
};

thread_local! {
    static CURRENT: Thread = Thread {
        data: Arc::new(ThreadData::new()),
    };
}

/// A handle to a host thread supporting the remote park operation.
#[derive(Debug, Clone)]
pub struct Thread {
    data: Arc<ThreadData>,
}

#[derive(Debug)]
struct ThreadData {
    park_sock: [c_int; 2],
    pthread_id: libc::pthread_t,
}

impl ThreadData {
    fn new() -> Self {
        let park_sock = unsafe {
            let mut park_sock = MaybeUninit::<[c_int; 2]>::uninit();
            if let Err(e) = ok_or_errno(libc::socketpair(
                libc::PF_LOCAL,
                libc::SOCK_STREAM,
                0,
                park_sock.as_mut_ptr().cast(),
            )) {
                panic!("failed to create a park socket pair: {e}");
            }
            park_sock.assume_init()
        };

        Self {
            park_sock,
            pthread_id: unsafe { libc::pthread_self() },
        }
    }

    /// Get the FD to read a park token.
    fn park_sock_token_source(&self) -> c_int {
        self.park_sock[0]
    }

    /// Get the FD to write a park token.
    fn park_sock_token_sink(&self) -> c_int {
        self.park_sock[1]
    }
}

impl Drop for ThreadData {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.park_sock[0]);
            libc::close(self.park_sock[1]);
        }
    }
}

/// Get a handle to the calling thread.
pub fn current() -> Thread {
    CURRENT.with(Thread::clone)
}

/// The target of the remote park in progress. The signal handler takes it.
static PARK_TARGET: AtomicPtr<ThreadData> = AtomicPtr::new(null_mut());

/// Serializes remote park operations, which share `PARK_TARGET`.
static REMOTE_PARK_LOCK: Mutex<()> = Mutex::new(());

fn park_inner(data: &ThreadData) {
    loop {
        // Take the token (blocking)
        match isize_ok_or_errno(unsafe {
            libc::recv(
                data.park_sock_token_source(),
                (&mut 0u8) as *mut u8 as *mut c_void,
                1,
                0,
            )
        }) {
            Ok(1) => break,
            Ok(_) | Err(errno::Errno(libc::EAGAIN)) | Err(errno::Errno(libc::EINTR)) => {
                continue;
            }
            Err(_) => {
                // Nothing can be reported from a signal handler
                unsafe { libc::abort() };
            }
        }
    }
}

impl Thread {
    /// Make a new park token available for the thread.
    ///
    /// A thread can have multiple tokens. Each remote park consumes one.
    pub fn unpark(&self) {
        let data = &self.data;
        if let Err(e) = isize_ok_or_errno(unsafe {
            libc::send(
                data.park_sock_token_sink(),
                &0u8 as *const u8 as *const c_void,
                1,
                0,
            )
        }) {
            panic!("failed to make a park token available: {e}");
        }
    }

    /// Force the thread to park until a token is available.
    ///
    /// This returns after the thread has stopped. The target thread must not
    /// hold any lock the caller might need until the matching `unpark`, and
    /// must not be parked again before that.
    pub fn park(&self) {
        // Make sure the signal handler is registered
        static SIGNAL_HANDLER_ONCE: Once = Once::new();
        SIGNAL_HANDLER_ONCE.call_once(register_remote_park_signal_handler);

        let _guard = REMOTE_PARK_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        PARK_TARGET.store(Arc::as_ptr(&self.data).cast_mut(), Ordering::Release);

        // Raise the signal `SIGNAL_REMOTE_PARK`. This will force the target
        // thread to execute `remote_park_signal_handler`.
        let code = unsafe { libc::pthread_kill(self.data.pthread_id, SIGNAL_REMOTE_PARK) };
        if code != 0 {
            PARK_TARGET.store(null_mut(), Ordering::Relaxed);
            panic!("failed to signal the thread: {}", errno::Errno(code));
        }

        // Wait until the signal is delivered
        while !PARK_TARGET.load(Ordering::Acquire).is_null() {
            thread::yield_now();
        }
    }
}

const SIGNAL_REMOTE_PARK: c_int = libc::SIGUSR1;

/// Register the signal handler for `SIGNAL_REMOTE_PARK`.
#[cold]
fn register_remote_park_signal_handler() {
    if let Err(e) = ok_or_errno(unsafe {
        libc::sigaction(
            SIGNAL_REMOTE_PARK,
            &libc::sigaction {
                sa_sigaction: remote_park_signal_handler as libc::sighandler_t,
                // `SA_SIGINFO`: The handler uses the three-parameter signature.
                // `SA_RESTART`: Blocking calls of the parked thread resume.
                sa_flags: libc::SA_SIGINFO | libc::SA_RESTART,
                ..std::mem::zeroed()
            },
            null_mut(),
        )
    }) {
        panic!("failed to register the remote park signal handler: {e}");
    }

    /// The signal handler for `SIGNAL_REMOTE_PARK`.
    extern "C" fn remote_park_signal_handler(
        _signo: c_int,
        _: *mut libc::siginfo_t,
        _: *mut c_void,
    ) {
        let target = PARK_TARGET.load(Ordering::Acquire);
        if target.is_null() {
            return;
        }

        // The target is kept alive by the parking thread until it sees
        // `PARK_TARGET` cleared, and by the target's own `CURRENT`
        let data = unsafe { &*target };
        if unsafe { libc::pthread_equal(data.pthread_id, libc::pthread_self()) } == 0 {
            // Not meant for this thread
            return;
        }

        // Let the parking thread go
        PARK_TARGET.store(null_mut(), Ordering::Release);

        park_inner(data);
    }
}

fn isize_ok_or_errno(x: isize) -> Result<isize, errno::Errno> {
    if x >= 0 {
        Ok(x)
    } else {
        Err(errno::errno())
    }
}

fn ok_or_errno(x: c_int) -> Result<c_int, errno::Errno> {
    if x >= 0 {
        Ok(x)
    } else {
        Err(errno::errno())
    }
}
