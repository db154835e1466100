#![doc = include_str!("./lib.md")]
#![deny(unsafe_op_in_unsafe_fn)]
use atomic_ref::AtomicRef;
use rtbench::{OffloadSlot, TimingSession};
use spin::Mutex as SpinMutex;
use std::{
    cell::Cell,
    panic,
    sync::{mpsc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError},
    thread,
    time::Instant,
};

#[cfg(unix)]
#[path = "threading_unix.rs"]
mod threading;
#[cfg(windows)]
#[path = "threading_windows.rs"]
mod threading;
#[cfg(not(any(unix, windows)))]
compile_error!("remote park is only implemented for Unix and Windows hosts");

#[cfg(test)]
mod threading_test;

mod config;
mod interrupt;
mod mutex;
mod offload;
mod sched;
mod semaphore;
mod thread_ops;
mod timing;

pub use self::{config::Config, interrupt::raise_interrupt};
use self::sched::{Entry, Sched, Tsm};

/// Used by `use_port!`
#[doc(hidden)]
pub extern crate rtbench;
/// Used by `use_port!`
#[doc(hidden)]
pub extern crate env_logger;

/// Implemented on a system type by [`use_port!`].
///
/// # Safety
///
/// Only meant to be implemented by [`use_port!`].
#[doc(hidden)]
pub unsafe trait PortInstance: Sized + 'static {
    const CONFIG: Config;

    fn port_state() -> &'static State;
}

/// The internal state of the port.
#[doc(hidden)]
pub struct State {
    config: Config,
    kernel: OnceLock<Kernel>,
    timer_cmd_send: SpinMutex<Option<mpsc::Sender<TimerCmd>>>,
    origin: AtomicRef<'static, Instant>,
    session: TimingSession,
    offload: OffloadSlot,
}

/// The simulated processor. Only the thread named by `Sched::running` may
/// proceed past a kernel entry, and only while no interrupt handler runs.
/// The interrupt thread enforces the same outside the kernel by stopping the
/// host thread it interrupts (`Sched::stop`).
struct Kernel {
    sched: Mutex<Sched>,
    /// Notified on every change of `sched` that might let a thread proceed.
    cond: Condvar,
}

/// Commands for the timer thread. The timer thread stops when the sender is
/// dropped.
enum TimerCmd {}

/// The payload used to unwind the host thread of a terminated thread.
struct AbortMarker;

/// The role of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreadRole {
    Unknown,
    /// The backing thread for the interrupt context.
    Interrupt,
    /// The backing thread for the thread in the given slab slot.
    Task(usize),
}

thread_local! {
    /// The current thread's role. It's automatically assigned after the
    /// creation of a thread managed by the port.
    static THREAD_ROLE: Cell<ThreadRole> = const { Cell::new(ThreadRole::Unknown) };
}

impl Kernel {
    fn new(sched: Sched) -> Self {
        Self {
            sched: Mutex::new(sched),
            cond: Condvar::new(),
        }
    }

    /// Lock the scheduler state. A panic while holding the lock is recorded
    /// separately, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Sched> {
        self.sched.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Sched>) -> MutexGuard<'a, Sched> {
        self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Block the calling thread `me` until `cond` holds.
    ///
    /// If `me` is terminated or the system is shutting down, this function
    /// unwinds the host thread instead of returning.
    fn wait_for<'a>(
        &self,
        mut guard: MutexGuard<'a, Sched>,
        me: usize,
        mut cond: impl FnMut(&Sched) -> bool,
    ) -> MutexGuard<'a, Sched> {
        loop {
            if guard.shutting_down || guard.threads[me].st == Tsm::Terminated {
                drop(guard);
                log::trace!("unwinding the host thread of {me}");
                panic::resume_unwind(Box::new(AbortMarker));
            }
            if cond(&guard) {
                return guard;
            }
            guard = self.wait(guard);
        }
    }

    /// Block the calling thread `me` until it owns the processor.
    fn wait_for_cpu<'a>(&self, guard: MutexGuard<'a, Sched>, me: usize) -> MutexGuard<'a, Sched> {
        self.wait_for(guard, me, |sched| {
            sched.running == Some(me) && !sched.in_interrupt
        })
    }
}

impl State {
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            kernel: OnceLock::new(),
            timer_cmd_send: SpinMutex::new(None),
            origin: AtomicRef::new(None),
            session: TimingSession::new(),
            offload: OffloadSlot::new(),
        }
    }

    fn kernel(&self) -> &Kernel {
        self.kernel
            .get()
            .unwrap_or_else(|| panic!("the port has not been booted by `test_init` yet"))
    }

    /// Boot the simulated system and run `init(0)` as the main thread.
    ///
    /// Returns when the system shuts down, which happens when the main thread
    /// returns, [`shutdown`] is called, or any thread or interrupt handler
    /// panics. In the last case, the panic is propagated to the caller.
    pub fn test_init(&'static self, init: fn(usize)) {
        assert_eq!(
            THREAD_ROLE.with(Cell::get),
            ThreadRole::Unknown,
            "`test_init` cannot be called from a port-managed thread"
        );
        assert!(
            self.kernel.set(Kernel::new(Sched::new(self.config))).is_ok(),
            "the port has already been booted"
        );
        let kernel = self.kernel();

        self.establish_origin();

        // Start the timer thread
        let (timer_cmd_send, timer_cmd_recv) = mpsc::channel();
        log::trace!("starting the timer thread");
        let timer_join_handle = thread::Builder::new()
            .name("rtbench timer".to_owned())
            .spawn(move || self.timer_main(timer_cmd_recv))
            .expect("failed to spawn the timer thread");
        *self.timer_cmd_send.lock() = Some(timer_cmd_send);

        // Start the interrupt thread
        let interrupt_join_handle = thread::Builder::new()
            .name("rtbench interrupt".to_owned())
            .spawn(move || self.interrupt_main())
            .expect("failed to spawn the interrupt thread");

        // Start the main thread
        let mut lock = kernel.lock();
        let main = lock.insert_thread(None, "main", self.config.main_priority, Entry::Main(init));
        lock.make_ready(main);
        if self.spawn_thread(&mut lock, main) {
            lock.dispatch();
        } else {
            lock.begin_shutdown();
        }
        kernel.cond.notify_all();

        // Wait until the system shuts down
        while !lock.shutting_down {
            lock = kernel.wait(lock);
        }
        drop(lock);

        // Stop the timer thread.
        // `timer_cmd_recv.recv_timeout` will return `Err(Disconnected)` when
        // we drop the corresponding sender (`timer_cmd_send`).
        log::trace!("stopping the timer thread");
        *self.timer_cmd_send.lock() = None;
        let timer_result = timer_join_handle.join();
        log::trace!("stopped the timer thread");

        let interrupt_result = interrupt_join_handle.join();

        // Propagate any panic that occured in a port-managed thread
        let payload = kernel.lock().panic_payload.take();
        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }
        if let Err(payload) = interrupt_result.and(timer_result) {
            panic::resume_unwind(payload);
        }
        log::debug!("shutdown complete");
    }

    /// Spawn the host thread for the thread in slot `index`. Returns `false`
    /// and releases the slot on failure.
    fn spawn_thread(&'static self, sched: &mut Sched, index: usize) -> bool {
        let tcb = &mut sched.threads[index];
        let result = thread::Builder::new()
            .name(tcb.name.clone())
            .spawn(move || self.thread_main(index));
        match result {
            Ok(_) => {
                tcb.spawned = true;
                log::trace!("spawned a host thread for {index} ({:?})", tcb.name);
                true
            }
            Err(e) => {
                log::error!("failed to spawn a host thread for {:?}: {e}", tcb.name);
                sched.terminate(index);
                sched.release(index);
                false
            }
        }
    }

    /// The entry point of the host thread backing a port thread.
    fn thread_main(&'static self, index: usize) {
        THREAD_ROLE.with(|role| role.set(ThreadRole::Task(index)));
        let kernel = self.kernel();

        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let mut lock = kernel.lock();
            lock.threads[index].host = Some(threading::current());
            let lock = kernel.wait_for_cpu(lock, index);
            let tcb = &lock.threads[index];
            let entry = tcb.entry;
            log::debug!("thread {:?} ({:?}) is now running", tcb.id, tcb.name);
            drop(lock);

            match entry {
                Entry::Main(init) => init(0),
                Entry::User { entry, param } => entry(param),
                Entry::WorkQueue => self.work_queue_main(index),
            }
        }));

        let mut lock = kernel.lock();
        match result {
            Ok(()) => {
                // Exiting is a kernel entry, too
                while !lock.shutting_down
                    && lock.threads[index].st != Tsm::Terminated
                    && (lock.running != Some(index) || lock.in_interrupt)
                {
                    lock = kernel.wait(lock);
                }
                log::debug!("thread {index} exited");
            }
            Err(payload) if payload.is::<AbortMarker>() => {
                log::trace!("thread {index} was terminated");
            }
            Err(payload) => {
                log::error!("thread {index} panicked, shutting down");
                lock.record_panic(payload);
            }
        }

        let is_main = matches!(lock.threads[index].entry, Entry::Main(_));
        if lock.threads[index].st != Tsm::Terminated {
            lock.terminate(index);
        }
        lock.release(index);

        if is_main {
            lock.begin_shutdown();
        } else if !lock.in_interrupt {
            lock.dispatch();
        }
        kernel.cond.notify_all();
    }

    /// Enter the kernel. In task context, this blocks until the caller owns
    /// the processor.
    fn enter(&self) -> (MutexGuard<'_, Sched>, ThreadRole) {
        let role = expect_worker_thread();
        let kernel = self.kernel();
        let lock = kernel.lock();
        match role {
            ThreadRole::Task(me) => (kernel.wait_for_cpu(lock, me), role),
            _ => (lock, role),
        }
    }

    /// Leave the kernel. In task context, this chooses the next thread to run
    /// and blocks until the caller owns the processor again. In interrupt
    /// context, dispatching is deferred until the handler returns.
    fn leave(&self, mut lock: MutexGuard<'_, Sched>, role: ThreadRole) {
        let kernel = self.kernel();
        if let ThreadRole::Task(me) = role {
            lock.dispatch();
            kernel.cond.notify_all();
            drop(kernel.wait_for_cpu(lock, me));
        } else {
            kernel.cond.notify_all();
        }
    }

    pub fn is_task_context(&self) -> bool {
        matches!(expect_worker_thread(), ThreadRole::Task(_))
    }

    pub fn is_interrupt_context(&self) -> bool {
        expect_worker_thread() == ThreadRole::Interrupt
    }
}

/// Assert that the current thread is managed by the port.
fn expect_worker_thread() -> ThreadRole {
    let role = THREAD_ROLE.with(Cell::get);
    assert_ne!(
        role,
        ThreadRole::Unknown,
        "this function can only be called from a port-managed thread"
    );
    role
}

/// Initiate shutdown.
///
/// Every thread is terminated at its next kernel entry, and
/// [`BenchThreading::test_init`](rtbench::BenchThreading::test_init) returns.
/// There is no way to restart the simulated system afterwards.
pub fn shutdown<Traits: PortInstance>() {
    log::trace!("shutdown");
    let kernel = Traits::port_state().kernel();
    kernel.lock().begin_shutdown();
    kernel.cond.notify_all();
}

/// Instantiate the port on a system type.
///
/// ```rust,ignore
/// rtbench_port_std::use_port!(unsafe struct System);
/// ```
///
/// The `config` option takes a `const` [`Config`]. The `main` option defines
/// `fn main`, which installs `env_logger` and runs the given function as the
/// main thread:
///
/// ```rust,ignore
/// rtbench_port_std::use_port!(
///     unsafe struct System,
///     config = rtbench_port_std::Config::new().main_priority(5),
///     main = app_main,
/// );
/// ```
#[macro_export]
macro_rules! use_port {
    (unsafe $vis:vis struct $System:ident $(,)?) => {
        $crate::use_port!(unsafe $vis struct $System, config = $crate::Config::new());
    };
    (unsafe $vis:vis struct $System:ident, main = $main:path $(,)?) => {
        $crate::use_port!(
            unsafe $vis struct $System,
            config = $crate::Config::new(),
            main = $main,
        );
    };
    (
        unsafe $vis:vis struct $System:ident,
        config = $config:expr,
        main = $main:path $(,)?
    ) => {
        $crate::use_port!(unsafe $vis struct $System, config = $config);

        fn main() {
            $crate::env_logger::init();

            <$System as $crate::rtbench::BenchThreading>::test_init($main);
        }
    };
    (unsafe $vis:vis struct $System:ident, config = $config:expr $(,)?) => {
        $vis struct $System;

        mod port_std_impl {
            use super::$System;
            use $crate::rtbench::{
                BenchMutex, BenchOffload, BenchSemaphore, BenchThreading, BenchTiming,
                ClockFrequency, CreateMutexError, CreateSemaphoreError, CreateThreadError,
                DestroyMutexError, DestroySemaphoreError, LockMutexError, MutexId, Priority,
                SemaphoreId, SemaphoreValue, TakeSemaphoreError, ThreadId, TimeSample,
                UnlockMutexError,
            };
            use $crate::{Config, PortInstance, State};

            pub(super) const CONFIG: Config = $config;
            pub(super) static PORT_STATE: State = State::new(CONFIG);

            unsafe impl PortInstance for $System {
                const CONFIG: Config = CONFIG;

                #[inline]
                fn port_state() -> &'static State {
                    &PORT_STATE
                }
            }

            impl BenchTiming for $System {
                const COUNTER_FREQUENCY: ClockFrequency = CONFIG.counter_frequency;

                fn timing_init() {
                    PORT_STATE.timing_init()
                }

                fn timing_start() {
                    PORT_STATE.timing_start()
                }

                fn timing_stop() {
                    PORT_STATE.timing_stop()
                }

                fn timing_counter_get() -> TimeSample {
                    PORT_STATE.timing_counter_get()
                }

                fn sync_ticks() {
                    PORT_STATE.sync_ticks()
                }
            }

            impl BenchThreading for $System {
                fn test_init(init: fn(usize)) {
                    PORT_STATE.test_init(init)
                }

                fn thread_set_priority(priority: Priority) {
                    PORT_STATE.thread_set_priority(priority)
                }

                fn thread_create(
                    id: ThreadId,
                    name: &str,
                    priority: Priority,
                    entry: fn(usize),
                    param: usize,
                ) -> Result<(), CreateThreadError> {
                    PORT_STATE.thread_create(id, name, priority, entry, param)
                }

                fn thread_start(id: ThreadId) {
                    PORT_STATE.thread_start(id)
                }

                fn thread_suspend(id: ThreadId) {
                    PORT_STATE.thread_suspend(id)
                }

                fn thread_resume(id: ThreadId) {
                    PORT_STATE.thread_resume(id)
                }

                fn thread_abort(id: ThreadId) {
                    PORT_STATE.thread_abort(id)
                }

                fn yield_now() {
                    PORT_STATE.yield_now()
                }

                fn is_interrupt_context() -> bool {
                    PORT_STATE.is_interrupt_context()
                }

                fn is_task_context() -> bool {
                    PORT_STATE.is_task_context()
                }
            }

            impl BenchSemaphore for $System {
                fn sem_create(
                    id: SemaphoreId,
                    initial: SemaphoreValue,
                    maximum: SemaphoreValue,
                ) -> Result<(), CreateSemaphoreError> {
                    PORT_STATE.sem_create(id, initial, maximum)
                }

                fn sem_give(id: SemaphoreId) {
                    PORT_STATE.sem_give(id)
                }

                fn sem_take(id: SemaphoreId) -> Result<(), TakeSemaphoreError> {
                    PORT_STATE.sem_take(id)
                }

                fn sem_destroy(id: SemaphoreId) -> Result<(), DestroySemaphoreError> {
                    PORT_STATE.sem_destroy(id)
                }
            }

            impl BenchMutex for $System {
                fn mutex_create(id: MutexId) -> Result<(), CreateMutexError> {
                    PORT_STATE.mutex_create(id)
                }

                fn mutex_lock(id: MutexId) -> Result<(), LockMutexError> {
                    PORT_STATE.mutex_lock(id)
                }

                fn mutex_unlock(id: MutexId) -> Result<(), UnlockMutexError> {
                    PORT_STATE.mutex_unlock(id)
                }

                fn mutex_destroy(id: MutexId) -> Result<(), DestroyMutexError> {
                    PORT_STATE.mutex_destroy(id)
                }
            }

            impl BenchOffload for $System {
                fn offload_setup() {
                    PORT_STATE.offload_setup()
                }

                fn offload_create_work(worker: fn()) {
                    PORT_STATE.offload_create_work(worker)
                }

                fn offload_submit_work() {
                    PORT_STATE.offload_submit_work()
                }

                fn irq_offload(routine: fn(usize), param: usize) {
                    PORT_STATE.irq_offload(routine, param)
                }
            }
        }
    };
}
