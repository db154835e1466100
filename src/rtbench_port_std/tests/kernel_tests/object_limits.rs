//! Fills the object tables up to the limits given by `Config`.
use rtbench::{
    prelude::*, CreateMutexError, CreateSemaphoreError, CreateThreadError, MutexId, SemaphoreId,
    ThreadId,
};
use rtbench_port_std::PortInstance;
use rtbench_test_suite::kernel_tests::Driver;

pub trait SupportedSystem: Bench + PortInstance {}
impl<T: Bench + PortInstance> SupportedSystem for T {}

fn nop(_: usize) {}

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    let config = System::CONFIG;

    // The main thread doesn't count
    for i in 0..config.max_threads {
        System::thread_create(ThreadId::new(i), "filler", 1, nop, 0).unwrap();
    }
    let extra = ThreadId::new(config.max_threads);
    assert_eq!(
        System::thread_create(extra, "extra", 1, nop, 0),
        Err(CreateThreadError::OutOfMemory)
    );

    // Aborting one makes room for another
    System::thread_abort(ThreadId::new(0));
    System::thread_create(extra, "extra", 1, nop, 0).unwrap();
    System::thread_abort(extra);
    for i in 1..config.max_threads {
        System::thread_abort(ThreadId::new(i));
    }

    for i in 0..config.max_semaphores {
        System::sem_create(SemaphoreId::new(i), 0, 1).unwrap();
    }
    assert_eq!(
        System::sem_create(SemaphoreId::new(config.max_semaphores), 0, 1),
        Err(CreateSemaphoreError::OutOfMemory)
    );
    // An invalid parameter is reported first
    assert_eq!(
        System::sem_create(SemaphoreId::new(config.max_semaphores), 2, 1),
        Err(CreateSemaphoreError::BadParam)
    );

    for i in 0..config.max_mutexes {
        System::mutex_create(MutexId::new(i)).unwrap();
    }
    assert_eq!(
        System::mutex_create(MutexId::new(config.max_mutexes)),
        Err(CreateMutexError::OutOfMemory)
    );
    System::mutex_destroy(MutexId::new(0)).unwrap();
    System::mutex_create(MutexId::new(config.max_mutexes)).unwrap();

    D::success();
}
