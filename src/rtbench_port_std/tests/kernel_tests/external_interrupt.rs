//! Raises an interrupt from an external thread.
use rtbench::{prelude::*, SemaphoreId};
use rtbench_port_std::PortInstance;
use rtbench_test_suite::kernel_tests::Driver;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread::{sleep, spawn},
    time::Duration,
};

pub trait SupportedSystem: Bench + PortInstance {}
impl<T: Bench + PortInstance> SupportedSystem for T {}

const SEM: SemaphoreId = SemaphoreId::new(1);

static DONE: AtomicBool = AtomicBool::new(false);

pub fn main<System: SupportedSystem, D: Driver>(_: usize) {
    System::sem_create(SEM, 0, 1).unwrap();

    log::trace!("spawning an external thread");
    spawn(|| {
        sleep(Duration::from_millis(100));
        log::trace!("raising an interrupt");
        rtbench_port_std::raise_interrupt::<System>(isr::<System, D>, 42);
    });

    log::trace!("waiting for the interrupt handler");
    System::sem_take(SEM).unwrap();

    assert!(DONE.load(Ordering::Relaxed));
    D::success();
}

fn isr<System: SupportedSystem, D: Driver>(param: usize) {
    log::trace!("isr({param})");
    assert_eq!(param, 42);
    assert!(System::is_interrupt_context());

    DONE.store(true, Ordering::Relaxed);
    System::sem_give(SEM);
}
