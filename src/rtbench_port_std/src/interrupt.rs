//! The interrupt context and the tick source
use std::{cell::Cell, panic, sync::mpsc, time::Instant};

use crate::{
    expect_worker_thread,
    sched::{Irq, Tsm},
    PortInstance, State, ThreadRole, TimerCmd, THREAD_ROLE,
};

impl State {
    /// The entry point of the timer thread, which pends a tick interrupt every
    /// `Config::tick_period`.
    pub(crate) fn timer_main(&'static self, cmd_recv: mpsc::Receiver<TimerCmd>) {
        let period = self.config.tick_period;
        let mut next_tick = Instant::now() + period;
        loop {
            let timeout = next_tick.saturating_duration_since(Instant::now());
            match cmd_recv.recv_timeout(timeout) {
                Ok(cmd) => match cmd {},
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    self.pend_tick();
                    next_tick += period;

                    // Skip the ticks we are too late for
                    let now = Instant::now();
                    if now > next_tick + period {
                        log::trace!("timer thread fell behind; resynchronizing");
                        next_tick = now + period;
                    }
                }
            }
        }
    }

    fn pend_tick(&self) {
        let kernel = self.kernel();
        let mut lock = kernel.lock();
        // A tick that hasn't been handled yet absorbs this one
        if !lock.tick_pending && !lock.shutting_down {
            lock.tick_pending = true;
            lock.irq_queue.push_back(Irq::Tick);
            kernel.cond.notify_all();
        }
    }

    /// The entry point of the interrupt thread. Interrupt handlers run here one
    /// at a time, in the order they were raised.
    pub(crate) fn interrupt_main(&'static self) {
        THREAD_ROLE.with(|role| role.set(ThreadRole::Interrupt));
        let kernel = self.kernel();
        let mut lock = kernel.lock();

        while !lock.shutting_down {
            let Some(irq) = lock.irq_queue.pop_front() else {
                lock = kernel.wait(lock);
                continue;
            };

            let interrupted = lock.running;

            match irq {
                Irq::Tick => {
                    lock.tick_pending = false;
                    lock.advance_tick();
                }
                Irq::Routine {
                    routine,
                    param,
                    serial,
                } => {
                    log::trace!("interrupt handler {routine:p}({param}) enter");
                    lock.in_interrupt = true;
                    // No thread runs while the handler does
                    if let Some(thread) = interrupted {
                        lock.stop(thread);
                    }
                    drop(lock);

                    let result = panic::catch_unwind(move || routine(param));

                    lock = kernel.lock();
                    lock.in_interrupt = false;
                    log::trace!("interrupt handler {routine:p}({param}) leave");
                    if let Some(serial) = serial {
                        lock.irq_completed = serial;
                    }
                    if let Err(payload) = result {
                        log::error!("an interrupt handler panicked, shutting down");
                        lock.record_panic(payload);
                    }
                }
            }

            // Return from the interrupt. A preempted thread stays stopped until
            // it's chosen again.
            lock.dispatch();
            if let Some(thread) = interrupted {
                let preempted = lock.running != Some(thread)
                    && lock
                        .threads
                        .get(thread)
                        .is_some_and(|tcb| tcb.st != Tsm::Terminated);
                if preempted {
                    lock.stop(thread);
                }
            }
            kernel.cond.notify_all();
        }
        log::trace!("interrupt thread exiting");
    }

    pub fn irq_offload(&'static self, routine: fn(usize), param: usize) {
        log::trace!("irq_offload({routine:p}, {param})");
        let ThreadRole::Task(me) = expect_worker_thread() else {
            // Already in interrupt context
            routine(param);
            return;
        };

        let kernel = self.kernel();
        let mut lock = kernel.wait_for_cpu(kernel.lock(), me);
        let serial = lock.irq_next_serial;
        lock.irq_next_serial += 1;
        lock.irq_queue.push_back(Irq::Routine {
            routine,
            param,
            serial: Some(serial),
        });
        kernel.cond.notify_all();

        let lock = kernel.wait_for(lock, me, |sched| sched.irq_completed >= serial);
        drop(kernel.wait_for_cpu(lock, me));
    }
}

/// Raise an interrupt from an external thread. `routine(param)` will run in
/// interrupt context.
///
/// This function returns without waiting for the handler to complete. It's
/// illegal to call it from a thread managed by the port; use
/// [`BenchOffload::irq_offload`](rtbench::BenchOffload::irq_offload) in such
/// cases.
///
/// # Panics
///
/// Panics if called before the port is booted.
pub fn raise_interrupt<Traits: PortInstance>(routine: fn(usize), param: usize) {
    log::trace!("external-raise_interrupt({routine:p}, {param})");

    assert_eq!(
        THREAD_ROLE.with(Cell::get),
        ThreadRole::Unknown,
        "this function cannot be called from a port-managed thread"
    );

    let kernel = Traits::port_state().kernel();
    let mut lock = kernel.lock();
    if lock.shutting_down {
        log::debug!("ignoring an interrupt raised during shutdown");
        return;
    }
    lock.irq_queue.push_back(Irq::Routine {
        routine,
        param,
        serial: None,
    });
    kernel.cond.notify_all();
}
