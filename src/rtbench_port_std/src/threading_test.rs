//! Test cases for `crate::threading`
use quickcheck_macros::quickcheck;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        mpsc,
    },
    thread::{self, sleep, yield_now},
    time::{Duration, Instant},
};

use super::threading;

/// Spawn a thread spinning on `counter` until `exit` is set. Returns its
/// handle and the `std` join handle.
fn spawn_spinner(
    counter: &'static AtomicU32,
    exit: &'static AtomicBool,
) -> (threading::Thread, thread::JoinHandle<()>) {
    let (send, recv) = mpsc::channel();
    let jh = thread::spawn(move || {
        send.send(threading::current()).unwrap();
        while !exit.load(Ordering::Relaxed) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });
    (recv.recv().unwrap(), jh)
}

fn wait_for_progress(counter: &AtomicU32) {
    let i1 = counter.load(Ordering::Relaxed);
    let start = Instant::now();
    loop {
        yield_now();
        if counter.load(Ordering::Relaxed) != i1 {
            return;
        }
        assert!(start.elapsed() < Duration::from_secs(20), "the thread is not running");
    }
}

#[test]
fn remote_park_stops_thread() {
    let counter: &_ = Box::leak(Box::new(AtomicU32::new(0)));
    let exit: &_ = Box::leak(Box::new(AtomicBool::new(false)));
    let (thread, jh) = spawn_spinner(counter, exit);

    wait_for_progress(counter);

    for _ in 0..200 {
        thread.park();

        // The thread doesn't run while parked
        let i1 = counter.load(Ordering::Relaxed);
        sleep(Duration::from_millis(1));
        let i2 = counter.load(Ordering::Relaxed);
        assert_eq!(i1, i2);

        thread.unpark();
        wait_for_progress(counter);
    }

    exit.store(true, Ordering::Relaxed);
    jh.join().unwrap();
}

/// A token made available in advance cancels the next remote park.
#[cfg(unix)]
#[quickcheck]
fn qc_unpark_in_advance(ops: Vec<bool>) {
    let counter: &_ = Box::leak(Box::new(AtomicU32::new(0)));
    let exit: &_ = Box::leak(Box::new(AtomicBool::new(false)));
    let (thread, jh) = spawn_spinner(counter, exit);

    for unpark_first in ops {
        if unpark_first {
            thread.unpark();
            thread.park();
        } else {
            thread.park();
            thread.unpark();
        }
    }

    wait_for_progress(counter);
    exit.store(true, Ordering::Relaxed);
    jh.join().unwrap();
}
