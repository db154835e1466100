//! The scheduler state of the simulated processor.
//!
//! Everything in this module is plain data manipulated under the kernel lock.
//! Host threads are only touched by `Sched::stop` and `Sched::resume_running`;
//! spawning and blocking them is done in `lib.rs` and the service modules.
use rtbench::{MutexId, Priority, SemaphoreId, SemaphoreValue, ThreadId};
use slab::Slab;
use std::{
    any::Any,
    collections::{BTreeMap, HashMap, VecDeque},
};

use crate::{threading, Config};

/// Thread state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tsm {
    /// Created but not started.
    Dormant,
    /// Runnable unless suspended. The running thread is in this state, too.
    Ready,
    Waiting(WaitReason),
    /// Aborted or exited. The host thread, if any, unwinds at its next
    /// kernel entry.
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitReason {
    Semaphore(SemaphoreId),
    Mutex(MutexId),
    /// Waiting for `tick_count` to reach the value.
    Tick(u64),
    /// The work-queue thread has nothing to do.
    Work,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Entry {
    /// The thread passed to `test_init`.
    Main(fn(usize)),
    User { entry: fn(usize), param: usize },
    WorkQueue,
}

/// Thread control block
#[derive(Debug)]
pub(crate) struct Tcb {
    /// `None` for the port's own threads.
    pub id: Option<ThreadId>,
    /// Distinguishes this thread from earlier occupants of the same slab slot.
    pub serial: u64,
    pub name: String,
    pub priority: Priority,
    pub st: Tsm,
    pub suspended: bool,
    pub entry: Entry,
    /// The host thread has been spawned.
    pub spawned: bool,
    /// The host thread, once it has started.
    pub host: Option<threading::Thread>,
    /// The host thread is remotely parked.
    pub stopped: bool,
}

impl Tcb {
    pub fn is_runnable(&self) -> bool {
        self.st == Tsm::Ready && !self.suspended
    }
}

#[derive(Debug)]
pub(crate) struct SemaphoreCb {
    pub value: SemaphoreValue,
    pub maximum: SemaphoreValue,
    /// Waiting threads in arrival order.
    pub waiters: VecDeque<usize>,
}

impl SemaphoreCb {
    /// Add a permit when nobody is waiting. Excess permits are dropped.
    pub fn add_permit(&mut self) {
        self.value = self.value.saturating_add(1).min(self.maximum);
    }
}

#[derive(Debug)]
pub(crate) struct MutexCb {
    /// The serial of the owning thread.
    pub owner: Option<u64>,
    pub waiters: VecDeque<usize>,
}

/// The offload work queue.
#[derive(Debug)]
pub(crate) struct WorkQueue {
    pub thread: usize,
    pub pending: bool,
}

pub(crate) enum Irq {
    Tick,
    Routine {
        routine: fn(usize),
        param: usize,
        /// `Some(_)` if a thread is waiting for the completion.
        serial: Option<u64>,
    },
}

/// Ready threads by priority, FIFO within a priority.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    queues: BTreeMap<Priority, VecDeque<usize>>,
}

impl ReadyQueue {
    pub fn push_back(&mut self, priority: Priority, thread: usize) {
        self.queues.entry(priority).or_default().push_back(thread);
    }

    pub fn push_front(&mut self, priority: Priority, thread: usize) {
        self.queues.entry(priority).or_default().push_front(thread);
    }

    /// Remove `thread`. Returns `false` if it was not queued.
    pub fn remove(&mut self, priority: Priority, thread: usize) -> bool {
        let Some(queue) = self.queues.get_mut(&priority) else {
            return false;
        };
        let Some(i) = queue.iter().position(|&t| t == thread) else {
            return false;
        };
        queue.remove(i);
        if queue.is_empty() {
            self.queues.remove(&priority);
        }
        true
    }

    /// Get the most urgent priority among the queued threads.
    pub fn first_priority(&self) -> Option<Priority> {
        self.queues.keys().next().copied()
    }

    pub fn pop_first(&mut self) -> Option<usize> {
        let mut entry = self.queues.first_entry()?;
        let thread = entry.get_mut().pop_front();
        if entry.get().is_empty() {
            entry.remove();
        }
        thread
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

pub(crate) struct Sched {
    pub config: Config,
    pub threads: Slab<Tcb>,
    /// Live user threads. An id stays mapped from `thread_create` until the
    /// thread is aborted or exits.
    pub thread_ids: HashMap<ThreadId, usize>,
    pub sems: HashMap<SemaphoreId, SemaphoreCb>,
    pub mutexes: HashMap<MutexId, MutexCb>,
    pub ready: ReadyQueue,
    /// The thread owning the processor. It's not in `ready`.
    pub running: Option<usize>,
    /// Threads in `Tsm::Waiting(WaitReason::Tick(_))`.
    pub sleepers: Vec<usize>,
    pub tick_count: u64,
    pub tick_pending: bool,
    pub irq_queue: VecDeque<Irq>,
    pub in_interrupt: bool,
    pub irq_next_serial: u64,
    pub irq_completed: u64,
    pub work_queue: Option<WorkQueue>,
    pub next_thread_serial: u64,
    pub shutting_down: bool,
    pub panic_payload: Option<Box<dyn Any + Send>>,
}

impl Sched {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            threads: Slab::new(),
            thread_ids: HashMap::new(),
            sems: HashMap::new(),
            mutexes: HashMap::new(),
            ready: ReadyQueue::default(),
            running: None,
            sleepers: Vec::new(),
            tick_count: 0,
            tick_pending: false,
            irq_queue: VecDeque::new(),
            in_interrupt: false,
            irq_next_serial: 1,
            irq_completed: 0,
            work_queue: None,
            next_thread_serial: 0,
            shutting_down: false,
            panic_payload: None,
        }
    }

    pub fn insert_thread(
        &mut self,
        id: Option<ThreadId>,
        name: &str,
        priority: Priority,
        entry: Entry,
    ) -> usize {
        let serial = self.next_thread_serial;
        self.next_thread_serial += 1;
        let index = self.threads.insert(Tcb {
            id,
            serial,
            name: name.to_owned(),
            priority,
            st: Tsm::Dormant,
            suspended: false,
            entry,
            spawned: false,
            host: None,
            stopped: false,
        });
        if let Some(id) = id {
            self.thread_ids.insert(id, index);
        }
        index
    }

    /// Transition a thread to `Ready`, queueing it if it's runnable.
    pub fn make_ready(&mut self, thread: usize) {
        let tcb = &mut self.threads[thread];
        debug_assert_ne!(tcb.st, Tsm::Terminated);
        tcb.st = Tsm::Ready;
        if !tcb.suspended && self.running != Some(thread) {
            self.ready.push_back(tcb.priority, thread);
        }
    }

    /// Choose the thread to run. Call this at every point where a task-context
    /// service call or an interrupt handler returns. The chosen thread's host
    /// thread is resumed if it was stopped.
    pub fn dispatch(&mut self) {
        if let Some(cur) = self.running {
            let tcb = &self.threads[cur];
            if tcb.is_runnable() {
                match self.ready.first_priority() {
                    Some(p) if p < tcb.priority => {
                        // Preempted threads resume before their peers
                        self.ready.push_front(tcb.priority, cur);
                    }
                    _ => {
                        self.resume_running();
                        return;
                    }
                }
            }
        }
        self.running = self.ready.pop_first();
        log::trace!("dispatch: running = {:?}", self.running);
        self.resume_running();
    }

    /// Remotely park the host thread of `thread` so that it stops executing
    /// outside the kernel. The caller must be holding the kernel lock.
    pub fn stop(&mut self, thread: usize) {
        let tcb = &mut self.threads[thread];
        if tcb.stopped {
            return;
        }
        let Some(host) = &tcb.host else {
            // Not started yet; it can't get past `wait_for_cpu` anyway
            return;
        };
        host.park();
        tcb.stopped = true;
        log::trace!("stopped the host thread of {thread}");
    }

    /// Let the running thread's host thread continue if it was stopped.
    pub fn resume_running(&mut self) {
        let Some(cur) = self.running else { return };
        let tcb = &mut self.threads[cur];
        if !tcb.stopped {
            return;
        }
        if let Some(host) = &tcb.host {
            host.unpark();
        }
        tcb.stopped = false;
        log::trace!("resumed the host thread of {cur}");
    }

    /// Move the running thread behind the ready threads of its priority.
    pub fn yield_running(&mut self) {
        let Some(cur) = self.running else { return };
        let tcb = &self.threads[cur];
        if tcb.is_runnable() {
            self.ready.push_back(tcb.priority, cur);
        }
        self.running = self.ready.pop_first();
        self.resume_running();
    }

    /// Change the priority of the running thread. When lowered, the thread is
    /// placed behind the ready threads of its new priority.
    pub fn set_running_priority(&mut self, priority: Priority) {
        let Some(cur) = self.running else { return };
        let old = std::mem::replace(&mut self.threads[cur].priority, priority);
        if priority > old && self.ready.first_priority().is_some_and(|p| p <= priority) {
            self.yield_running();
        }
    }

    /// Take the most urgent thread from a wait queue, preferring earlier
    /// arrivals among equal priorities.
    pub fn take_most_urgent(threads: &Slab<Tcb>, waiters: &mut VecDeque<usize>) -> Option<usize> {
        let (i, _) = waiters
            .iter()
            .enumerate()
            .min_by_key(|&(i, &t)| (threads[t].priority, i))?;
        waiters.remove(i)
    }

    /// Remove a thread from every queue it's in.
    pub fn unlink(&mut self, thread: usize) {
        let tcb = &self.threads[thread];
        match tcb.st {
            Tsm::Ready => {
                self.ready.remove(tcb.priority, thread);
            }
            Tsm::Waiting(WaitReason::Semaphore(id)) => {
                if let Some(sem) = self.sems.get_mut(&id) {
                    sem.waiters.retain(|&t| t != thread);
                }
            }
            Tsm::Waiting(WaitReason::Mutex(id)) => {
                if let Some(mutex) = self.mutexes.get_mut(&id) {
                    mutex.waiters.retain(|&t| t != thread);
                }
            }
            Tsm::Waiting(WaitReason::Tick(_)) => {
                self.sleepers.retain(|&t| t != thread);
            }
            Tsm::Waiting(WaitReason::Work) | Tsm::Dormant | Tsm::Terminated => {}
        }
        if self.running == Some(thread) {
            self.running = None;
        }
    }

    /// Terminate a thread. Its id becomes available immediately. The control
    /// block is released by [`Self::release`].
    pub fn terminate(&mut self, thread: usize) {
        self.unlink(thread);
        let tcb = &mut self.threads[thread];
        tcb.st = Tsm::Terminated;
        if let Some(id) = tcb.id {
            if self.thread_ids.get(&id) == Some(&thread) {
                self.thread_ids.remove(&id);
            }
        }
    }

    /// Release the control block of a terminated thread.
    pub fn release(&mut self, thread: usize) {
        debug_assert_eq!(self.threads[thread].st, Tsm::Terminated);
        self.threads.remove(thread);
    }

    /// Abort every thread and stop the interrupt thread.
    pub fn begin_shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        log::debug!("shutting down");
        self.shutting_down = true;
        let threads: Vec<usize> = self.threads.iter().map(|(i, _)| i).collect();
        for thread in threads {
            if self.threads[thread].st != Tsm::Terminated {
                self.terminate(thread);
            }
            if !self.threads[thread].spawned {
                self.release(thread);
            }
        }
        self.running = None;
    }

    /// Record the first panic of the run.
    pub fn record_panic(&mut self, payload: Box<dyn Any + Send>) {
        if self.panic_payload.is_none() {
            self.panic_payload = Some(payload);
        }
        self.begin_shutdown();
    }

    /// Increment the tick count and wake up the threads waiting for it.
    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        let now = self.tick_count;
        let threads = &self.threads;
        let (woken, sleeping): (Vec<usize>, Vec<usize>) =
            self.sleepers.iter().copied().partition(|&t| {
                matches!(threads[t].st, Tsm::Waiting(WaitReason::Tick(at)) if at <= now)
            });
        self.sleepers = sleeping;
        for thread in woken {
            self.make_ready(thread);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn nop(_: usize) {}

    fn sched_with(priorities: &[Priority]) -> (Sched, Vec<usize>) {
        let mut sched = Sched::new(Config::new());
        let threads = priorities
            .iter()
            .enumerate()
            .map(|(i, &pri)| {
                let t = sched.insert_thread(
                    Some(ThreadId(i)),
                    "t",
                    pri,
                    Entry::User { entry: nop, param: i },
                );
                sched.make_ready(t);
                t
            })
            .collect();
        (sched, threads)
    }

    /// The count stays within `0..=maximum` and reflects every permit that
    /// fits.
    #[quickcheck]
    fn qc_semaphore_saturates(initial: u8, maximum: u8, gives: u8) {
        let maximum = SemaphoreValue::from(maximum).max(1);
        let initial = SemaphoreValue::from(initial).min(maximum);
        let mut sem = SemaphoreCb {
            value: initial,
            maximum,
            waiters: VecDeque::new(),
        };
        for _ in 0..gives {
            sem.add_permit();
            assert!(sem.value <= maximum);
        }
        assert_eq!(sem.value, (initial + SemaphoreValue::from(gives)).min(maximum));
    }

    /// The ready queue behaves like a list sorted by priority, FIFO within a
    /// priority, under arbitrary insertions and removals.
    #[quickcheck]
    fn qc_ready_queue(ops: Vec<(u8, i8)>) {
        let mut queue = ReadyQueue::default();
        let mut model: Vec<(Priority, usize)> = Vec::new();
        let mut next = 0;

        for (op, pri) in ops {
            let pri = Priority::from(pri % 4);
            match op % 4 {
                0 | 1 => {
                    queue.push_back(pri, next);
                    let pos = model.iter().position(|&(p, _)| p > pri).unwrap_or(model.len());
                    model.insert(pos, (pri, next));
                    next += 1;
                }
                2 => {
                    queue.push_front(pri, next);
                    let pos = model.iter().position(|&(p, _)| p >= pri).unwrap_or(model.len());
                    model.insert(pos, (pri, next));
                    next += 1;
                }
                _ => {
                    if model.is_empty() {
                        assert_eq!(queue.pop_first(), None);
                    } else if op % 8 == 7 {
                        let (p, t) = model.remove(model.len() / 2);
                        assert!(queue.remove(p, t));
                        assert!(!queue.remove(p, t));
                    } else {
                        let (_, t) = model.remove(0);
                        assert_eq!(queue.pop_first(), Some(t));
                    }
                }
            }
            assert_eq!(queue.len(), model.len());
            assert_eq!(queue.first_priority(), model.first().map(|&(p, _)| p));
        }
    }

    #[test]
    fn dispatch_picks_most_urgent() {
        let (mut sched, t) = sched_with(&[5, 1, 3, 1]);
        sched.dispatch();
        assert_eq!(sched.running, Some(t[1]));
    }

    #[test]
    fn preempted_thread_resumes_first() {
        let (mut sched, t) = sched_with(&[2, 2]);
        sched.dispatch();
        assert_eq!(sched.running, Some(t[0]));

        let hi = sched.insert_thread(None, "hi", 0, Entry::WorkQueue);
        sched.make_ready(hi);
        sched.dispatch();
        assert_eq!(sched.running, Some(hi));

        sched.threads[hi].st = Tsm::Waiting(WaitReason::Work);
        sched.dispatch();
        assert_eq!(sched.running, Some(t[0]));
    }

    /// A thread preempted from outside its own host thread stays stopped
    /// while the other thread runs, and continues when it's chosen again.
    #[test]
    fn preempted_host_thread_stays_stopped() {
        use std::{
            sync::{
                atomic::{AtomicBool, AtomicU64, Ordering},
                mpsc,
            },
            thread,
            time::{Duration, Instant},
        };

        static COUNTER: AtomicU64 = AtomicU64::new(0);
        static EXIT: AtomicBool = AtomicBool::new(false);

        let (send, recv) = mpsc::channel();
        let jh = thread::spawn(move || {
            send.send(threading::current()).unwrap();
            while !EXIT.load(Ordering::Relaxed) {
                COUNTER.fetch_add(1, Ordering::Relaxed);
            }
        });
        let wait_for_progress = || {
            let start = Instant::now();
            let i1 = COUNTER.load(Ordering::Relaxed);
            while COUNTER.load(Ordering::Relaxed) == i1 {
                assert!(start.elapsed() < Duration::from_secs(20));
                thread::yield_now();
            }
        };

        let (mut sched, t) = sched_with(&[2]);
        sched.threads[t[0]].host = Some(recv.recv().unwrap());
        sched.dispatch();
        assert_eq!(sched.running, Some(t[0]));
        wait_for_progress();

        // An interrupt handler readies a more urgent thread
        sched.stop(t[0]);
        let hi = sched.insert_thread(None, "hi", 0, Entry::WorkQueue);
        sched.make_ready(hi);
        sched.dispatch();
        assert_eq!(sched.running, Some(hi));
        assert!(sched.threads[t[0]].stopped);

        let i1 = COUNTER.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(COUNTER.load(Ordering::Relaxed), i1);

        // Stopping twice is harmless
        sched.stop(t[0]);

        sched.threads[hi].st = Tsm::Waiting(WaitReason::Work);
        sched.dispatch();
        assert_eq!(sched.running, Some(t[0]));
        assert!(!sched.threads[t[0]].stopped);
        wait_for_progress();

        EXIT.store(true, Ordering::Relaxed);
        jh.join().unwrap();
    }

    #[test]
    fn yield_never_selects_lower_priority() {
        let (mut sched, t) = sched_with(&[1, 1, 4]);
        sched.dispatch();
        assert_eq!(sched.running, Some(t[0]));
        sched.yield_running();
        assert_eq!(sched.running, Some(t[1]));
        sched.yield_running();
        assert_eq!(sched.running, Some(t[0]));

        let (mut sched, t) = sched_with(&[1, 4]);
        sched.dispatch();
        sched.yield_running();
        assert_eq!(sched.running, Some(t[0]));
    }

    #[test]
    fn lowering_priority_yields_to_peers() {
        let (mut sched, t) = sched_with(&[0, 3, 5]);
        sched.dispatch();
        assert_eq!(sched.running, Some(t[0]));

        // No other thread is at least as urgent as 2
        sched.set_running_priority(2);
        assert_eq!(sched.running, Some(t[0]));

        // Placed behind `t[1]`
        sched.set_running_priority(3);
        assert_eq!(sched.running, Some(t[1]));

        // Raising never yields
        sched.set_running_priority(-1);
        assert_eq!(sched.running, Some(t[1]));
    }

    #[test]
    fn wait_queue_order() {
        let (mut sched, t) = sched_with(&[3, 1, 2, 1]);
        let mut waiters: VecDeque<usize> = t.iter().copied().collect();
        let order: Vec<_> =
            std::iter::from_fn(|| Sched::take_most_urgent(&sched.threads, &mut waiters)).collect();
        assert_eq!(order, [t[1], t[3], t[2], t[0]]);
        sched.begin_shutdown();
    }

    #[test]
    fn suspended_threads_are_not_queued() {
        let mut sched = Sched::new(Config::new());
        let a = sched.insert_thread(Some(ThreadId(0)), "a", 0, Entry::WorkQueue);
        sched.threads[a].suspended = true;
        sched.make_ready(a);
        assert_eq!(sched.ready.len(), 0);
        sched.dispatch();
        assert_eq!(sched.running, None);
    }

    #[test]
    fn terminate_frees_id() {
        let (mut sched, t) = sched_with(&[1, 2]);
        sched.dispatch();
        sched.terminate(t[0]);
        assert_eq!(sched.running, None);
        assert!(!sched.thread_ids.contains_key(&ThreadId(0)));
        assert!(sched.thread_ids.contains_key(&ThreadId(1)));
        sched.release(t[0]);
        sched.dispatch();
        assert_eq!(sched.running, Some(t[1]));
    }

    #[test]
    fn tick_wakes_sleepers() {
        let (mut sched, t) = sched_with(&[1, 2]);
        for (&thread, at) in t.iter().zip([1, 2]) {
            sched.ready.remove(sched.threads[thread].priority, thread);
            sched.threads[thread].st = Tsm::Waiting(WaitReason::Tick(at));
            sched.sleepers.push(thread);
        }
        sched.advance_tick();
        assert_eq!(sched.threads[t[0]].st, Tsm::Ready);
        assert_eq!(sched.sleepers, [t[1]]);
        sched.advance_tick();
        assert!(sched.sleepers.is_empty());
        assert_eq!(sched.ready.len(), 2);
    }
}
