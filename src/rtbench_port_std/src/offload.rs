//! The offload work queue
use rtbench::WorkItem;

use crate::{
    sched::{Entry, Tsm, WaitReason, WorkQueue},
    State, ThreadRole,
};

impl State {
    pub fn offload_setup(&'static self) {
        log::trace!("offload_setup");
        let (mut lock, role) = self.enter();
        assert!(
            matches!(role, ThreadRole::Task(_)),
            "`offload_setup` must be called from task context"
        );
        if lock.work_queue.is_some() {
            return;
        }

        let thread = lock.insert_thread(
            None,
            "work queue",
            self.config.work_queue_priority,
            Entry::WorkQueue,
        );
        // The thread runs once to reach its idle state
        lock.make_ready(thread);
        if !self.spawn_thread(&mut lock, thread) {
            return;
        }
        lock.work_queue = Some(WorkQueue {
            thread,
            pending: false,
        });
        log::debug!("created the work-queue thread in slot {thread}");
        self.leave(lock, role);
    }

    pub fn offload_create_work(&self, worker: fn()) {
        log::trace!("offload_create_work({worker:p})");
        // The slot is only accessed under the kernel lock so that a stopped
        // thread never holds it
        let _lock = self.kernel().lock();
        self.offload.register(WorkItem(worker));
    }

    pub fn offload_submit_work(&'static self) {
        log::trace!("offload_submit_work");
        let (mut lock, role) = self.enter();
        let Some(work_queue) = &mut lock.work_queue else {
            log::warn!("offload_submit_work: `offload_setup` has not been called");
            return;
        };
        if self.offload.get().is_none() {
            log::warn!("offload_submit_work: no work item has been registered");
            return;
        }
        if work_queue.pending {
            log::trace!("offload_submit_work: already pending");
            return;
        }
        work_queue.pending = true;
        let thread = work_queue.thread;
        if lock.threads[thread].st == Tsm::Waiting(WaitReason::Work) {
            lock.make_ready(thread);
        }
        self.leave(lock, role);
    }

    /// The body of the work-queue thread. Never returns; the host thread is
    /// unwound at shutdown.
    pub(crate) fn work_queue_main(&'static self, me: usize) {
        let kernel = self.kernel();
        let mut lock = kernel.lock();
        loop {
            lock = kernel.wait_for_cpu(lock, me);
            let work_queue = lock
                .work_queue
                .as_mut()
                .filter(|work_queue| work_queue.pending);
            if let Some(work_queue) = work_queue {
                work_queue.pending = false;
                let item = self.offload.get();
                drop(lock);
                if let Some(item) = item {
                    log::trace!("running {item:?}");
                    item.run();
                }
                lock = kernel.lock();
            } else {
                lock.threads[me].st = Tsm::Waiting(WaitReason::Work);
                lock.dispatch();
                kernel.cond.notify_all();
            }
        }
    }
}
