//! Thread lifecycle and priority control
use rtbench::{CreateThreadError, Priority, ThreadId};

use crate::{
    expect_worker_thread,
    sched::{Entry, Tsm},
    State, ThreadRole,
};

impl State {
    pub fn thread_create(
        &'static self,
        id: ThreadId,
        name: &str,
        priority: Priority,
        entry: fn(usize),
        param: usize,
    ) -> Result<(), CreateThreadError> {
        log::trace!("thread_create({id:?}, {name:?}, {priority}, {entry:p}, {param})");
        if expect_worker_thread() == ThreadRole::Interrupt {
            return Err(CreateThreadError::BadContext);
        }

        let (mut lock, role) = self.enter();
        if lock.thread_ids.contains_key(&id) {
            return Err(CreateThreadError::BadObjectState);
        }
        if lock.thread_ids.len() >= self.config.max_threads {
            return Err(CreateThreadError::OutOfMemory);
        }
        let index = lock.insert_thread(Some(id), name, priority, Entry::User { entry, param });
        log::debug!("created thread {id:?} ({name:?}) in slot {index}");
        self.leave(lock, role);
        Ok(())
    }

    pub fn thread_start(&'static self, id: ThreadId) {
        log::trace!("thread_start({id:?})");
        let (mut lock, role) = self.enter();
        let Some(&index) = lock.thread_ids.get(&id) else {
            log::warn!("thread_start: no such thread {id:?}");
            return;
        };
        if lock.threads[index].st != Tsm::Dormant {
            log::warn!("thread_start: {id:?} has already been started");
            return;
        }
        lock.make_ready(index);
        if !self.spawn_thread(&mut lock, index) {
            return;
        }
        self.leave(lock, role);
    }

    pub fn thread_suspend(&'static self, id: ThreadId) {
        log::trace!("thread_suspend({id:?})");
        let (mut lock, role) = self.enter();
        let Some(&index) = lock.thread_ids.get(&id) else {
            log::warn!("thread_suspend: no such thread {id:?}");
            return;
        };
        let tcb = &mut lock.threads[index];
        if tcb.suspended {
            return;
        }
        tcb.suspended = true;
        let (st, priority) = (tcb.st, tcb.priority);
        if st == Tsm::Ready {
            lock.ready.remove(priority, index);
        }
        // If the caller suspended itself, `leave` blocks until it's resumed
        self.leave(lock, role);
    }

    pub fn thread_resume(&'static self, id: ThreadId) {
        log::trace!("thread_resume({id:?})");
        let (mut lock, role) = self.enter();
        let Some(&index) = lock.thread_ids.get(&id) else {
            log::warn!("thread_resume: no such thread {id:?}");
            return;
        };
        let tcb = &mut lock.threads[index];
        if !tcb.suspended {
            return;
        }
        tcb.suspended = false;
        if tcb.st == Tsm::Ready {
            lock.make_ready(index);
        }
        self.leave(lock, role);
    }

    pub fn thread_abort(&'static self, id: ThreadId) {
        log::trace!("thread_abort({id:?})");
        let (mut lock, role) = self.enter();
        let Some(&index) = lock.thread_ids.get(&id) else {
            log::warn!("thread_abort: no such thread {id:?}");
            return;
        };
        // A stopped host thread is never resumed, so nothing else releases
        // the control block
        let tcb = &lock.threads[index];
        let release_now = !tcb.spawned || tcb.stopped;
        lock.terminate(index);
        if release_now {
            lock.release(index);
        }
        log::debug!("aborted thread {id:?}");

        // If the caller aborted itself, `leave` unwinds
        self.leave(lock, role);
    }

    pub fn yield_now(&'static self) {
        log::trace!("yield_now");
        let (mut lock, role) = self.enter();
        assert!(
            matches!(role, ThreadRole::Task(_)),
            "`yield_now` must be called from task context"
        );
        lock.yield_running();
        self.leave(lock, role);
    }

    pub fn thread_set_priority(&'static self, priority: Priority) {
        log::trace!("thread_set_priority({priority})");
        let (mut lock, role) = self.enter();
        assert!(
            matches!(role, ThreadRole::Task(_)),
            "`thread_set_priority` must be called from task context"
        );
        lock.set_running_priority(priority);
        self.leave(lock, role);
    }
}
