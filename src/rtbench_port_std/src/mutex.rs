use rtbench::{CreateMutexError, DestroyMutexError, LockMutexError, MutexId, UnlockMutexError};
use std::collections::VecDeque;

use crate::{
    sched::{MutexCb, Sched, Tsm, WaitReason},
    State, ThreadRole,
};

impl State {
    pub fn mutex_create(&'static self, id: MutexId) -> Result<(), CreateMutexError> {
        log::trace!("mutex_create({id:?})");
        let (mut lock, role) = self.enter();
        if role == ThreadRole::Interrupt {
            return Err(CreateMutexError::BadContext);
        }
        if lock.mutexes.contains_key(&id) {
            return Err(CreateMutexError::BadObjectState);
        }
        if lock.mutexes.len() >= self.config.max_mutexes {
            return Err(CreateMutexError::OutOfMemory);
        }
        lock.mutexes.insert(
            id,
            MutexCb {
                owner: None,
                waiters: VecDeque::new(),
            },
        );
        Ok(())
    }

    pub fn mutex_lock(&'static self, id: MutexId) -> Result<(), LockMutexError> {
        log::trace!("mutex_lock({id:?})");
        let (mut lock, role) = self.enter();
        let ThreadRole::Task(me) = role else {
            return Err(LockMutexError::BadContext);
        };
        let Sched {
            mutexes, threads, ..
        } = &mut *lock;
        let my_serial = threads[me].serial;
        let mutex = mutexes.get_mut(&id).ok_or(LockMutexError::NoAccess)?;
        let owner = mutex.owner;
        match owner {
            None => {
                mutex.owner = Some(my_serial);
                Ok(())
            }
            Some(owner) if owner == my_serial => Err(LockMutexError::WouldDeadlock),
            Some(_) => {
                mutex.waiters.push_back(me);
                threads[me].st = Tsm::Waiting(WaitReason::Mutex(id));
                // Returns after `mutex_unlock` hands over the ownership
                self.leave(lock, role);
                Ok(())
            }
        }
    }

    pub fn mutex_unlock(&'static self, id: MutexId) -> Result<(), UnlockMutexError> {
        log::trace!("mutex_unlock({id:?})");
        let (mut lock, role) = self.enter();
        let ThreadRole::Task(me) = role else {
            return Err(UnlockMutexError::BadContext);
        };
        let Sched {
            mutexes, threads, ..
        } = &mut *lock;
        let mutex = mutexes.get_mut(&id).ok_or(UnlockMutexError::NoAccess)?;
        if mutex.owner != Some(threads[me].serial) {
            return Err(UnlockMutexError::NotOwner);
        }

        match Sched::take_most_urgent(threads, &mut mutex.waiters) {
            Some(waiter) => {
                mutex.owner = Some(threads[waiter].serial);
                lock.make_ready(waiter);
                self.leave(lock, role);
            }
            None => mutex.owner = None,
        }
        Ok(())
    }

    pub fn mutex_destroy(&'static self, id: MutexId) -> Result<(), DestroyMutexError> {
        log::trace!("mutex_destroy({id:?})");
        let (mut lock, role) = self.enter();
        if role == ThreadRole::Interrupt {
            return Err(DestroyMutexError::BadContext);
        }
        let mutex = lock.mutexes.get(&id).ok_or(DestroyMutexError::NoAccess)?;
        if mutex.owner.is_some() || !mutex.waiters.is_empty() {
            return Err(DestroyMutexError::BadObjectState);
        }
        lock.mutexes.remove(&id);
        Ok(())
    }
}
