use rtbench::{
    CreateSemaphoreError, DestroySemaphoreError, SemaphoreId, SemaphoreValue, TakeSemaphoreError,
};
use std::collections::VecDeque;

use crate::{
    sched::{Sched, SemaphoreCb, Tsm, WaitReason},
    State, ThreadRole,
};

impl State {
    pub fn sem_create(
        &'static self,
        id: SemaphoreId,
        initial: SemaphoreValue,
        maximum: SemaphoreValue,
    ) -> Result<(), CreateSemaphoreError> {
        log::trace!("sem_create({id:?}, {initial}, {maximum})");
        let (mut lock, role) = self.enter();
        if role == ThreadRole::Interrupt {
            return Err(CreateSemaphoreError::BadContext);
        }
        if maximum == 0 || initial > maximum {
            return Err(CreateSemaphoreError::BadParam);
        }
        if lock.sems.contains_key(&id) {
            return Err(CreateSemaphoreError::BadObjectState);
        }
        if lock.sems.len() >= self.config.max_semaphores {
            return Err(CreateSemaphoreError::OutOfMemory);
        }
        lock.sems.insert(
            id,
            SemaphoreCb {
                value: initial,
                maximum,
                waiters: VecDeque::new(),
            },
        );
        Ok(())
    }

    pub fn sem_give(&'static self, id: SemaphoreId) {
        log::trace!("sem_give({id:?})");
        let (mut lock, role) = self.enter();
        let Sched { sems, threads, .. } = &mut *lock;
        let Some(sem) = sems.get_mut(&id) else {
            log::warn!("sem_give: no such semaphore {id:?}");
            return;
        };
        if let Some(waiter) = Sched::take_most_urgent(threads, &mut sem.waiters) {
            // Hand the permit over
            lock.make_ready(waiter);
            self.leave(lock, role);
        } else {
            sem.add_permit();
        }
    }

    pub fn sem_take(&'static self, id: SemaphoreId) -> Result<(), TakeSemaphoreError> {
        log::trace!("sem_take({id:?})");
        let (mut lock, role) = self.enter();
        let ThreadRole::Task(me) = role else {
            return Err(TakeSemaphoreError::BadContext);
        };
        let sem = lock
            .sems
            .get_mut(&id)
            .ok_or(TakeSemaphoreError::NoAccess)?;
        if sem.value > 0 {
            sem.value -= 1;
            return Ok(());
        }

        sem.waiters.push_back(me);
        lock.threads[me].st = Tsm::Waiting(WaitReason::Semaphore(id));
        // Returns after `sem_give` hands over a permit
        self.leave(lock, role);
        Ok(())
    }

    pub fn sem_destroy(&'static self, id: SemaphoreId) -> Result<(), DestroySemaphoreError> {
        log::trace!("sem_destroy({id:?})");
        let (mut lock, role) = self.enter();
        if role == ThreadRole::Interrupt {
            return Err(DestroySemaphoreError::BadContext);
        }
        let sem = lock.sems.get(&id).ok_or(DestroySemaphoreError::NoAccess)?;
        if !sem.waiters.is_empty() {
            return Err(DestroySemaphoreError::BadObjectState);
        }
        lock.sems.remove(&id);
        Ok(())
    }
}
