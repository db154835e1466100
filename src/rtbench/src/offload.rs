//! The work-item slot shared by ports implementing the offload work queue.
use core::fmt;

/// An argument-free routine submitted to the offload work queue.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WorkItem(pub fn());

impl WorkItem {
    #[inline]
    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkItem({:p})", self.0 as *const ())
    }
}

/// Holds the single registered [`WorkItem`].
///
/// `register` is called from task context by `offload_create_work`. `get` is
/// called by the work-queue thread each time the item is dispatched, so a
/// re-registration takes effect from the next dispatch on.
pub struct OffloadSlot {
    item: spin::Mutex<Option<WorkItem>>,
}

impl OffloadSlot {
    pub const fn new() -> Self {
        Self {
            item: spin::Mutex::new(None),
        }
    }

    /// Replace the registered item. Returns the previous one.
    pub fn register(&self, item: WorkItem) -> Option<WorkItem> {
        let old = self.item.lock().replace(item);
        if old.is_some() {
            log::debug!("replacing the registered work item");
        }
        old
    }

    pub fn get(&self) -> Option<WorkItem> {
        *self.item.lock()
    }
}

impl Default for OffloadSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OffloadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OffloadSlot").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn bump() {
        COUNTER.fetch_add(1, Ordering::Relaxed);
    }

    fn bump_twice() {
        COUNTER.fetch_add(2, Ordering::Relaxed);
    }

    #[test]
    fn register_and_replace() {
        let slot = OffloadSlot::new();
        assert_eq!(slot.get(), None);
        assert_eq!(slot.register(WorkItem(bump)), None);
        assert_eq!(slot.register(WorkItem(bump_twice)), Some(WorkItem(bump)));

        let before = COUNTER.load(Ordering::Relaxed);
        slot.get().unwrap().run();
        assert_eq!(COUNTER.load(Ordering::Relaxed), before + 2);
        assert_eq!(slot.get(), Some(WorkItem(bump_twice)));
    }
}
