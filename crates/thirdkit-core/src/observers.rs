use std::sync::{Arc, Weak};

/// Multicast set of observers held by weak reference.
///
/// The registry never keeps an observer alive: once the last `Arc` to an
/// observer is dropped, the entry is pruned on the next pass and the observer
/// receives nothing further. Identity is the address of the shared allocation,
/// so registering the same `Arc` (or a clone of it) twice is a no-op.
///
/// Delivery order is most recently registered first.
///
/// There is no internal locking. Owners that share a registry across threads
/// keep it behind their own lock and call [`live`](Self::live) to take a
/// snapshot before invoking callbacks, so observers may re-enter `add` or
/// `remove` from inside a notification.
pub struct ObserverRegistry<T: ?Sized> {
    entries: Vec<Weak<T>>,
}

impl<T: ?Sized> ObserverRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `observer`. Returns `false` if it was already registered.
    pub fn add(&mut self, observer: &Arc<T>) -> bool {
        self.prune();
        if self.position(observer).is_some() {
            return false;
        }
        self.entries.push(Arc::downgrade(observer));
        true
    }

    /// Unregister `observer`. Returns `false` if it was not registered.
    pub fn remove(&mut self, observer: &Arc<T>) -> bool {
        match self.position(observer) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop entries whose observer no longer exists. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.strong_count() > 0);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            tracing::debug!("pruned {pruned} expired observer(s)");
        }
        pruned
    }

    /// Snapshot of the live observers, most recently registered first.
    pub fn live(&mut self) -> Vec<Arc<T>> {
        self.prune();
        self.entries.iter().rev().filter_map(Weak::upgrade).collect()
    }

    /// Invoke `f` on every live observer.
    pub fn notify(&mut self, mut f: impl FnMut(&T)) {
        for observer in self.live() {
            f(&*observer);
        }
    }

    pub fn len(&mut self) -> usize {
        self.prune();
        self.entries.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    fn position(&self, observer: &Arc<T>) -> Option<usize> {
        let target = Arc::as_ptr(observer);
        self.entries
            .iter()
            .position(|entry| std::ptr::addr_eq(entry.as_ptr(), target))
    }
}

impl<T: ?Sized> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
