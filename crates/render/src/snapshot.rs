//! Producer/consumer snapshot handoff.

use std::sync::Arc;

use parking_lot::Mutex;

/// Single-slot snapshot cell bridging a producer thread and the render
/// thread.
///
/// The producer builds a complete value off to the side and [`publish`]es it
/// by swapping the slot's `Arc` under a brief lock; the consumer [`read`]s
/// the current `Arc` without touching any producer state. A reader therefore
/// always observes either the previous snapshot or the new one, never a mix.
///
/// [`publish`]: Snapshot::publish
/// [`read`]: Snapshot::read
pub struct Snapshot<T> {
    slot: Mutex<Arc<T>>,
}

impl<T: Default> Snapshot<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Arc::new(T::default())),
        }
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Snapshot<T> {
    pub fn with_initial(value: T) -> Self {
        Self {
            slot: Mutex::new(Arc::new(value)),
        }
    }

    /// Replaces the snapshot. Sync phase only.
    pub fn publish(&self, value: T) {
        *self.slot.lock() = Arc::new(value);
    }

    /// Current snapshot. Async phase; never blocks on producer locks.
    pub fn read(&self) -> Arc<T> {
        self.slot.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_last_published() {
        let cell = Snapshot::<Vec<i32>>::new();
        assert!(cell.read().is_empty());

        cell.publish(vec![1, 2, 3]);
        assert_eq!(*cell.read(), vec![1, 2, 3]);

        cell.publish(vec![4]);
        assert_eq!(*cell.read(), vec![4]);
    }

    #[test]
    fn readers_keep_their_snapshot_across_publishes() {
        let cell = Snapshot::with_initial(1);
        let old = cell.read();
        cell.publish(2);
        assert_eq!(*old, 1);
        assert_eq!(*cell.read(), 2);
    }
}
