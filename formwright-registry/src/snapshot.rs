//! Copy-on-write keyed map with atomic snapshot publication.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A string-keyed map that readers load as an immutable `Arc` snapshot.
///
/// Writers are serialised by `writer`, build the next map off to the side and
/// publish it with a pointer swap. The `current` write lock is held only for
/// that swap, so readers never wait on map construction and never see a map
/// that is partly updated.
pub(crate) struct SnapshotMap<V> {
    current: RwLock<Arc<HashMap<String, V>>>,
    writer: Mutex<()>,
}

impl<V: Clone> SnapshotMap<V> {
    pub(crate) fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(HashMap::new())),
            writer: Mutex::new(()),
        }
    }

    /// Returns the currently published map.
    pub(crate) fn load(&self) -> Arc<HashMap<String, V>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Builds a new map from the current one and publishes it.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut HashMap<String, V>) -> R) -> R {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = HashMap::clone(&self.load());
        let result = f(&mut next);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
        result
    }
}
