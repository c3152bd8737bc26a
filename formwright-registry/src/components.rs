//! Registry of host-supplied render components.

use crate::error::{RegistryError, RegistryResult};
use crate::snapshot::SnapshotMap;
use std::sync::Arc;
use tracing::debug;

/// Maps a reference key to a render handler supplied by the host.
///
/// `H` is whatever the render layer uses to draw a field; the core stores it
/// and hands it back, but never calls into it.
pub struct ComponentRegistry<H: ?Sized> {
    components: SnapshotMap<Arc<H>>,
}

impl<H: ?Sized + Send + Sync> ComponentRegistry<H> {
    /// Creates an empty component registry.
    pub fn new() -> Self {
        Self {
            components: SnapshotMap::new(),
        }
    }

    /// Registers `handler` under `key`. Last registration wins.
    pub fn register_component(&self, key: impl Into<String>, handler: Arc<H>) {
        let key = key.into();
        debug!(key = %key, "Component registered");
        self.components.update(|map| {
            map.insert(key, handler);
        });
    }

    /// Looks up a component.
    pub fn get_component(&self, key: &str) -> Option<Arc<H>> {
        self.components.load().get(key).cloned()
    }

    /// Looks up a component that the schema requires to exist.
    pub fn require_component(&self, key: &str) -> RegistryResult<Arc<H>> {
        self.get_component(key)
            .ok_or_else(|| RegistryError::UnknownComponent(key.to_string()))
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.components.load().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Removes every component.
    pub fn unregister_all(&self) {
        self.components.update(|map| map.clear());
    }
}

impl<H: ?Sized + Send + Sync> Default for ComponentRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
