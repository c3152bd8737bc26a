//! The field type registry.

use crate::builtin::builtin_handlers;
use crate::error::{RegistryError, RegistryResult};
use crate::handler::FieldHandler;
use crate::snapshot::SnapshotMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

type HandlerMap = HashMap<String, Arc<dyn FieldHandler>>;

static GLOBAL: OnceLock<FieldTypeRegistry> = OnceLock::new();

/// Maps type discriminators to field handlers.
///
/// Registration is idempotent by discriminator: registering an existing
/// discriminator replaces its handler (last write wins), which is how hosts
/// override built-in types. Resolution may run concurrently with
/// registration from another thread (e.g. a hot reload).
pub struct FieldTypeRegistry {
    handlers: SnapshotMap<Arc<dyn FieldHandler>>,
}

impl FieldTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: SnapshotMap::new(),
        }
    }

    /// Creates a registry seeded with the built-in field types.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.restore_builtins();
        registry
    }

    /// Returns the process-wide registry, seeded with the built-ins on first
    /// access.
    pub fn global() -> &'static FieldTypeRegistry {
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Registers `handler` under `discriminator`, returning the handler it
    /// replaced, if any.
    pub fn register(
        &self,
        discriminator: impl Into<String>,
        handler: Arc<dyn FieldHandler>,
    ) -> Option<Arc<dyn FieldHandler>> {
        let discriminator = discriminator.into();
        let previous = self
            .handlers
            .update(|map| map.insert(discriminator.clone(), handler));
        if previous.is_some() {
            info!(discriminator = %discriminator, "Field type re-registered");
        } else {
            debug!(discriminator = %discriminator, "Field type registered");
        }
        previous
    }

    /// Resolves a discriminator to its handler.
    pub fn resolve(&self, discriminator: &str) -> RegistryResult<Arc<dyn FieldHandler>> {
        self.snapshot().resolve(discriminator)
    }

    /// Returns true if `discriminator` is registered.
    pub fn contains(&self, discriminator: &str) -> bool {
        self.handlers.load().contains_key(discriminator)
    }

    /// Returns an immutable view of the registry as of now.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            handlers: self.handlers.load(),
        }
    }

    /// Removes every registration, built-ins included.
    pub fn unregister_all(&self) {
        self.handlers.update(|map| map.clear());
        info!("Field type registry cleared");
    }

    /// Re-registers the built-in types, replacing any host overrides of them.
    pub fn restore_builtins(&self) {
        self.handlers.update(|map| {
            for (discriminator, handler) in builtin_handlers() {
                map.insert(discriminator.to_string(), handler);
            }
        });
    }

    /// Number of registered discriminators.
    pub fn len(&self) -> usize {
        self.handlers.load().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FieldTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.snapshot(), f)
    }
}

/// An immutable view of a [`FieldTypeRegistry`].
///
/// Later registrations are not visible through an existing snapshot, which
/// keeps one normalization pass consistent with itself.
#[derive(Clone)]
pub struct RegistrySnapshot {
    handlers: Arc<HandlerMap>,
}

impl RegistrySnapshot {
    /// Resolves a discriminator to its handler.
    pub fn resolve(&self, discriminator: &str) -> RegistryResult<Arc<dyn FieldHandler>> {
        self.handlers
            .get(discriminator)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownFieldType(discriminator.to_string()))
    }

    /// Returns true if `discriminator` is registered.
    pub fn contains(&self, discriminator: &str) -> bool {
        self.handlers.contains_key(discriminator)
    }

    /// Registered discriminators, sorted.
    pub fn discriminators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("discriminators", &self.discriminators())
            .finish()
    }
}
