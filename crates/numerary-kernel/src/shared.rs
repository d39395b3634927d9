//! A registry handle for multi-threaded hosts.
//!
//! Every operation takes the lock for its whole duration: a query's cache
//! check, computation and cache write happen together, and so do a
//! mutation's override write, validation and invalidation sweep. A verdict
//! cached by one thread can therefore never outlive an invalidation issued
//! by another.

use crate::capability::{CapabilitySpec, SetId};
use crate::config::{EngineConfig, OverrideRule};
use crate::error::NumeraryError;
use crate::registry::{MembershipStats, OverrideOutcome, Registry, Verdict};
use crate::shape::{Introspect, TypeKey};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self::from_registry(Registry::new(config))
    }

    pub fn from_registry(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn declare(&self, spec: CapabilitySpec) -> Result<SetId, NumeraryError> {
        self.inner.lock().declare(spec)
    }

    pub fn find(&self, name: &str) -> Option<SetId> {
        self.inner.lock().find(name)
    }

    pub fn is_member(&self, id: SetId, ty: &dyn Introspect) -> bool {
        self.inner.lock().is_member(id, ty)
    }

    pub fn explain(&self, id: SetId, ty: &dyn Introspect) -> Option<Verdict> {
        self.inner.lock().explain(id, ty)
    }

    pub fn include(&self, id: SetId, key: &TypeKey) -> Result<OverrideOutcome, NumeraryError> {
        self.inner.lock().include(id, key)
    }

    pub fn exclude(&self, id: SetId, key: &TypeKey) -> Result<OverrideOutcome, NumeraryError> {
        self.inner.lock().exclude(id, key)
    }

    pub fn reset_for(&self, id: SetId, key: &TypeKey) -> Result<OverrideOutcome, NumeraryError> {
        self.inner.lock().reset_for(id, key)
    }

    pub fn apply_rules(&self, rules: &[OverrideRule]) -> Result<usize, NumeraryError> {
        self.inner.lock().apply_rules(rules)
    }

    pub fn stats(&self) -> MembershipStats {
        self.inner.lock().stats()
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
