//! Per-set override and cache tables.
//!
//! The two tables are deliberately separate: an override is an explicit
//! correction that survives until reset, a cache entry is a derived verdict
//! that is dropped whenever anything it was derived from changes.

use crate::shape::TypeKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// An explicit per-type correction of a membership verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Override {
    Include,
    Exclude,
}

impl Override {
    pub fn verdict(self) -> bool {
        matches!(self, Override::Include)
    }

    pub fn from_verdict(verdict: bool) -> Self {
        if verdict {
            Override::Include
        } else {
            Override::Exclude
        }
    }
}

/// `TypeKey -> Override`. Absence means "no override".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: BTreeMap<TypeKey, Override>,
}

impl OverrideTable {
    pub fn get(&self, key: &TypeKey) -> Option<Override> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Set or clear the entry for `key`, returning the previous one.
    pub fn replace(&mut self, key: &TypeKey, value: Option<Override>) -> Option<Override> {
        match value {
            Some(value) => self.entries.insert(key.clone(), value),
            None => self.entries.remove(key),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeKey, Override)> {
        self.entries.iter().map(|(key, value)| (key, *value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `TypeKey -> bool`, the last computed verdict.
#[derive(Debug, Clone, Default)]
pub struct CacheTable {
    entries: HashMap<TypeKey, bool>,
}

impl CacheTable {
    pub fn get(&self, key: &TypeKey) -> Option<bool> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: TypeKey, verdict: bool) {
        self.entries.insert(key, verdict);
    }

    /// Remove the entry for `key`. Returns whether one was present.
    pub fn invalidate(&mut self, key: &TypeKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
