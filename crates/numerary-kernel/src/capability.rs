//! Capability-set declarations.
//!
//! A capability set is a named collection of required members plus an
//! ordered list of base sets it composes. Its flattened requirements are the
//! union of its own and all of its bases', transitively. Once declared, the
//! structure never changes; only the override and cache tables mutate.

use crate::tables::{CacheTable, OverrideTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a declared capability set within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub(crate) usize);

impl SetId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of member a capability set expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Method,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub kind: MemberKind,
}

impl Requirement {
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Attribute,
        }
    }
}

/// Declaration input for [`crate::Registry::declare`].
#[derive(Debug, Clone)]
pub struct CapabilitySpec {
    pub name: String,
    pub members: Vec<Requirement>,
    pub bases: Vec<SetId>,
    /// `None` defers to the registry's configured default.
    pub caching: Option<bool>,
}

impl CapabilitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            bases: Vec::new(),
            caching: None,
        }
    }

    pub fn method(mut self, name: &str) -> Self {
        self.members.push(Requirement::method(name));
        self
    }

    pub fn methods<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(self, Self::method)
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.members.push(Requirement::attribute(name));
        self
    }

    pub fn base(mut self, base: SetId) -> Self {
        self.bases.push(base);
        self
    }

    pub fn bases(mut self, bases: impl IntoIterator<Item = SetId>) -> Self {
        self.bases.extend(bases);
        self
    }

    /// Disable (or force) verdict caching for this set only.
    pub fn caching(mut self, caching: bool) -> Self {
        self.caching = Some(caching);
        self
    }
}

/// A declared capability set with its mutable tables.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    pub(crate) id: SetId,
    pub(crate) name: String,
    pub(crate) own: BTreeMap<String, MemberKind>,
    pub(crate) required: BTreeMap<String, MemberKind>,
    pub(crate) bases: Vec<SetId>,
    pub(crate) dependents: Vec<SetId>,
    pub(crate) caching: bool,
    pub(crate) overrides: OverrideTable,
    pub(crate) cache: CacheTable,
}

impl CapabilitySet {
    pub fn id(&self) -> SetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members declared directly on this set.
    pub fn own_requirements(&self) -> impl Iterator<Item = (&str, MemberKind)> {
        self.own.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Flattened requirements across the whole composition chain.
    pub fn requirements(&self) -> impl Iterator<Item = (&str, MemberKind)> {
        self.required
            .iter()
            .map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn requires(&self, member: &str) -> bool {
        self.required.contains_key(member)
    }

    pub fn bases(&self) -> &[SetId] {
        &self.bases
    }

    /// Sets declared directly on top of this one.
    pub fn dependents(&self) -> &[SetId] {
        &self.dependents
    }

    pub fn is_caching(&self) -> bool {
        self.caching
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    pub fn cache(&self) -> &CacheTable {
        &self.cache
    }
}

/// Merge `incoming` into `into`, reporting the first member whose kind
/// disagrees.
pub(crate) fn merge_requirements<'a>(
    into: &mut BTreeMap<String, MemberKind>,
    incoming: impl IntoIterator<Item = (&'a str, MemberKind)>,
) -> Result<(), String> {
    for (name, kind) in incoming {
        match into.get(name) {
            Some(existing) if *existing != kind => return Err(name.to_string()),
            Some(_) => {}
            None => {
                into.insert(name.to_string(), kind);
            }
        }
    }
    Ok(())
}
