//! The caching/override membership engine.
//!
//! A [`Registry`] owns every declared capability set together with its
//! override and cache tables. It is an explicit object rather than ambient
//! global state: build one at start-up, declare the catalog, feed in the
//! override data, then query it for the life of the process.
//!
//! ## Query
//!
//! ```text
//! is_member(S, T)
//!     │ S.cache[T]?            → hit
//!     │ S.overrides[T]?        → include / exclude
//!     │ bases, declared order  → first chain override
//!     │ structural scan        → all flattened members exposed
//!     └ cache (if S caches)
//! ```
//!
//! ## Mutation
//!
//! `include` / `exclude` / `reset_for` on `S` for `T` rewrite `S.overrides[T]`
//! and drop the cached verdict for `T` on `S` and on every dependent that
//! does not hold its own override for `T`.

use crate::capability::{CapabilitySet, CapabilitySpec, SetId, merge_requirements};
use crate::config::{ConflictPolicy, EngineConfig, OverrideRule, RuleAction};
use crate::error::NumeraryError;
use crate::propagate::{self, BaseConflict, ChainMemo};
use crate::scan::scan;
use crate::shape::{Introspect, TypeKey, Typed};
use crate::tables::{CacheTable, Override, OverrideTable};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Counters for the query path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipStats {
    pub hits: u64,
    pub misses: u64,
    pub scans: u64,
}

/// Where a verdict came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictSource {
    /// An explicit override on `set` (the queried set or one it composes).
    Override { set: String, action: Override },
    /// The structural scan; `missing` is empty iff the scan passed.
    Structural { missing: Vec<String> },
}

/// A from-scratch membership verdict with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub set: String,
    pub type_key: TypeKey,
    pub member: bool,
    pub source: VerdictSource,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = if self.member { "is" } else { "is not" };
        write!(f, "{} {relation} a member of {}", self.type_key, self.set)?;
        match &self.source {
            VerdictSource::Override { set, action } => {
                let verb = match action {
                    Override::Include => "included",
                    Override::Exclude => "excluded",
                };
                write!(f, " ({verb} by {set})")
            }
            VerdictSource::Structural { missing } if missing.is_empty() => {
                write!(f, " (structural)")
            }
            VerdictSource::Structural { missing } => {
                write!(f, " (structural, missing: {})", missing.join(", "))
            }
        }
    }
}

/// Result of one override mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideOutcome {
    /// The set's override entry before the mutation.
    pub previous: Option<Override>,
    /// Sets whose verdict for the type may have changed, the target first.
    pub affected: Vec<SetId>,
    /// Cached verdicts actually removed.
    pub invalidated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    config: EngineConfig,
    sets: Vec<CapabilitySet>,
    names: BTreeMap<String, SetId>,
    stats: MembershipStats,
}

impl Registry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Declaration ──────────────────────────────────────────────────────

    /// Declare a new capability set on top of already declared bases.
    pub fn declare(&mut self, spec: CapabilitySpec) -> Result<SetId, NumeraryError> {
        let CapabilitySpec {
            name,
            members,
            bases,
            caching,
        } = spec;

        if self.names.contains_key(&name) {
            return Err(NumeraryError::DuplicateName(name));
        }

        let mut seen = BTreeSet::new();
        for base in &bases {
            let base_set = self
                .sets
                .get(base.0)
                .ok_or(NumeraryError::UnknownSet(*base))?;
            if !seen.insert(*base) {
                return Err(NumeraryError::DuplicateBase {
                    name,
                    base: base_set.name.clone(),
                });
            }
        }

        let mut own = BTreeMap::new();
        let own_members = members.iter().map(|req| (req.name.as_str(), req.kind));
        if let Err(member) = merge_requirements(&mut own, own_members) {
            return Err(NumeraryError::MemberKindConflict { name, member });
        }
        let mut required = own.clone();
        for base in &bases {
            let inherited = self.sets[base.0].requirements();
            if let Err(member) = merge_requirements(&mut required, inherited) {
                return Err(NumeraryError::MemberKindConflict { name, member });
            }
        }

        let id = SetId(self.sets.len());
        self.sets.push(CapabilitySet {
            id,
            name,
            own,
            required,
            bases,
            dependents: Vec::new(),
            caching: caching.unwrap_or(self.config.cache_verdicts),
            overrides: OverrideTable::default(),
            cache: CacheTable::default(),
        });

        if self.config.conflict_policy == ConflictPolicy::Reject {
            if let Some(err) = self.declaration_conflict(id) {
                self.sets.pop();
                return Err(err);
            }
        }

        for base in self.sets[id.0].bases.clone() {
            self.sets[base.0].dependents.push(id);
        }
        let set = &self.sets[id.0];
        self.names.insert(set.name.clone(), id);
        tracing::debug!(
            set = %set.name,
            id = %id,
            bases = set.bases.len(),
            required = set.required.len(),
            caching = set.caching,
            "declared capability set"
        );
        Ok(id)
    }

    /// Look for a type on which the (just pushed) set's bases already
    /// disagree.
    fn declaration_conflict(&self, id: SetId) -> Option<NumeraryError> {
        let keys: BTreeSet<&TypeKey> = propagate::ancestors(&self.sets, id)
            .into_iter()
            .flat_map(|ancestor| self.sets[ancestor.0].overrides.keys())
            .collect();

        keys.into_iter().find_map(|key| {
            let mut memo = ChainMemo::new();
            propagate::base_conflict(&self.sets, id, key, &mut memo)
                .map(|conflict| self.conflict_error(conflict, key))
        })
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    pub fn find(&self, name: &str) -> Option<SetId> {
        self.names.get(name).copied()
    }

    pub fn set(&self, id: SetId) -> Option<&CapabilitySet> {
        self.sets.get(id.0)
    }

    pub fn name(&self, id: SetId) -> Option<&str> {
        self.set(id).map(CapabilitySet::name)
    }

    /// Declared sets in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CapabilitySet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub(crate) fn sets(&self) -> &[CapabilitySet] {
        &self.sets
    }

    /// Every set composed on top of `id`, transitively.
    pub fn dependents_of(&self, id: SetId) -> Vec<SetId> {
        if self.set(id).is_none() {
            return Vec::new();
        }
        propagate::descendants(&self.sets, id).into_iter().collect()
    }

    /// The set's own override for `key` (not an inherited one).
    pub fn override_for(&self, id: SetId, key: &TypeKey) -> Option<Override> {
        self.set(id).and_then(|set| set.overrides.get(key))
    }

    pub fn cached(&self, id: SetId, key: &TypeKey) -> Option<bool> {
        self.set(id).and_then(|set| set.cache.get(key))
    }

    pub fn stats(&self) -> MembershipStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MembershipStats::default();
    }

    // ── Query ────────────────────────────────────────────────────────────

    /// Whether `ty` is a member of set `id`.
    ///
    /// Never fails: an id this registry did not issue yields `false`.
    pub fn is_member(&mut self, id: SetId, ty: &dyn Introspect) -> bool {
        let key = ty.type_key();
        let Some(set) = self.sets.get(id.0) else {
            tracing::warn!(id = %id, type_key = %key, "membership query on unknown set");
            return false;
        };

        if let Some(verdict) = set.cache.get(&key) {
            self.stats.hits += 1;
            return verdict;
        }

        self.stats.misses += 1;
        let verdict = self.evaluate(id, &key, ty);
        if matches!(verdict.source, VerdictSource::Structural { .. }) {
            self.stats.scans += 1;
        }

        let set = &mut self.sets[id.0];
        if set.caching {
            set.cache.insert(key, verdict.member);
        }
        verdict.member
    }

    /// Membership of a value that knows its own concrete type.
    pub fn is_member_of_value(&mut self, id: SetId, value: &dyn Typed) -> bool {
        self.is_member(id, value.concrete_type())
    }

    /// Recompute the verdict from scratch, with provenance.
    ///
    /// Reads neither the cache nor the stats and writes neither.
    pub fn explain(&self, id: SetId, ty: &dyn Introspect) -> Option<Verdict> {
        self.set(id)?;
        Some(self.evaluate(id, &ty.type_key(), ty))
    }

    fn evaluate(&self, id: SetId, key: &TypeKey, ty: &dyn Introspect) -> Verdict {
        let set = &self.sets[id.0];
        let mut memo = ChainMemo::new();

        if let Some(conflict) = propagate::base_conflict(&self.sets, id, key, &mut memo) {
            tracing::warn!(
                set = %set.name,
                type_key = %key,
                including = %self.sets[conflict.including.0].name,
                excluding = %self.sets[conflict.excluding.0].name,
                "bases disagree; first declared base decides"
            );
        }

        let source = match propagate::chain_override(&self.sets, id, key, &mut memo) {
            Some(found) => VerdictSource::Override {
                set: self.sets[found.source.0].name.clone(),
                action: Override::from_verdict(found.verdict),
            },
            None => VerdictSource::Structural {
                missing: scan(set, ty).missing,
            },
        };
        let member = match &source {
            VerdictSource::Override { action, .. } => action.verdict(),
            VerdictSource::Structural { missing } => missing.is_empty(),
        };

        Verdict {
            set: set.name.clone(),
            type_key: key.clone(),
            member,
            source,
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Force `key` to be a member of `id`.
    pub fn include(&mut self, id: SetId, key: &TypeKey) -> Result<OverrideOutcome, NumeraryError> {
        self.set_override(id, key, Some(Override::Include))
    }

    /// Force `key` not to be a member of `id`.
    pub fn exclude(&mut self, id: SetId, key: &TypeKey) -> Result<OverrideOutcome, NumeraryError> {
        self.set_override(id, key, Some(Override::Exclude))
    }

    /// Drop any override `id` holds for `key`, restoring deference to the
    /// bases and the structural scan.
    pub fn reset_for(
        &mut self,
        id: SetId,
        key: &TypeKey,
    ) -> Result<OverrideOutcome, NumeraryError> {
        self.set_override(id, key, None)
    }

    fn set_override(
        &mut self,
        id: SetId,
        key: &TypeKey,
        value: Option<Override>,
    ) -> Result<OverrideOutcome, NumeraryError> {
        if self.set(id).is_none() {
            return Err(NumeraryError::UnknownSet(id));
        }

        let previous = self.sets[id.0].overrides.replace(key, value);
        let affected = propagate::affected(&self.sets, id, key);

        if self.config.conflict_policy == ConflictPolicy::Reject {
            let mut memo = ChainMemo::new();
            let conflict = affected.iter().find_map(|candidate| {
                propagate::base_conflict(&self.sets, *candidate, key, &mut memo)
            });
            if let Some(conflict) = conflict {
                self.sets[id.0].overrides.replace(key, previous);
                return Err(self.conflict_error(conflict, key));
            }
        }

        let mut invalidated = 0;
        for candidate in &affected {
            if self.sets[candidate.0].cache.invalidate(key) {
                invalidated += 1;
            }
        }

        tracing::debug!(
            set = %self.sets[id.0].name,
            type_key = %key,
            action = ?value,
            affected = affected.len(),
            invalidated,
            "override updated"
        );

        Ok(OverrideOutcome {
            previous,
            affected,
            invalidated,
        })
    }

    /// Apply override rules in order, addressing sets by name.
    ///
    /// Stops at the first failing rule; earlier rules stay applied.
    pub fn apply_rules(&mut self, rules: &[OverrideRule]) -> Result<usize, NumeraryError> {
        for rule in rules {
            let id = self
                .find(&rule.set)
                .ok_or_else(|| NumeraryError::UnknownSetName(rule.set.clone()))?;
            match rule.action {
                RuleAction::Include => self.include(id, &rule.type_key)?,
                RuleAction::Exclude => self.exclude(id, &rule.type_key)?,
                RuleAction::Reset => self.reset_for(id, &rule.type_key)?,
            };
        }
        Ok(rules.len())
    }

    /// Apply the `overrides` carried by this registry's configuration.
    pub fn apply_configured_overrides(&mut self) -> Result<usize, NumeraryError> {
        let rules = self.config.overrides.clone();
        self.apply_rules(&rules)
    }

    /// Drop every cached verdict of `id`; overrides are untouched.
    pub fn clear_cache(&mut self, id: SetId) -> Result<usize, NumeraryError> {
        let set = self
            .sets
            .get_mut(id.0)
            .ok_or(NumeraryError::UnknownSet(id))?;
        Ok(set.cache.clear())
    }

    pub fn clear_all_caches(&mut self) -> usize {
        self.sets.iter_mut().map(|set| set.cache.clear()).sum()
    }

    fn conflict_error(&self, conflict: BaseConflict, key: &TypeKey) -> NumeraryError {
        NumeraryError::ConflictingOverrides {
            set: self.sets[conflict.set.0].name.clone(),
            type_key: key.clone(),
            including: self.sets[conflict.including.0].name.clone(),
            excluding: self.sets[conflict.excluding.0].name.clone(),
        }
    }
}
