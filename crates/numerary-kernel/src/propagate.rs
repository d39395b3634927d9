//! Override deference and invalidation across the composition graph.
//!
//! A set without its own override for a type defers to its bases in
//! declaration order; the first base whose chain yields an override decides.
//! A set with its own override shields everything composed on top of it that
//! only reaches the changed set through it.

use crate::capability::{CapabilitySet, SetId};
use crate::shape::TypeKey;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The override a set ends up with for one type, and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChainOverride {
    pub verdict: bool,
    pub source: SetId,
}

/// Two bases of `set` yield different overrides for the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BaseConflict {
    pub set: SetId,
    pub including: SetId,
    pub excluding: SetId,
}

pub(crate) type ChainMemo = BTreeMap<SetId, Option<ChainOverride>>;

/// Resolve the override `id` inherits for `key`, if any.
///
/// `memo` must only be shared between calls for the same `key` and the
/// same override state.
pub(crate) fn chain_override(
    sets: &[CapabilitySet],
    id: SetId,
    key: &TypeKey,
    memo: &mut ChainMemo,
) -> Option<ChainOverride> {
    if let Some(hit) = memo.get(&id) {
        return *hit;
    }

    let set = &sets[id.0];
    let resolved = match set.overrides.get(key) {
        Some(value) => Some(ChainOverride {
            verdict: value.verdict(),
            source: id,
        }),
        None => set
            .bases
            .iter()
            .find_map(|base| chain_override(sets, *base, key, memo)),
    };

    memo.insert(id, resolved);
    resolved
}

/// Check whether the bases of `id` disagree on `key`.
///
/// A set holding its own override never conflicts.
pub(crate) fn base_conflict(
    sets: &[CapabilitySet],
    id: SetId,
    key: &TypeKey,
    memo: &mut ChainMemo,
) -> Option<BaseConflict> {
    let set = &sets[id.0];
    if set.overrides.contains(key) {
        return None;
    }

    let mut first: Option<ChainOverride> = None;
    for base in &set.bases {
        let Some(found) = chain_override(sets, *base, key, memo) else {
            continue;
        };
        match first {
            None => first = Some(found),
            Some(prev) if prev.verdict != found.verdict => {
                let (including, excluding) = if prev.verdict {
                    (prev.source, found.source)
                } else {
                    (found.source, prev.source)
                };
                return Some(BaseConflict {
                    set: id,
                    including,
                    excluding,
                });
            }
            Some(_) => {}
        }
    }
    None
}

/// Sets whose verdict for `key` can change when `id`'s override does.
///
/// Always starts with `id`. Dependents holding their own override for `key`
/// are neither included nor descended into. Each set appears once.
pub(crate) fn affected(sets: &[CapabilitySet], id: SetId, key: &TypeKey) -> Vec<SetId> {
    let mut visited = BTreeSet::from([id]);
    let mut out = vec![id];
    let mut queue: VecDeque<SetId> = sets[id.0].dependents.iter().copied().collect();

    while let Some(next) = queue.pop_front() {
        if !visited.insert(next) {
            continue;
        }
        let set = &sets[next.0];
        if set.overrides.contains(key) {
            continue;
        }
        out.push(next);
        queue.extend(set.dependents.iter().copied());
    }

    out
}

/// All sets `id` composes, directly or transitively.
pub(crate) fn ancestors(sets: &[CapabilitySet], id: SetId) -> BTreeSet<SetId> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<SetId> = sets[id.0].bases.clone();
    while let Some(next) = stack.pop() {
        if seen.insert(next) {
            stack.extend(sets[next.0].bases.iter().copied());
        }
    }
    seen
}

/// All sets composed on top of `id`, directly or transitively.
pub(crate) fn descendants(sets: &[CapabilitySet], id: SetId) -> BTreeSet<SetId> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<SetId> = sets[id.0].dependents.clone();
    while let Some(next) = stack.pop() {
        if seen.insert(next) {
            stack.extend(sets[next.0].dependents.iter().copied());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySpec;
    use crate::registry::Registry;

    /// `Top` composes `Left` and `Right`, both of which compose `Root`.
    fn diamond() -> (Registry, [SetId; 4]) {
        let mut registry = Registry::default();
        let root = registry
            .declare(CapabilitySpec::new("Root").method("root"))
            .expect("root");
        let left = registry
            .declare(CapabilitySpec::new("Left").method("left").base(root))
            .expect("left");
        let right = registry
            .declare(CapabilitySpec::new("Right").method("right").base(root))
            .expect("right");
        let top = registry
            .declare(CapabilitySpec::new("Top").bases([left, right]))
            .expect("top");
        (registry, [root, left, right, top])
    }

    #[test]
    fn affected_visits_diamond_once() {
        let (registry, [root, left, right, top]) = diamond();
        let key = TypeKey::new("T");

        let out = affected(registry.sets(), root, &key);
        assert_eq!(out, vec![root, left, right, top]);
    }

    #[test]
    fn affected_stops_at_shielded_dependents() {
        let (mut registry, [root, left, right, top]) = diamond();
        let key = TypeKey::new("T");
        registry.include(left, &key).expect("include left");

        let out = affected(registry.sets(), root, &key);
        assert_eq!(out, vec![root, right, top]);

        registry.include(right, &key).expect("include right");
        let out = affected(registry.sets(), root, &key);
        assert_eq!(out, vec![root]);
    }

    #[test]
    fn chain_override_prefers_first_declared_base() {
        let (mut registry, [root, left, _right, top]) = diamond();
        let key = TypeKey::new("T");
        registry.exclude(root, &key).expect("exclude root");

        let mut memo = ChainMemo::new();
        let found = chain_override(registry.sets(), top, &key, &mut memo).expect("inherited");
        assert_eq!(found.source, root);
        assert!(!found.verdict);

        registry.exclude(left, &key).expect("exclude left agrees");
        let mut memo = ChainMemo::new();
        let found = chain_override(registry.sets(), top, &key, &mut memo).expect("inherited");
        assert_eq!(found.source, left);
    }

    #[test]
    fn ancestors_and_descendants_are_transitive() {
        let (registry, [root, left, right, top]) = diamond();
        assert_eq!(
            ancestors(registry.sets(), top),
            BTreeSet::from([root, left, right])
        );
        assert_eq!(
            descendants(registry.sets(), root),
            BTreeSet::from([left, right, top])
        );
        assert!(ancestors(registry.sets(), root).is_empty());
    }
}
