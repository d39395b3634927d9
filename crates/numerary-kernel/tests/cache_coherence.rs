//! Property tests over random override/query sequences.
//!
//! The lattice is fixed:
//!
//! ```text
//!   A   B   C
//!    \ / \ /
//!    AB   BC
//!     \   /
//!      ABC
//! ```

use numerary_kernel::{
    CapabilitySpec, ConflictPolicy, EngineConfig, Override, Registry, SetId, TypeDescriptor,
};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Check,
    Include,
    Exclude,
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Check),
        Just(Op::Include),
        Just(Op::Exclude),
        Just(Op::Reset),
    ]
}

fn lattice(policy: ConflictPolicy) -> (Registry, Vec<SetId>) {
    let mut registry = Registry::new(EngineConfig {
        conflict_policy: policy,
        ..EngineConfig::default()
    });
    let a = registry
        .declare(CapabilitySpec::new("A").method("a"))
        .expect("A");
    let b = registry
        .declare(CapabilitySpec::new("B").method("b"))
        .expect("B");
    let c = registry
        .declare(CapabilitySpec::new("C").attribute("c"))
        .expect("C");
    let ab = registry
        .declare(CapabilitySpec::new("AB").method("ab").bases([a, b]))
        .expect("AB");
    let bc = registry
        .declare(CapabilitySpec::new("BC").bases([b, c]))
        .expect("BC");
    let abc = registry
        .declare(CapabilitySpec::new("ABC").bases([ab, bc]))
        .expect("ABC");
    (registry, vec![a, b, c, ab, bc, abc])
}

fn types() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::new("Bare"),
        TypeDescriptor::new("Ab").methods(["a", "b", "ab"]),
        TypeDescriptor::new("Full")
            .methods(["a", "b", "ab"])
            .attribute("c"),
        TypeDescriptor::new("NullA")
            .null("a")
            .methods(["b", "ab"])
            .null("c"),
    ]
}

fn apply(registry: &mut Registry, op: Op, id: SetId, ty: &TypeDescriptor) {
    // Rejected mutations leave the state untouched, which is what the
    // coherence check below verifies either way.
    let _ = match op {
        Op::Check => {
            registry.is_member(id, ty);
            return;
        }
        Op::Include => registry.include(id, &ty.key),
        Op::Exclude => registry.exclude(id, &ty.key),
        Op::Reset => registry.reset_for(id, &ty.key),
    };
}

fn assert_coherent(registry: &mut Registry, sets: &[SetId], types: &[TypeDescriptor]) {
    for &id in sets {
        for ty in types {
            let fresh = registry.explain(id, ty).expect("declared").member;
            if let Some(cached) = registry.cached(id, &ty.key) {
                assert_eq!(cached, fresh, "stale cache for {} in {id}", ty.key);
            }
            assert_eq!(registry.is_member(id, ty), fresh);
        }
    }
}

fn policy() -> impl Strategy<Value = ConflictPolicy> {
    prop_oneof![Just(ConflictPolicy::Reject), Just(ConflictPolicy::FirstDeclared)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn cached_verdicts_match_recomputation(
        policy in policy(),
        steps in prop::collection::vec((op(), 0usize..6, 0usize..4), 1..40),
    ) {
        let (mut registry, sets) = lattice(policy);
        let types = types();
        for (op, set, ty) in steps {
            apply(&mut registry, op, sets[set], &types[ty]);
            assert_coherent(&mut registry, &sets, &types);
        }
    }

    #[test]
    fn overrides_are_idempotent(
        policy in policy(),
        prefix in prop::collection::vec((op(), 0usize..6, 0usize..4), 0..20),
        last in (op(), 0usize..6, 0usize..4),
    ) {
        let (mut once, sets) = lattice(policy);
        let types = types();
        for (op, set, ty) in prefix {
            apply(&mut once, op, sets[set], &types[ty]);
        }
        let mut twice = once.clone();

        let (op, set, ty) = last;
        apply(&mut once, op, sets[set], &types[ty]);
        apply(&mut twice, op, sets[set], &types[ty]);
        apply(&mut twice, op, sets[set], &types[ty]);

        for &id in &sets {
            for ty in &types {
                prop_assert_eq!(once.override_for(id, &ty.key), twice.override_for(id, &ty.key));
                prop_assert_eq!(once.is_member(id, ty), twice.is_member(id, ty));
            }
        }
    }

    #[test]
    fn own_override_wins(
        prefix in prop::collection::vec((op(), 0usize..6, 0usize..4), 0..20),
        set in 0usize..6,
        ty in 0usize..4,
        include in any::<bool>(),
    ) {
        let (mut registry, sets) = lattice(ConflictPolicy::Reject);
        let types = types();
        for (op, set, ty) in prefix {
            apply(&mut registry, op, sets[set], &types[ty]);
        }

        let (id, ty) = (sets[set], &types[ty]);
        let outcome = if include {
            registry.include(id, &ty.key)
        } else {
            registry.exclude(id, &ty.key)
        };
        if outcome.is_ok() {
            let expected = if include { Override::Include } else { Override::Exclude };
            prop_assert_eq!(registry.override_for(id, &ty.key), Some(expected));
            prop_assert_eq!(registry.is_member(id, ty), include);
        }
    }
}
