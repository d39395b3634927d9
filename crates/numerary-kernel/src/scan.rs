//! Structural scan: the default verdict when no override applies.
//!
//! Only member presence is checked, never signatures. A type exposing a
//! same-named member with an incompatible calling convention passes; that
//! has to be corrected with an explicit exclude.

use crate::capability::{CapabilitySet, MemberKind};
use crate::shape::{Introspect, MemberSlot};

/// Outcome of scanning one type against one set's flattened requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Required members the type does not expose, in name order.
    pub missing: Vec<String>,
}

impl ScanReport {
    pub fn passed(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Whether a slot satisfies a requirement of the given kind.
///
/// A method requirement is not met by a nulled-out slot.
pub fn satisfies(kind: MemberKind, slot: MemberSlot) -> bool {
    !(kind == MemberKind::Method && slot == MemberSlot::Null)
}

pub fn scan(set: &CapabilitySet, ty: &dyn Introspect) -> ScanReport {
    let missing: Vec<String> = set
        .requirements()
        .filter(|(name, kind)| match ty.member(name) {
            Some(slot) => !satisfies(*kind, slot),
            None => true,
        })
        .map(|(name, _)| name.to_string())
        .collect();

    tracing::trace!(
        set = set.name(),
        type_key = %ty.type_key(),
        missing = missing.len(),
        "structural scan"
    );

    ScanReport { missing }
}
