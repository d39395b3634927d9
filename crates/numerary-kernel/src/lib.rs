//! # Numerary Kernel
//!
//! Runtime-checkable structural capability sets with a caching and override
//! layer: "does this concrete type expose everything capability set S
//! requires?" is answered once per (type, set) pair, remembered, and can be
//! corrected per type when a type structurally matches but misbehaves (or
//! the reverse).
//!
//! This crate is **catalog-agnostic**: it does not declare any numeric
//! capability sets itself. It only prescribes how membership is decided,
//! cached, overridden and invalidated across composed sets.
//!
//! ## Architecture
//!
//! ```text
//! Introspect / TypeDescriptor  ← What a concrete type exposes
//!     │
//! CapabilitySet                ← Required members + ordered bases
//!     │
//! OverrideTable / CacheTable   ← Explicit corrections vs derived verdicts
//!     │
//! Registry                     ← declare, is_member, include/exclude/reset_for
//!     │
//! SharedRegistry               ← Same operations behind one lock
//! ```
//!
//! ## Limitations
//!
//! The structural scan matches member *names* only. A type exposing a
//! same-named member with another calling convention is reported as a
//! member; use [`Registry::exclude`] to correct it. Likewise nothing checks
//! that a type's nominal claims are backed by real members.

pub mod capability;
pub mod config;
pub mod error;
mod propagate;
pub mod registry;
pub mod scan;
pub mod shape;
pub mod shared;
pub mod tables;

pub use capability::{CapabilitySet, CapabilitySpec, MemberKind, Requirement, SetId};
pub use config::{ConflictPolicy, EngineConfig, OverrideRule, RuleAction};
pub use error::NumeraryError;
pub use registry::{MembershipStats, OverrideOutcome, Registry, Verdict, VerdictSource};
pub use shape::{Introspect, MemberSlot, TypeDescriptor, TypeKey, Typed};
pub use shared::SharedRegistry;
pub use tables::Override;
