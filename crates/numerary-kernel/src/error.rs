//! Error types for numerary kernel operations.

use crate::capability::SetId;
use crate::shape::TypeKey;

/// Errors raised by declarations, override mutations and configuration.
///
/// Membership queries never produce one of these.
#[derive(Debug, thiserror::Error)]
pub enum NumeraryError {
    /// A `SetId` that this registry never issued.
    #[error("unknown capability set: {0}")]
    UnknownSet(SetId),

    #[error("unknown capability set name: {0}")]
    UnknownSetName(String),

    #[error("capability set already declared: {0}")]
    DuplicateName(String),

    #[error("base {base} listed more than once in declaration of {name}")]
    DuplicateBase { name: String, base: String },

    /// One source requires a method where another requires an attribute.
    #[error("member {member} of {name} is required both as a method and as an attribute")]
    MemberKindConflict { name: String, member: String },

    /// Bases of `set` disagree on an override for `type_key`.
    #[error(
        "conflicting overrides for {type_key} reaching {set}: {including} includes it, {excluding} excludes it"
    )]
    ConflictingOverrides {
        set: String,
        type_key: TypeKey,
        including: String,
        excluding: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid toml configuration: {source}")]
    ParseConfig {
        #[source]
        source: toml::de::Error,
    },
}

impl NumeraryError {
    /// Whether this error is a composition/override conflict.
    pub fn is_configuration_conflict(&self) -> bool {
        matches!(
            self,
            NumeraryError::ConflictingOverrides { .. } | NumeraryError::MemberKindConflict { .. }
        )
    }
}
