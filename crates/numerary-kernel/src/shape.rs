//! Concrete types as the engine sees them.
//!
//! The engine never inspects values directly. It only needs two things from
//! its environment:
//! 1. an identity token for the concrete type (the cache/override key);
//! 2. the ability to ask whether a named member is exposed on that type.
//!
//! [`Introspect`] is that adapter. [`TypeDescriptor`] is the table-driven
//! implementation used when no reflection is available.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identity of a concrete type.
///
/// Two candidates with the same key share cache and override entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(pub String);

impl TypeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key derived from a Rust type's name.
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TypeKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How a member is present on a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberSlot {
    /// A callable (method, function-valued attribute).
    Callable,
    /// A non-callable attribute or property.
    Value,
    /// Present but explicitly nulled out (e.g. `__hash__ = None`).
    Null,
}

/// Environment adapter consumed by the structural scan.
pub trait Introspect {
    /// Identity of the concrete type.
    fn type_key(&self) -> TypeKey;

    /// The slot for `name`, or `None` if the type does not expose it.
    fn member(&self, name: &str) -> Option<MemberSlot>;
}

/// A value that can report its own concrete type.
pub trait Typed {
    fn concrete_type(&self) -> &TypeDescriptor;
}

/// Table-driven description of a concrete type's members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub key: TypeKey,
    #[serde(default)]
    pub members: BTreeMap<String, MemberSlot>,
}

impl TypeDescriptor {
    pub fn new(key: impl Into<TypeKey>) -> Self {
        Self {
            key: key.into(),
            members: BTreeMap::new(),
        }
    }

    /// Descriptor keyed by a Rust type's name.
    pub fn of<T: ?Sized>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    pub fn method(self, name: &str) -> Self {
        self.slot(name, MemberSlot::Callable)
    }

    pub fn methods<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(self, Self::method)
    }

    pub fn attribute(self, name: &str) -> Self {
        self.slot(name, MemberSlot::Value)
    }

    /// Expose `name` but null it out.
    pub fn null(self, name: &str) -> Self {
        self.slot(name, MemberSlot::Null)
    }

    pub fn slot(mut self, name: &str, slot: MemberSlot) -> Self {
        self.members.insert(name.to_string(), slot);
        self
    }
}

impl Introspect for TypeDescriptor {
    fn type_key(&self) -> TypeKey {
        self.key.clone()
    }

    fn member(&self, name: &str) -> Option<MemberSlot> {
        self.members.get(name).copied()
    }
}

impl<T: Introspect + ?Sized> Introspect for &T {
    fn type_key(&self) -> TypeKey {
        (**self).type_key()
    }

    fn member(&self, name: &str) -> Option<MemberSlot> {
        (**self).member(name)
    }
}
