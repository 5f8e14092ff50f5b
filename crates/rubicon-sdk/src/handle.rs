//! Opaque handles crossing the runtime boundary
//!
//! Neither side ever sees the other's object representation. The managed
//! runtime sees interpreter objects as an [`InstanceId`] stored on a proxy;
//! the interpreter sees managed objects as an [`ObjectRef`] number which its
//! own handle table resolves back into an object.

use std::fmt;

/// Identifier of an interpreter-side instance.
///
/// Stored by the managed proxy in a `long` field, so it is always 64 bits
/// wide regardless of the platform's native integer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(i64);

impl InstanceId {
    /// Wrap a raw identifier
    pub const fn new(raw: i64) -> Self {
        InstanceId(raw)
    }

    /// The raw 64-bit identifier
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for InstanceId {
    fn from(raw: i64) -> Self {
        InstanceId(raw)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference into the managed runtime's object space.
///
/// The numeric value is only meaningful to the runtime binding that produced
/// it (for JNI, a local or global reference). Zero is the null reference.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectRef(u64);

impl ObjectRef {
    /// The null reference
    pub const NULL: ObjectRef = ObjectRef(0);

    /// Wrap a raw reference value
    pub const fn from_raw(raw: u64) -> Self {
        ObjectRef(raw)
    }

    /// The raw reference value
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Check if this is the null reference
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `None` for the null reference
    pub fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectRef::Null")
        } else {
            write!(f, "ObjectRef({:#x})", self.0)
        }
    }
}

/// Argument passed to a managed constructor or method through the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedArg {
    /// `boolean` (Z)
    Bool(bool),
    /// `int` (I)
    Int(i32),
    /// `long` (J)
    Long(i64),
    /// Any reference type (L...;)
    Object(ObjectRef),
}
