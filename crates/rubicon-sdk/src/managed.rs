//! ManagedEnv trait - managed-runtime reflection operations
//!
//! Defines the reflection surface the bridge consumes from the managed
//! runtime. Every method is a one-to-one passthrough to a host operation;
//! implementations must not add logic of their own.
//!
//! A `ManagedEnv` is only valid on the thread that obtained it. Code that
//! outlives a single native call keeps a [`ManagedRuntime`] instead and
//! calls [`ManagedRuntime::attach`] on whichever thread it runs.

use crate::error::AbiResult;
use crate::handle::{ManagedArg, ObjectRef};

/// Well-known managed class and member names used by the bridge
pub mod class {
    /// Proxy handler wrapping an interpreter-side instance
    pub const PYTHON_INSTANCE: &str = "org/beeware/rubicon/PythonInstance";
    /// `long` field on the proxy handler holding the [`InstanceId`](crate::InstanceId)
    pub const INSTANCE_FIELD: &str = "instance";
    /// Reflective method descriptor
    pub const METHOD: &str = "java/lang/reflect/Method";
    /// `Method.getName()` signature
    pub const GET_NAME_SIGNATURE: &str = "()Ljava/lang/String;";
    /// Boxed boolean
    pub const BOOLEAN: &str = "java/lang/Boolean";
    /// Field signature of `Boolean.TRUE` / `Boolean.FALSE`
    pub const BOOLEAN_SIGNATURE: &str = "Ljava/lang/Boolean;";
    /// Boxed 32-bit integer
    pub const INTEGER: &str = "java/lang/Integer";
    /// Boxed 64-bit integer
    pub const LONG: &str = "java/lang/Long";
    /// Unchecked exception thrown when dispatch failures are raised
    pub const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";
}

/// Thread-bound reflection facade over the managed runtime.
///
/// The bridge programs against `&dyn ManagedEnv` so the trampoline never
/// depends on a particular binding. Object arguments and results are
/// [`ObjectRef`] handles owned by the implementation.
pub trait ManagedEnv {
    // ========================================================================
    // Fields
    // ========================================================================

    /// Read a `long` instance field by name
    fn get_long_field(&self, obj: ObjectRef, name: &str) -> AbiResult<i64>;

    /// Read a static reference field
    fn get_static_object_field(
        &self,
        class: &str,
        name: &str,
        signature: &str,
    ) -> AbiResult<ObjectRef>;

    // ========================================================================
    // Methods and construction
    // ========================================================================

    /// Call an instance method returning a reference
    fn call_object_method(
        &self,
        obj: ObjectRef,
        name: &str,
        signature: &str,
        args: &[ManagedArg],
    ) -> AbiResult<ObjectRef>;

    /// Construct a new object with the constructor matching `signature`
    fn new_object(&self, class: &str, signature: &str, args: &[ManagedArg])
        -> AbiResult<ObjectRef>;

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Length of an object array
    fn array_length(&self, array: ObjectRef) -> AbiResult<usize>;

    /// Element of an object array
    fn array_element(&self, array: ObjectRef, index: usize) -> AbiResult<ObjectRef>;

    // ========================================================================
    // Strings
    // ========================================================================

    /// Decode a managed string into UTF-8
    fn get_string(&self, string: ObjectRef) -> AbiResult<String>;

    /// Encode UTF-8 text as a new managed string
    fn new_string(&self, value: &str) -> AbiResult<ObjectRef>;

    // ========================================================================
    // Identity and exceptions
    // ========================================================================

    /// Reference identity, not `equals()`
    fn is_same_object(&self, a: ObjectRef, b: ObjectRef) -> AbiResult<bool>;

    /// Raise a new exception of `class` on the calling managed thread
    fn throw_new(&self, class: &str, message: &str) -> AbiResult<()>;
}

/// Handle to a managed runtime that outlives any single call.
///
/// This is what the bridge session keeps between calls. It never caches a
/// thread-bound environment: each caller attaches on its own thread.
pub trait ManagedRuntime: Send + Sync {
    /// Obtain an environment valid for the current thread, attaching the
    /// thread to the runtime if needed
    fn attach(&self) -> AbiResult<Box<dyn ManagedEnv + '_>>;
}
