//! Rubicon SDK - boundary vocabulary for the Rubicon bridge
//!
//! This crate holds the types that cross between the managed runtime (a JVM
//! hosting reflective objects) and the embedded interpreter, without
//! depending on either runtime's bindings:
//!
//! - [`InstanceId`] and [`ObjectRef`]: opaque numeric handles
//! - [`ManagedEnv`] / [`ManagedRuntime`]: thin reflection facade over the
//!   managed runtime, one method per host operation
//! - [`Interpreter`] / [`ScriptScope`]: thin facade over the interpreter
//!   embedding API, with scoped acquisition of its execution lock
//! - [`ScriptValue`] / [`ScriptReturn`]: values marshaled into the
//!   interpreter and the classified result coming back
//!
//! # Example
//!
//! ```ignore
//! use rubicon_sdk::{ManagedEnv, ObjectRef, class};
//!
//! fn instance_of(env: &dyn ManagedEnv, proxy: ObjectRef) -> rubicon_sdk::AbiResult<i64> {
//!     env.get_long_field(proxy, class::INSTANCE_FIELD)
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod handle;
pub mod managed;
pub mod script;

pub use error::{AbiResult, NativeError};
pub use handle::{InstanceId, ManagedArg, ObjectRef};
pub use managed::{class, ManagedEnv, ManagedRuntime};
pub use script::{Interpreter, ScriptReturn, ScriptScope, ScriptValue};
