//! Test doubles for the Rubicon bridge
//!
//! Neither a JVM nor an interpreter is needed to exercise the bridge core:
//!
//! - [`ScriptedInterpreter`] stands in for the embedded interpreter. Modules
//!   and attributes are registered as Rust closures, and the execution lock
//!   is a reentrant mutex.
//! - [`HeapRuntime`] stands in for the managed runtime with a small object
//!   heap holding proxies, method descriptors, strings, arrays and boxed
//!   scalars.

mod heap;
mod interpreter;

pub use heap::{HeapEnv, HeapObject, HeapRuntime};
pub use interpreter::{LockProbe, ScriptError, ScriptObject, ScriptedInterpreter, ScriptedScope};
