//! Rubicon bridge core
//!
//! Drives an embedded interpreter from a managed runtime and routes
//! reflective calls on managed proxies back into the interpreter:
//!
//! - [`Bridge::start`] initializes the interpreter and resolves the dispatch
//!   entry point into an explicitly owned [`Session`]
//! - [`Bridge::run`] runs a module as the interpreter's main program
//! - [`Bridge::invoke`] is the trampoline: it marshals one managed call into
//!   `dispatch(instance_id, method_name, args)` under the interpreter's
//!   execution lock and boxes the result for the managed caller
//! - [`Bridge::stop`] releases the session and finalizes the interpreter
//!
//! The bridge is generic over the interpreter binding and talks to the
//! managed runtime through `&dyn ManagedEnv`, so it runs unchanged against
//! the real bindings in `rubicon-ffi` and the doubles in `rubicon-test`.

pub mod bridge;
pub mod config;
pub mod error;
pub mod invoke;
pub mod logstream;
pub mod marshal;
pub mod session;

pub use bridge::Bridge;
pub use config::{BridgeConfig, FailurePolicy};
pub use error::{ConfigError, InvokeError, RunError, StartError};
pub use invoke::{managed_return, InvocationRequest};
pub use logstream::{LineBuffer, LogLevel};
pub use session::Session;

pub use rubicon_sdk;
