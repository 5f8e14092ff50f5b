//! Rubicon native library
//!
//! The shared library loaded by the managed side as `rubicon`. It binds the
//! bridge core to real runtimes:
//! - `jvm`: [`ManagedEnv`](rubicon_sdk::ManagedEnv) and
//!   [`ManagedRuntime`](rubicon_sdk::ManagedRuntime) over the `jni` crate
//! - `python`: [`Interpreter`](rubicon_sdk::Interpreter) over `pyo3`, plus
//!   the log pseudo-streams and the `android` log module
//! - `bridge`: the exported `Java_org_beeware_rubicon_*` entry points
//!
//! Without features only the status-code helpers build, so the workspace
//! compiles and tests without a JVM or libpython present.

pub mod status;

#[cfg(feature = "jvm")]
pub mod jvm;

#[cfg(feature = "python")]
pub mod python;

#[cfg(feature = "bridge")]
pub mod exports;
