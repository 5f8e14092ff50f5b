//! Running bridge session

use std::fmt;
use std::sync::Arc;

use rubicon_sdk::{AbiResult, ManagedEnv, ManagedRuntime};

use crate::config::FailurePolicy;

/// State that exists exactly while the interpreter is running.
///
/// Holds the resolved dispatch entry point and a handle to the managed
/// runtime. The session never caches a thread-bound environment; see
/// [`Session::attach`].
pub struct Session<O> {
    runtime: Arc<dyn ManagedRuntime>,
    dispatch: O,
    policy: FailurePolicy,
}

impl<O> Session<O> {
    pub(crate) fn new(runtime: Arc<dyn ManagedRuntime>, dispatch: O, policy: FailurePolicy) -> Self {
        Self {
            runtime,
            dispatch,
            policy,
        }
    }

    /// The dispatch entry point
    pub fn dispatch(&self) -> &O {
        &self.dispatch
    }

    /// Failure policy captured at start
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Environment for the calling thread
    pub fn attach(&self) -> AbiResult<Box<dyn ManagedEnv + '_>> {
        self.runtime.attach()
    }
}

impl<O> fmt::Debug for Session<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
