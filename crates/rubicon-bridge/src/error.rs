//! Bridge error types.
//!
//! Inside the crate failures propagate as these enums. At the runtime
//! boundary they collapse into a status code (start, run) or an absent
//! result (invoke); interpreter error text has already been printed and
//! cleared by the time one of these is returned.

use std::path::PathBuf;

use rubicon_sdk::{InstanceId, NativeError};

/// Status code reported for a successful start or run
pub const STATUS_OK: i32 = 0;

/// Errors that can occur while starting the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    /// The interpreter could not be initialized
    #[error("Couldn't initialize the Python runtime: {0}")]
    Initialize(String),

    /// The dispatch module could not be imported
    #[error("Couldn't import {module} python module: {message}")]
    Import {
        /// Dotted module name
        module: String,
        /// Interpreter error text
        message: String,
    },

    /// The dispatch entry point is missing from its module
    #[error("Couldn't find method dispatch handler {module}.{attr}: {message}")]
    Resolve {
        /// Dotted module name
        module: String,
        /// Attribute name
        attr: String,
        /// Interpreter error text
        message: String,
    },
}

impl StartError {
    /// Negative status code, distinct per failure point
    pub fn status_code(&self) -> i32 {
        match self {
            StartError::Import { .. } => -1,
            StartError::Resolve { .. } => -2,
            StartError::Initialize(_) => -3,
        }
    }
}

/// Errors that can occur while running a module as `__main__`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// `run` was called before `start`
    #[error("Python runtime doesn't appear to be running")]
    NotRunning,

    /// The process arguments could not be installed
    #[error("Could not set program arguments: {0}")]
    Arguments(String),

    /// The runner module could not be imported
    #[error("Could not import runpy module: {0}")]
    RunnerImport(String),

    /// The runner function is missing
    #[error("Could not access runpy._run_module_as_main: {0}")]
    RunnerResolve(String),

    /// The module raised
    #[error("Application quit abnormally: {0}")]
    Raised(String),
}

impl RunError {
    /// Nonzero status code
    pub fn status_code(&self) -> i32 {
        1
    }
}

/// Errors that can occur during a trampoline call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// `invoke` was called while no session exists
    #[error("Python runtime doesn't appear to be running")]
    NotRunning,

    /// Reading the call or boxing its result failed on the managed side
    #[error("Managed runtime error: {0}")]
    Managed(#[from] NativeError),

    /// The dispatch entry point raised
    #[error("Error invoking callback {instance} :: {method}: {message}")]
    Dispatch {
        /// Target instance
        instance: InstanceId,
        /// Method name
        method: String,
        /// Interpreter error text
        message: String,
    },
}

/// Errors reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Unrecognized failure policy name
    #[error("Unknown failure policy '{0}' (expected 'absent' or 'raise')")]
    UnknownPolicy(String),

    /// The configuration file could not be read
    #[error("Cannot read {}: {message}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// OS error text
        message: String,
    },

    /// The configuration file is not valid
    #[error("Invalid configuration in {}: {message}", path.display())]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser error text
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_status_codes_are_distinct() {
        let import = StartError::Import {
            module: "rubicon.java".to_string(),
            message: String::new(),
        };
        let resolve = StartError::Resolve {
            module: "rubicon.java".to_string(),
            attr: "dispatch".to_string(),
            message: String::new(),
        };
        let init = StartError::Initialize(String::new());

        assert_eq!(import.status_code(), -1);
        assert_eq!(resolve.status_code(), -2);
        assert_eq!(init.status_code(), -3);
    }

    #[test]
    fn test_run_status_is_nonzero() {
        assert_ne!(RunError::NotRunning.status_code(), STATUS_OK);
        assert_ne!(RunError::Raised("boom".into()).status_code(), STATUS_OK);
    }

    #[test]
    fn test_dispatch_message() {
        let err = InvokeError::Dispatch {
            instance: InstanceId::new(3),
            method: "run".to_string(),
            message: "ValueError: bad".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error invoking callback 3 :: run: ValueError: bad"
        );
    }
}
