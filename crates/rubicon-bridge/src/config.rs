//! Bridge configuration.
//!
//! The interpreter reads its home directory and module search path from the
//! process environment when it initializes. `BridgeConfig` carries those
//! paths (plus the bridge library's own location, which the interpreter side
//! loads symmetrically) and exports them right before initialization.
//!
//! A host can also ship the configuration as a JSON file named by
//! `RUBICON_CONFIG`; variables set in the environment take precedence over
//! the file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Interpreter home directory
pub const PYTHON_HOME_VAR: &str = "PYTHONHOME";
/// Interpreter module search path
pub const PYTHON_PATH_VAR: &str = "PYTHONPATH";
/// Location of the bridge's shared library
pub const RUBICON_LIBRARY_VAR: &str = "RUBICON_LIBRARY";
/// `absent` or `raise`; see [`FailurePolicy`]
pub const FAILURE_POLICY_VAR: &str = "RUBICON_FAILURE_POLICY";
/// JSON configuration file
pub const CONFIG_FILE_VAR: &str = "RUBICON_CONFIG";

/// Module holding the dispatch entry point
pub const DEFAULT_DISPATCH_MODULE: &str = "rubicon.java";
/// Name of the dispatch entry point within its module
pub const DEFAULT_DISPATCH_ATTR: &str = "dispatch";

/// What the managed caller sees when the dispatch entry point raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Log, print the interpreter error, return an absent result
    #[default]
    #[serde(rename = "absent")]
    ReturnAbsent,
    /// Log, print the interpreter error, return [`InvokeError`](crate::InvokeError)
    /// so the binding can raise it in the managed caller
    #[serde(rename = "raise")]
    Raise,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absent" | "none" | "null" => Ok(FailurePolicy::ReturnAbsent),
            "raise" | "throw" => Ok(FailurePolicy::Raise),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Configuration consumed by [`Bridge::start`](crate::Bridge::start).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Interpreter home directory
    pub home: Option<PathBuf>,
    /// Interpreter module search path
    pub search_path: Option<PathBuf>,
    /// Bridge shared library location (constrained platforms)
    pub aux_library_path: Option<PathBuf>,
    /// Module holding the dispatch entry point
    pub dispatch_module: String,
    /// Dispatch entry point attribute
    pub dispatch_attr: String,
    /// Route interpreter stdout/stderr to the host log
    pub redirect_stdio: bool,
    /// Dispatch failure handling
    pub failure_policy: FailurePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            home: None,
            search_path: None,
            aux_library_path: None,
            dispatch_module: DEFAULT_DISPATCH_MODULE.to_string(),
            dispatch_attr: DEFAULT_DISPATCH_ATTR.to_string(),
            redirect_stdio: cfg!(target_os = "android"),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl BridgeConfig {
    /// Load a JSON configuration file; missing keys take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read the configuration file named by `RUBICON_CONFIG`, if any, then
    /// override it with the path and policy variables that are set
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_FILE_VAR) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(home) = env::var_os(PYTHON_HOME_VAR) {
            config.home = Some(home.into());
        }
        if let Some(path) = env::var_os(PYTHON_PATH_VAR) {
            config.search_path = Some(path.into());
        }
        if let Some(lib) = env::var_os(RUBICON_LIBRARY_VAR) {
            config.aux_library_path = Some(lib.into());
        }
        if let Ok(policy) = env::var(FAILURE_POLICY_VAR) {
            config.failure_policy = policy.parse()?;
        }
        Ok(config)
    }

    /// Set the interpreter home directory
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Set the module search path
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Set the bridge library location
    pub fn with_aux_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.aux_library_path = Some(path.into());
        self
    }

    /// Use a different dispatch entry point
    pub fn with_dispatch(mut self, module: impl Into<String>, attr: impl Into<String>) -> Self {
        self.dispatch_module = module.into();
        self.dispatch_attr = attr.into();
        self
    }

    /// Enable or disable stdout/stderr routing
    pub fn with_redirect_stdio(mut self, redirect: bool) -> Self {
        self.redirect_stdio = redirect;
        self
    }

    /// Set the dispatch failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Export the configured paths for the interpreter to pick up.
    ///
    /// Unset options leave the corresponding variable untouched.
    pub fn apply_to_process(&self) {
        let vars = [
            (PYTHON_HOME_VAR, &self.home),
            (PYTHON_PATH_VAR, &self.search_path),
            (RUBICON_LIBRARY_VAR, &self.aux_library_path),
        ];
        for (name, value) in vars {
            if let Some(value) = value {
                log::debug!("{name}={}", value.display());
                env::set_var(name, value);
            }
        }
    }
}
