//! Error types for the managed-runtime facade

/// Result type for facade calls
pub type AbiResult<T> = Result<T, NativeError>;

/// Failures reported by the managed-runtime facade
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// Value had an unexpected runtime type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// No class with the given binary name
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// No field or method matching name and signature
    #[error("Member not found: {name} {signature}")]
    MemberNotFound {
        /// Member name
        name: String,
        /// JNI type signature
        signature: String,
    },

    /// A null reference was passed where an object was required
    #[error("Null reference: {0}")]
    NullReference(&'static str),

    /// Array access outside the array
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Array length
        len: usize,
    },

    /// The managed runtime raised an exception during the call
    #[error("Managed exception pending: {0}")]
    PendingException(String),

    /// The current thread could not obtain a managed environment
    #[error("Could not attach thread: {0}")]
    Attach(String),

    /// The bridge holds no managed runtime
    #[error("Bridge runtime is not running")]
    NotRunning,

    /// Any other host-level failure
    #[error("{0}")]
    AbiError(String),
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::AbiError(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::AbiError(s.to_string())
    }
}
