//! Interpreter trait - embedding API of the hosted interpreter
//!
//! The interpreter allows a single thread at a time to touch its state. All
//! object operations therefore live on [`ScriptScope`], which can only be
//! obtained inside [`Interpreter::exclusive`] while the execution lock is
//! held.

use std::ffi::OsString;
use std::fmt;

/// Value marshaled into the interpreter.
///
/// Built by the bridge, converted into native interpreter objects by the
/// [`ScriptScope`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValue {
    /// The interpreter's null singleton
    None,
    /// Boolean
    Bool(bool),
    /// Arbitrary-width integer, created from 64 bits
    Int(i64),
    /// Text
    Str(String),
    /// Immutable positional sequence
    Tuple(Vec<ScriptValue>),
}

impl ScriptValue {
    /// Build a tuple from any sequence of values
    pub fn tuple(items: impl IntoIterator<Item = ScriptValue>) -> Self {
        ScriptValue::Tuple(items.into_iter().collect())
    }

    /// Get as integer if this is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as text if this is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the items if this is a tuple
    pub fn as_tuple(&self) -> Option<&[ScriptValue]> {
        match self {
            ScriptValue::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

/// Runtime type of a value returned by the interpreter, as far as the
/// managed side can represent it.
///
/// Booleans are classified before integers: in interpreters where `bool`
/// is an integer subtype, `True` must still come back as a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptReturn {
    /// A boolean
    Boolean(bool),
    /// An integer that fits in 64 bits
    Integer(i64),
    /// Anything else, including `None` and integers beyond 64 bits
    Other,
}

/// Operations available while the interpreter's execution lock is held.
pub trait ScriptScope {
    /// Owned reference to an interpreter object
    type Object;
    /// Pending interpreter exception
    type Error: fmt::Display;

    /// Import a module by dotted name
    fn import(&self, module: &str) -> Result<Self::Object, Self::Error>;

    /// Look up an attribute by name
    fn getattr(&self, target: &Self::Object, name: &str) -> Result<Self::Object, Self::Error>;

    /// Call with positional arguments
    fn call(&self, callable: &Self::Object, args: &[ScriptValue])
        -> Result<Self::Object, Self::Error>;

    /// Inspect a value's runtime type
    fn classify(&self, value: &Self::Object) -> ScriptReturn;

    /// Replace the interpreter-visible process arguments
    fn set_argv(&self, argv: &[OsString]) -> Result<(), Self::Error>;

    /// Print the error through the interpreter's own reporting and clear it
    fn print_error(&self, error: Self::Error);

    /// Route the interpreter's standard output and error into the host log
    fn install_log_streams(&self) -> Result<(), Self::Error>;
}

/// Process-wide embedded interpreter.
pub trait Interpreter: Send + Sync {
    /// Owned object reference that may be kept between lock scopes
    type Object: Send + Sync;
    /// Pending interpreter exception
    type Error: fmt::Display;
    /// Scope handed out while the execution lock is held
    type Scope<'s>: ScriptScope<Object = Self::Object, Error = Self::Error>;

    /// Initialize the interpreter; a no-op if it is already initialized
    fn initialize(&self) -> Result<(), Self::Error>;

    /// Whether `initialize` has run without a matching `finalize`
    fn is_initialized(&self) -> bool;

    /// Tear the interpreter down
    fn finalize(&self);

    /// Run `f` holding exclusive execution rights.
    ///
    /// Acquisition must be safe from a thread the interpreter has never
    /// seen and from a thread that already holds the lock. The lock is
    /// released when `f` returns or unwinds.
    fn exclusive<R>(&self, f: impl FnOnce(&Self::Scope<'_>) -> R) -> R;
}
