//! Scripted stand-in for the embedded interpreter

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use rubicon_sdk::{Interpreter, ScriptReturn, ScriptScope, ScriptValue};

type NativeFunction =
    Arc<dyn Fn(&[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync>;

/// Exception raised inside the scripted interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    kind: String,
    message: String,
}

impl ScriptError {
    /// Create an exception of the given type name
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Exception type name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Exception message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Clone)]
enum Attribute {
    Value(ScriptValue),
    Function(NativeFunction),
}

enum ObjectKind {
    Module(String),
    Function { name: String, function: NativeFunction },
    Value(ScriptValue),
}

struct LiveToken(Arc<AtomicUsize>);

impl LiveToken {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        LiveToken(Arc::clone(counter))
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owned reference to a scripted object.
///
/// Every live reference is counted by its interpreter, which lets tests
/// detect references the bridge forgot to release.
pub struct ScriptObject {
    kind: ObjectKind,
    _live: LiveToken,
}

impl ScriptObject {
    /// The plain value, if this object is not a module or function
    pub fn value(&self) -> Option<&ScriptValue> {
        match &self.kind {
            ObjectKind::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ObjectKind::Module(name) => write!(f, "<module '{name}'>"),
            ObjectKind::Function { name, .. } => write!(f, "<function {name}>"),
            ObjectKind::Value(value) => write!(f, "{value:?}"),
        }
    }
}

/// Observes the execution lock from inside scripted functions
#[derive(Debug, Clone, Default)]
pub struct LockProbe {
    depth: Arc<AtomicUsize>,
    acquisitions: Arc<AtomicUsize>,
}

impl LockProbe {
    /// Whether some thread currently holds the execution lock
    pub fn is_held(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }

    /// Total number of acquisitions so far, nested ones included
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    fn enter(&self) -> ProbeGuard<'_> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        ProbeGuard(self)
    }
}

struct ProbeGuard<'a>(&'a LockProbe);

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.0.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct State {
    initialized: bool,
    initialize_calls: usize,
    finalize_calls: usize,
    initialize_error: Option<ScriptError>,
    modules: HashMap<String, HashMap<String, Attribute>>,
    argv: Vec<OsString>,
    printed: Vec<String>,
    log_streams: bool,
}

/// Interpreter whose modules are Rust closures.
///
/// The execution lock is a reentrant mutex, so nested `exclusive` calls on
/// one thread succeed while other threads block.
pub struct ScriptedInterpreter {
    lock: ReentrantMutex<()>,
    state: Mutex<State>,
    live: Arc<AtomicUsize>,
    probe: LockProbe,
}

impl ScriptedInterpreter {
    /// Create an uninitialized interpreter with no modules
    pub fn new() -> Self {
        Self {
            lock: ReentrantMutex::new(()),
            state: Mutex::new(State::default()),
            live: Arc::new(AtomicUsize::new(0)),
            probe: LockProbe::default(),
        }
    }

    /// Register an empty module
    pub fn define_module(&self, module: &str) {
        self.state
            .lock()
            .modules
            .entry(module.to_string())
            .or_default();
    }

    /// Register a callable attribute, creating the module if needed
    pub fn define_function(
        &self,
        module: &str,
        name: &str,
        function: impl Fn(&[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync + 'static,
    ) {
        self.define(module, name, Attribute::Function(Arc::new(function)));
    }

    /// Register a plain attribute, creating the module if needed
    pub fn define_value(&self, module: &str, name: &str, value: ScriptValue) {
        self.define(module, name, Attribute::Value(value));
    }

    fn define(&self, module: &str, name: &str, attribute: Attribute) {
        self.state
            .lock()
            .modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string(), attribute);
    }

    /// Make every following `initialize` fail with `error`
    pub fn fail_initialize(&self, error: ScriptError) {
        self.state.lock().initialize_error = Some(error);
    }

    /// Number of object references currently alive
    pub fn live_objects(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Errors passed to `print_error`, oldest first
    pub fn printed_errors(&self) -> Vec<String> {
        self.state.lock().printed.clone()
    }

    /// Arguments last installed with `set_argv`
    pub fn argv(&self) -> Vec<OsString> {
        self.state.lock().argv.clone()
    }

    /// Number of effective initializations
    pub fn initialize_calls(&self) -> usize {
        self.state.lock().initialize_calls
    }

    /// Number of finalizations
    pub fn finalize_calls(&self) -> usize {
        self.state.lock().finalize_calls
    }

    /// Whether standard streams are currently routed to the log
    pub fn log_streams_installed(&self) -> bool {
        self.state.lock().log_streams
    }

    /// Probe sharing this interpreter's lock bookkeeping
    pub fn lock_probe(&self) -> LockProbe {
        self.probe.clone()
    }
}

impl Default for ScriptedInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter for ScriptedInterpreter {
    type Object = ScriptObject;
    type Error = ScriptError;
    type Scope<'s> = ScriptedScope<'s>;

    fn initialize(&self) -> Result<(), ScriptError> {
        let mut state = self.state.lock();
        if let Some(error) = state.initialize_error.clone() {
            return Err(error);
        }
        if !state.initialized {
            state.initialized = true;
            state.initialize_calls += 1;
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    fn finalize(&self) {
        let mut state = self.state.lock();
        state.initialized = false;
        state.log_streams = false;
        state.finalize_calls += 1;
    }

    fn exclusive<R>(&self, f: impl FnOnce(&ScriptedScope<'_>) -> R) -> R {
        let _guard = self.lock.lock();
        let _held = self.probe.enter();
        f(&ScriptedScope { interpreter: self })
    }
}

/// Scope handed out by [`ScriptedInterpreter::exclusive`]
pub struct ScriptedScope<'s> {
    interpreter: &'s ScriptedInterpreter,
}

impl ScriptedScope<'_> {
    fn object(&self, kind: ObjectKind) -> ScriptObject {
        ScriptObject {
            kind,
            _live: LiveToken::new(&self.interpreter.live),
        }
    }
}

impl ScriptScope for ScriptedScope<'_> {
    type Object = ScriptObject;
    type Error = ScriptError;

    fn import(&self, module: &str) -> Result<ScriptObject, ScriptError> {
        let state = self.interpreter.state.lock();
        if !state.initialized {
            return Err(ScriptError::new(
                "RuntimeError",
                "interpreter is not initialized",
            ));
        }
        if !state.modules.contains_key(module) {
            return Err(ScriptError::new(
                "ModuleNotFoundError",
                format!("No module named '{module}'"),
            ));
        }
        Ok(self.object(ObjectKind::Module(module.to_string())))
    }

    fn getattr(&self, target: &ScriptObject, name: &str) -> Result<ScriptObject, ScriptError> {
        let ObjectKind::Module(module) = &target.kind else {
            return Err(ScriptError::new(
                "AttributeError",
                format!("{target:?} has no attribute '{name}'"),
            ));
        };
        let attribute = self
            .interpreter
            .state
            .lock()
            .modules
            .get(module)
            .and_then(|attributes| attributes.get(name))
            .cloned();
        match attribute {
            Some(Attribute::Value(value)) => Ok(self.object(ObjectKind::Value(value))),
            Some(Attribute::Function(function)) => Ok(self.object(ObjectKind::Function {
                name: format!("{module}.{name}"),
                function,
            })),
            None => Err(ScriptError::new(
                "AttributeError",
                format!("module '{module}' has no attribute '{name}'"),
            )),
        }
    }

    fn call(&self, callable: &ScriptObject, args: &[ScriptValue]) -> Result<ScriptObject, ScriptError> {
        match &callable.kind {
            ObjectKind::Function { function, .. } => {
                let function = Arc::clone(function);
                function(args).map(|value| self.object(ObjectKind::Value(value)))
            }
            _ => Err(ScriptError::new(
                "TypeError",
                format!("{callable:?} is not callable"),
            )),
        }
    }

    fn classify(&self, value: &ScriptObject) -> ScriptReturn {
        match &value.kind {
            ObjectKind::Value(ScriptValue::Bool(flag)) => ScriptReturn::Boolean(*flag),
            ObjectKind::Value(ScriptValue::Int(i)) => ScriptReturn::Integer(*i),
            _ => ScriptReturn::Other,
        }
    }

    fn set_argv(&self, argv: &[OsString]) -> Result<(), ScriptError> {
        self.interpreter.state.lock().argv = argv.to_vec();
        Ok(())
    }

    fn print_error(&self, error: ScriptError) {
        self.interpreter.state.lock().printed.push(error.to_string());
    }

    fn install_log_streams(&self) -> Result<(), ScriptError> {
        self.interpreter.state.lock().log_streams = true;
        Ok(())
    }
}
