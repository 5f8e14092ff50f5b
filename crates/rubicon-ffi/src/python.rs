//! Embedded CPython over `pyo3`
//!
//! The execution lock is the GIL. `initialize` releases the GIL that
//! interpreter start-up leaves with the calling thread, so every later
//! scope, including the first one on the starting thread, acquires it
//! through `Python::with_gil`, which is safe both from threads Python has
//! never seen and from threads that already hold it.
//!
//! CPython is started at most once per process. Modules built into the
//! interpreter, `android` among them, do not survive a finalization, so a
//! start after a stop is refused.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

use pyo3::ffi;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyList, PyLong, PyTuple};
use rubicon_bridge::logstream::{self, LineBuffer, LogLevel};
use rubicon_sdk::{Interpreter, ScriptReturn, ScriptScope, ScriptValue};

static REGISTER_LOG_MODULE: Once = Once::new();
static FINALIZED: AtomicBool = AtomicBool::new(false);

/// Python exception, rendered while the GIL was held
pub struct PythonError {
    message: String,
    error: Option<PyErr>,
}

impl PythonError {
    fn new(py: Python<'_>, error: PyErr) -> Self {
        let message = match error.value_bound(py).str() {
            Ok(text) => format!("{}: {}", type_name(py, &error), text),
            Err(_) => type_name(py, &error),
        };
        Self {
            message,
            error: Some(error),
        }
    }

    fn other(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }
}

fn type_name(py: Python<'_>, error: &PyErr) -> String {
    error
        .get_type_bound(py)
        .qualname()
        .map(|name| name.to_string())
        .unwrap_or_else(|_| "<unknown exception>".to_string())
}

impl fmt::Display for PythonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for PythonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PythonError").field(&self.message).finish()
    }
}

/// The process-wide CPython interpreter
#[derive(Debug, Default, Clone, Copy)]
pub struct PythonInterpreter;

impl Interpreter for PythonInterpreter {
    type Object = PyObject;
    type Error = PythonError;
    type Scope<'s> = PyScope<'s>;

    fn initialize(&self) -> Result<(), PythonError> {
        if FINALIZED.load(Ordering::SeqCst) {
            return Err(PythonError::other(
                "The Python runtime cannot be restarted after it was stopped",
            ));
        }
        // SAFETY: lifecycle calls are serialized by the bridge, and the
        // built-in table is only extended before the first initialization.
        unsafe {
            if ffi::Py_IsInitialized() != 0 {
                return Ok(());
            }
            REGISTER_LOG_MODULE.call_once(|| {
                log::info!("Adding logging module to default modules...");
                pyo3::append_to_inittab!(android);
            });

            ffi::Py_InitializeEx(0);
            if ffi::Py_IsInitialized() == 0 {
                return Err(PythonError::other("Py_InitializeEx failed"));
            }
            ffi::PyEval_SaveThread();
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        // SAFETY: callable at any time, with or without the GIL
        unsafe { ffi::Py_IsInitialized() != 0 }
    }

    fn finalize(&self) {
        // SAFETY: the bridge has released every object it owned; the GIL
        // state is taken for finalization and never given back.
        unsafe {
            if ffi::Py_IsInitialized() == 0 {
                return;
            }
            ffi::PyGILState_Ensure();
            if ffi::Py_FinalizeEx() != 0 {
                log::warn!("Errors occurred while finalizing the Python runtime");
            }
            FINALIZED.store(true, Ordering::SeqCst);
        }
    }

    fn exclusive<R>(&self, f: impl FnOnce(&PyScope<'_>) -> R) -> R {
        Python::with_gil(|py| f(&PyScope { py }))
    }
}

/// GIL-holding scope
pub struct PyScope<'py> {
    py: Python<'py>,
}

impl<'py> PyScope<'py> {
    fn fail(&self, error: PyErr) -> PythonError {
        PythonError::new(self.py, error)
    }

    fn to_python(&self, value: &ScriptValue) -> PyObject {
        match value {
            ScriptValue::None => self.py.None(),
            ScriptValue::Bool(flag) => flag.to_object(self.py),
            ScriptValue::Int(value) => value.to_object(self.py),
            ScriptValue::Str(text) => text.to_object(self.py),
            ScriptValue::Tuple(items) => self.tuple(items).into_any().unbind(),
        }
    }

    fn tuple(&self, items: &[ScriptValue]) -> Bound<'py, PyTuple> {
        let items: Vec<PyObject> = items.iter().map(|item| self.to_python(item)).collect();
        PyTuple::new_bound(self.py, items)
    }

    fn sys(&self) -> Result<Bound<'py, PyModule>, PythonError> {
        PyModule::import_bound(self.py, "sys").map_err(|e| self.fail(e))
    }
}

impl ScriptScope for PyScope<'_> {
    type Object = PyObject;
    type Error = PythonError;

    fn import(&self, module: &str) -> Result<PyObject, PythonError> {
        PyModule::import_bound(self.py, module)
            .map(|module| module.into_any().unbind())
            .map_err(|e| self.fail(e))
    }

    fn getattr(&self, target: &PyObject, name: &str) -> Result<PyObject, PythonError> {
        target
            .bind(self.py)
            .getattr(name)
            .map(Bound::unbind)
            .map_err(|e| self.fail(e))
    }

    fn call(&self, callable: &PyObject, args: &[ScriptValue]) -> Result<PyObject, PythonError> {
        callable
            .bind(self.py)
            .call1(self.tuple(args))
            .map(Bound::unbind)
            .map_err(|e| self.fail(e))
    }

    fn classify(&self, value: &PyObject) -> ScriptReturn {
        let value = value.bind(self.py);
        if let Ok(flag) = value.downcast::<PyBool>() {
            ScriptReturn::Boolean(flag.is_true())
        } else if value.is_instance_of::<PyLong>() {
            value
                .extract::<i64>()
                .map_or(ScriptReturn::Other, ScriptReturn::Integer)
        } else {
            ScriptReturn::Other
        }
    }

    fn set_argv(&self, argv: &[OsString]) -> Result<(), PythonError> {
        let sys = self.sys()?;
        let list = PyList::new_bound(self.py, argv);
        sys.setattr("argv", list).map_err(|e| self.fail(e))?;

        let entry = argv
            .first()
            .map(|program| argv_path_entry(program))
            .unwrap_or_default();
        sys.getattr("path")
            .and_then(|path| path.call_method1("insert", (0, entry)))
            .map(drop)
            .map_err(|e| self.fail(e))
    }

    fn print_error(&self, error: PythonError) {
        match error.error {
            Some(error) => error.print(self.py),
            None => logstream::emit(LogLevel::Error, &error.message),
        }
    }

    fn install_log_streams(&self) -> Result<(), PythonError> {
        let sys = self.sys()?;
        for (name, level) in [("stdout", LogLevel::Info), ("stderr", LogLevel::Error)] {
            let stream = Py::new(self.py, LogStream::new(level)).map_err(|e| self.fail(e))?;
            sys.setattr(name, stream).map_err(|e| self.fail(e))?;
        }
        logstream::emit(LogLevel::Info, "sys.stdout/stderr replaced with log wrappers.");
        Ok(())
    }
}

/// Entry prepended to `sys.path` for a program started as `program`: the
/// directory holding it, or `""` (the working directory) for a bare name.
fn argv_path_entry(program: &OsStr) -> OsString {
    Path::new(program)
        .parent()
        .map(|dir| dir.as_os_str().to_owned())
        .unwrap_or_default()
}

/// File-like object installed as `sys.stdout` / `sys.stderr`
#[pyclass(module = "rubicon")]
pub struct LogStream {
    buffer: LineBuffer,
}

impl LogStream {
    /// Stream logging complete lines at `level`
    pub fn new(level: LogLevel) -> Self {
        Self {
            buffer: LineBuffer::new(level),
        }
    }
}

#[pymethods]
impl LogStream {
    fn write(&mut self, text: &str) -> usize {
        self.buffer.write_str(text);
        text.chars().count()
    }

    fn flush(&self) {}
}

#[pyfunction]
#[pyo3(name = "verbose")]
fn log_verbose(message: &str) {
    logstream::emit(LogLevel::Verbose, message);
}

#[pyfunction]
#[pyo3(name = "debug")]
fn log_debug(message: &str) {
    logstream::emit(LogLevel::Debug, message);
}

#[pyfunction]
#[pyo3(name = "info")]
fn log_info(message: &str) {
    logstream::emit(LogLevel::Info, message);
}

#[pyfunction]
#[pyo3(name = "warn")]
fn log_warn(message: &str) {
    logstream::emit(LogLevel::Warn, message);
}

#[pyfunction]
#[pyo3(name = "error")]
fn log_error(message: &str) {
    logstream::emit(LogLevel::Error, message);
}

/// Host log access for interpreter code: `import android; android.info(..)`
#[pymodule]
fn android(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(log_verbose, m)?)?;
    m.add_function(wrap_pyfunction!(log_debug, m)?)?;
    m.add_function(wrap_pyfunction!(log_info, m)?)?;
    m.add_function(wrap_pyfunction!(log_warn, m)?)?;
    m.add_function(wrap_pyfunction!(log_error, m)?)?;
    m.add_class::<LogStream>()?;
    Ok(())
}
