//! Runtime lifecycle: start, run, stop

use std::ffi::OsString;
use std::iter;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rubicon_sdk::{Interpreter, ManagedRuntime, ScriptScope, ScriptValue};

use crate::config::BridgeConfig;
use crate::error::{RunError, StartError};
use crate::session::Session;

/// Standard-library module that runs other modules as `__main__`
const RUNNER_MODULE: &str = "runpy";
const RUNNER_FUNCTION: &str = "_run_module_as_main";

/// Bridge between one managed runtime and one embedded interpreter.
///
/// There is normally exactly one `Bridge` per process; the binding layer
/// owns it and hands `&Bridge` to every entry point. The session slot is
/// written only by [`start`](Self::start) and [`stop`](Self::stop), and
/// those write sections never wait on the interpreter's execution lock, so
/// a thread that holds that lock can always re-enter [`invoke`](Self::invoke).
pub struct Bridge<I: Interpreter> {
    pub(crate) interpreter: I,
    pub(crate) session: RwLock<Option<Session<I::Object>>>,
    lifecycle: Mutex<()>,
}

impl<I: Interpreter> Bridge<I> {
    /// Wrap an interpreter binding; nothing is initialized yet
    pub fn new(interpreter: I) -> Self {
        Self {
            interpreter,
            session: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// The interpreter binding
    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    /// Whether a session exists
    pub fn is_running(&self) -> bool {
        self.session.read_recursive().is_some()
    }

    /// Initialize the interpreter and resolve the dispatch entry point.
    ///
    /// Calling `start` while a session exists is a caller error; it is
    /// logged, and the previous session's dispatch reference is released
    /// before the new one is resolved.
    pub fn start(
        &self,
        runtime: Arc<dyn ManagedRuntime>,
        config: &BridgeConfig,
    ) -> Result<(), StartError> {
        let _lifecycle = self.lifecycle.lock();
        log::info!("Start Python runtime...");

        let previous = self.session.write().take();
        if let Some(previous) = previous {
            log::warn!("Python runtime is already running; releasing previous dispatch handler");
            self.interpreter.exclusive(move |_| drop(previous));
        }

        config.apply_to_process();

        log::debug!("Initializing Python runtime...");
        self.interpreter.initialize().map_err(|e| {
            log::error!("Couldn't initialize the Python runtime: {e}");
            StartError::Initialize(e.to_string())
        })?;

        let dispatch = self.interpreter.exclusive(|scope| {
            if config.redirect_stdio {
                log::debug!("Replacing sys.stdout/sys.stderr with log wrappers...");
                if let Err(e) = scope.install_log_streams() {
                    log::error!("Exception while routing sys.stdout/stderr to the log.");
                    report(scope, e);
                }
            }

            log::trace!("Import {}...", config.dispatch_module);
            let module = scope.import(&config.dispatch_module).map_err(|e| {
                log::error!("Couldn't import {} python module", config.dispatch_module);
                StartError::Import {
                    module: config.dispatch_module.clone(),
                    message: report(scope, e),
                }
            })?;
            log::trace!("Got {} python module", config.dispatch_module);

            let dispatch = scope.getattr(&module, &config.dispatch_attr).map_err(|e| {
                log::error!("Couldn't find method dispatch handler");
                StartError::Resolve {
                    module: config.dispatch_module.clone(),
                    attr: config.dispatch_attr.clone(),
                    message: report(scope, e),
                }
            })?;
            log::trace!("Got method dispatch handler");
            Ok(dispatch)
        })?;

        *self.session.write() = Some(Session::new(runtime, dispatch, config.failure_policy));
        log::info!("Python runtime started.");
        Ok(())
    }

    /// Run `module` as the interpreter's main program.
    ///
    /// The interpreter sees `[module, args...]` as its process arguments.
    /// No bridge lock is held while the module runs, so its code may call
    /// back into the managed runtime and through [`invoke`](Self::invoke).
    pub fn run(&self, module: &str, args: &[String]) -> Result<(), RunError> {
        if !self.is_running() {
            log::error!("Python runtime doesn't appear to be running");
            return Err(RunError::NotRunning);
        }
        log::debug!("Running '{module}' as __main__...");

        let argv: Vec<OsString> = iter::once(module)
            .chain(args.iter().map(String::as_str))
            .map(OsString::from)
            .collect();

        self.interpreter.exclusive(|scope| {
            scope.set_argv(&argv).map_err(|e| {
                log::error!("Could not set program arguments");
                RunError::Arguments(report(scope, e))
            })?;

            let runner = scope.import(RUNNER_MODULE).map_err(|e| {
                log::error!("Could not import runpy module");
                RunError::RunnerImport(report(scope, e))
            })?;

            let run_module = scope.getattr(&runner, RUNNER_FUNCTION).map_err(|e| {
                log::error!("Could not access runpy._run_module_as_main");
                RunError::RunnerResolve(report(scope, e))
            })?;

            let call_args = [ScriptValue::Str(module.to_string()), ScriptValue::Bool(false)];
            scope
                .call(&run_module, &call_args)
                .map(drop)
                .map_err(|e| {
                    log::error!("Application quit abnormally!");
                    RunError::Raised(report(scope, e))
                })
        })
    }

    /// Release the session and finalize the interpreter.
    ///
    /// Calling `stop` when nothing is running is logged and changes nothing.
    pub fn stop(&self) {
        let _lifecycle = self.lifecycle.lock();

        let session = self.session.write().take();
        if session.is_none() && !self.interpreter.is_initialized() {
            log::error!("Python runtime doesn't appear to be running");
            return;
        }

        if let Some(session) = session {
            self.interpreter.exclusive(move |_| drop(session));
        }
        log::debug!("Finalizing Python runtime...");
        self.interpreter.finalize();
        log::info!("Python runtime stopped.");
    }
}

/// Print `error` through the interpreter and return its text
pub(crate) fn report<S: ScriptScope>(scope: &S, error: S::Error) -> String {
    let message = error.to_string();
    scope.print_error(error);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubicon_test::{HeapRuntime, ScriptedInterpreter};

    fn bridge() -> Bridge<ScriptedInterpreter> {
        let interp = ScriptedInterpreter::new();
        interp.define_function("rubicon.java", "dispatch", |_| Ok(rubicon_sdk::ScriptValue::None));
        Bridge::new(interp)
    }

    #[test]
    fn test_start_creates_session() {
        let bridge = bridge();
        assert!(!bridge.is_running());

        bridge
            .start(Arc::new(HeapRuntime::new()), &BridgeConfig::default())
            .unwrap();
        assert!(bridge.is_running());
        assert_eq!(bridge.interpreter().initialize_calls(), 1);
        // only the dispatch reference survives the start
        assert_eq!(bridge.interpreter().live_objects(), 1);
    }

    #[test]
    fn test_stop_releases_before_finalize() {
        let bridge = bridge();
        bridge
            .start(Arc::new(HeapRuntime::new()), &BridgeConfig::default())
            .unwrap();

        bridge.stop();
        assert!(!bridge.is_running());
        assert!(!bridge.interpreter().is_initialized());
        assert_eq!(bridge.interpreter().live_objects(), 0);
        assert_eq!(bridge.interpreter().finalize_calls(), 1);
    }

    #[test]
    fn test_log_streams_follow_config() {
        let bridge = bridge();
        let config = BridgeConfig::default().with_redirect_stdio(true);
        bridge.start(Arc::new(HeapRuntime::new()), &config).unwrap();
        assert!(bridge.interpreter().log_streams_installed());

        bridge.stop();
        let config = BridgeConfig::default().with_redirect_stdio(false);
        bridge.start(Arc::new(HeapRuntime::new()), &config).unwrap();
        assert!(!bridge.interpreter().log_streams_installed());
    }
}
