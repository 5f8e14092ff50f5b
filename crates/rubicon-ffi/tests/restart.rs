//! Restart Tests
//!
//! CPython runs once per process: a start after a stop must fail with the
//! initialization status instead of handing out a half-dead interpreter.
//!
//! # Running Tests
//! ```bash
//! cargo test -p rubicon-ffi --features python --test restart
//! ```

#![cfg(feature = "python")]

use std::sync::Arc;

use rubicon::python::PythonInterpreter;
use rubicon::status::start_status;
use rubicon_bridge::{Bridge, BridgeConfig, StartError};
use rubicon_sdk::{Interpreter, ScriptScope, ScriptValue};
use rubicon_test::HeapRuntime;

#[test]
fn test_start_after_stop_is_refused() {
    let bridge = Bridge::new(PythonInterpreter);
    let config = BridgeConfig::default()
        .with_dispatch("builtins", "repr")
        .with_redirect_stdio(true);

    let first = bridge.start(Arc::new(HeapRuntime::new()), &config);
    assert_eq!(start_status(&first), 0);
    bridge.interpreter().exclusive(|scope| {
        let android = scope.import("android").unwrap();
        let info = scope.getattr(&android, "info").unwrap();
        scope.call(&info, &[ScriptValue::Str("first run".into())]).unwrap();
    });

    bridge.stop();
    assert!(!bridge.is_running());
    assert!(!bridge.interpreter().is_initialized());

    let second = bridge.start(Arc::new(HeapRuntime::new()), &config);
    assert!(matches!(second, Err(StartError::Initialize(_))));
    assert_eq!(start_status(&second), -3);
    assert!(!bridge.is_running());
    assert!(!bridge.interpreter().is_initialized());
}
