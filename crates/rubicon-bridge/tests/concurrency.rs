//! Concurrent Invocation Tests
//!
//! Many managed threads calling the trampoline at once must be serialized
//! by the interpreter's execution lock: no two dispatches overlap, and no
//! call observes another call's arguments.
//!
//! # Running Tests
//! ```bash
//! cargo test -p rubicon-bridge --test concurrency
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rubicon_bridge::{Bridge, BridgeConfig};
use rubicon_sdk::{class, ObjectRef, ScriptValue};
use rubicon_test::{HeapRuntime, ScriptedInterpreter};

const THREADS: i64 = 16;

/// Dispatch that sleeps while marked busy and echoes a checksum of what it
/// received. A method name that does not match the instance id yields a
/// string, which the bridge turns into an absent result.
fn checking_interpreter(overlapped: Arc<AtomicBool>, calls: Arc<AtomicUsize>) -> ScriptedInterpreter {
    let busy = AtomicBool::new(false);
    let interp = ScriptedInterpreter::new();
    interp.define_function("rubicon.java", "dispatch", move |args| {
        if busy.swap(true, Ordering::SeqCst) {
            overlapped.store(true, Ordering::SeqCst);
        }
        calls.fetch_add(1, Ordering::SeqCst);

        let id = args[0].as_int().unwrap_or(-1);
        let method = args[1].as_str().unwrap_or_default().to_string();
        thread::sleep(Duration::from_millis(2));
        let argc = args[2].as_tuple().map_or(0, <[ScriptValue]>::len) as i64;

        busy.store(false, Ordering::SeqCst);
        if method == format!("call{id}") {
            Ok(ScriptValue::Int(id * 100 + argc))
        } else {
            Ok(ScriptValue::Str(method))
        }
    });
    interp
}

#[test]
fn test_concurrent_invocations_are_serialized() {
    let overlapped = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(checking_interpreter(Arc::clone(&overlapped), Arc::clone(&calls)));
    let runtime = Arc::new(HeapRuntime::new());
    bridge.start(runtime.clone(), &BridgeConfig::default()).unwrap();

    let results: Vec<(i64, Option<ObjectRef>)> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|id| {
                let bridge = &bridge;
                let runtime = &runtime;
                s.spawn(move || {
                    let argc = (id % 4) as usize;
                    let items: Vec<_> = (0..argc).map(|_| runtime.string("arg")).collect();
                    let target = runtime.python_instance(id);
                    let method = runtime.method(&format!("call{id}"));
                    let args = runtime.array(&items);
                    let result = bridge
                        .invoke(&runtime.env(), target, method, args)
                        .unwrap();
                    (id, result)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), THREADS as usize);
    for (id, result) in results {
        let boxed = result.expect("dispatch saw mismatched arguments");
        assert_eq!(
            runtime.unbox(boxed),
            Some((class::INTEGER.to_string(), id * 100 + id % 4))
        );
    }
    assert!(!bridge.interpreter().lock_probe().is_held());
}

#[test]
fn test_concurrent_invocations_during_restart() {
    let overlapped = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let bridge = Bridge::new(checking_interpreter(Arc::clone(&overlapped), calls));
    let runtime = Arc::new(HeapRuntime::new());
    bridge.start(runtime.clone(), &BridgeConfig::default()).unwrap();

    thread::scope(|s| {
        for id in 0..8 {
            let bridge = &bridge;
            let runtime = &runtime;
            s.spawn(move || {
                for _ in 0..5 {
                    let target = runtime.python_instance(id);
                    let method = runtime.method(&format!("call{id}"));
                    // absent while the session is being replaced is fine
                    let _ = bridge.invoke(&runtime.env(), target, method, ObjectRef::NULL);
                }
            });
        }
        s.spawn(|| {
            for _ in 0..3 {
                bridge.start(runtime.clone(), &BridgeConfig::default()).unwrap();
            }
        });
    });

    assert!(!overlapped.load(Ordering::SeqCst));
    assert!(bridge.is_running());
    assert_eq!(bridge.interpreter().live_objects(), 1);
}
