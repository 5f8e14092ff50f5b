//! JNI entry points
//!
//! `org.beeware.rubicon.Python` declares `init`, `run` and `stop` as static
//! native methods; `org.beeware.rubicon.PythonInstance.invoke` is the
//! `InvocationHandler` method every proxy created on the Java side routes
//! through. The process-wide [`Bridge`] lives here and nowhere else.

use std::path::PathBuf;
use std::sync::Arc;

use jni::objects::{JClass, JObject, JObjectArray, JString};
use jni::sys::{jint, jobject};
use jni::JNIEnv;
use once_cell::sync::Lazy;
use rubicon_bridge::{managed_return, marshal, Bridge, BridgeConfig, StartError};
use rubicon_sdk::ManagedEnv;

use crate::jvm::{object_ref, raw_object, JniEnv, JniRuntime};
use crate::python::PythonInterpreter;
use crate::status::{run_status, start_status};

static BRIDGE: Lazy<Bridge<PythonInterpreter>> = Lazy::new(|| Bridge::new(PythonInterpreter));

fn init_logging() {
    // A host that installed its own logger keeps it.
    let _ = colog::default_builder().try_init();
}

fn optional_path(env: &JniEnv<'_>, string: &JString<'_>) -> Option<PathBuf> {
    if string.is_null() {
        return None;
    }
    match env.get_string(object_ref(string)) {
        Ok(value) => Some(PathBuf::from(value)),
        Err(e) => {
            log::error!("Unable to read path argument: {e}");
            None
        }
    }
}

/// `static native int init(String pythonHome, String pythonPath, String rubiconLib)`
#[no_mangle]
pub extern "system" fn Java_org_beeware_rubicon_Python_init<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    python_home: JString<'local>,
    python_path: JString<'local>,
    rubicon_lib: JString<'local>,
) -> jint {
    init_logging();
    let env = JniEnv::new(env);

    let mut config = BridgeConfig::from_env().unwrap_or_else(|e| {
        log::warn!("{e}; using defaults");
        BridgeConfig::default()
    });
    match optional_path(&env, &python_home) {
        Some(home) => config.home = Some(home),
        None => log::debug!("Using default PYTHONHOME"),
    }
    match optional_path(&env, &python_path) {
        Some(path) => config.search_path = Some(path),
        None => log::debug!("Using default PYTHONPATH"),
    }
    match optional_path(&env, &rubicon_lib) {
        Some(lib) => config.aux_library_path = Some(lib),
        None => log::debug!("Not setting RUBICON_LIBRARY"),
    }

    let result = env
        .runtime()
        .map_err(|e| StartError::Initialize(e.to_string()))
        .and_then(|runtime| BRIDGE.start(Arc::new(runtime), &config));
    start_status(&result)
}

/// `static native int run(String module, String[] args)`
#[no_mangle]
pub extern "system" fn Java_org_beeware_rubicon_Python_run<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    module: JString<'local>,
    args: JObjectArray<'local>,
) -> jint {
    let env = JniEnv::new(env);

    let module = match env.get_string(object_ref(&module)) {
        Ok(module) => module,
        Err(e) => {
            log::error!("Could not read module name: {e}");
            return 1;
        }
    };
    let args = match marshal::string_array(&env, object_ref(&args)) {
        Ok(args) => args,
        Err(e) => {
            log::error!("Could not read program arguments: {e}");
            return 1;
        }
    };

    run_status(&BRIDGE.run(&module, &args))
}

/// `static native void stop()`
#[no_mangle]
pub extern "system" fn Java_org_beeware_rubicon_Python_stop<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    BRIDGE.stop();
}

/// `native Object invoke(Object proxy, Method method, Object[] args)`
#[no_mangle]
pub extern "system" fn Java_org_beeware_rubicon_PythonInstance_invoke<'local>(
    env: JNIEnv<'local>,
    this: JObject<'local>,
    _proxy: JObject<'local>,
    method: JObject<'local>,
    args: JObjectArray<'local>,
) -> jobject {
    let env = JniEnv::new(env);

    let outcome = BRIDGE.invoke(&env, object_ref(&this), object_ref(&method), object_ref(&args));
    raw_object(managed_return(&env, outcome))
}
