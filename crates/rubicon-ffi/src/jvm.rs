//! JVM reflection facade over the `jni` crate
//!
//! `ObjectRef` values handed out here are raw local references. They stay
//! valid until the native method that produced them returns, which covers
//! the lifetime of one trampoline call.

use std::cell::RefCell;

use jni::errors::Error as JniError;
use jni::objects::{JObject, JObjectArray, JString, JValue};
use jni::sys::jobject;
use jni::{JNIEnv, JavaVM};
use rubicon_sdk::{AbiResult, ManagedArg, ManagedEnv, ManagedRuntime, NativeError, ObjectRef};

/// Raw handle of a JNI reference
pub fn object_ref(obj: &JObject<'_>) -> ObjectRef {
    ObjectRef::from_raw(obj.as_raw() as usize as u64)
}

/// Raw JNI reference behind a handle
pub fn raw_object(obj: ObjectRef) -> jobject {
    obj.as_raw() as usize as jobject
}

fn local<'local>(obj: ObjectRef) -> JObject<'local> {
    // SAFETY: handles only ever come from `object_ref` on references that
    // are live for the current native frame.
    unsafe { JObject::from_raw(raw_object(obj)) }
}

fn jni_error(error: JniError) -> NativeError {
    match error {
        JniError::JavaException => {
            NativeError::PendingException("a Java exception is pending".to_string())
        }
        JniError::NullPtr(what) | JniError::NullDeref(what) => NativeError::NullReference(what),
        JniError::FieldNotFound { name, sig } | JniError::MethodNotFound { name, sig } => {
            NativeError::MemberNotFound {
                name,
                signature: sig,
            }
        }
        other => NativeError::AbiError(other.to_string()),
    }
}

/// [`ManagedEnv`] for the thread owning `env`
pub struct JniEnv<'local> {
    env: RefCell<JNIEnv<'local>>,
}

impl<'local> JniEnv<'local> {
    /// Wrap the environment passed to a native method
    pub fn new(env: JNIEnv<'local>) -> Self {
        Self {
            env: RefCell::new(env),
        }
    }

    /// The managed runtime this environment belongs to
    pub fn runtime(&self) -> AbiResult<JniRuntime> {
        let vm = self.env.borrow().get_java_vm().map_err(jni_error)?;
        Ok(JniRuntime { vm })
    }
}

impl ManagedEnv for JniEnv<'_> {
    fn get_long_field(&self, obj: ObjectRef, name: &str) -> AbiResult<i64> {
        if obj.is_null() {
            return Err(NativeError::NullReference("field owner"));
        }
        let mut env = self.env.borrow_mut();
        env.get_field(local(obj), name, "J")
            .and_then(|value| value.j())
            .map_err(jni_error)
    }

    fn get_static_object_field(
        &self,
        class: &str,
        name: &str,
        signature: &str,
    ) -> AbiResult<ObjectRef> {
        let mut env = self.env.borrow_mut();
        let value = env
            .get_static_field(class, name, signature)
            .and_then(|value| value.l())
            .map_err(jni_error)?;
        Ok(ObjectRef::from_raw(value.into_raw() as usize as u64))
    }

    fn call_object_method(
        &self,
        obj: ObjectRef,
        name: &str,
        signature: &str,
        args: &[ManagedArg],
    ) -> AbiResult<ObjectRef> {
        if obj.is_null() {
            return Err(NativeError::NullReference("method receiver"));
        }
        let objects = object_args(args);
        let values = jvalues(args, &objects);
        let mut env = self.env.borrow_mut();
        let value = env
            .call_method(local(obj), name, signature, &values)
            .and_then(|value| value.l())
            .map_err(jni_error)?;
        Ok(ObjectRef::from_raw(value.into_raw() as usize as u64))
    }

    fn new_object(
        &self,
        class: &str,
        signature: &str,
        args: &[ManagedArg],
    ) -> AbiResult<ObjectRef> {
        let objects = object_args(args);
        let values = jvalues(args, &objects);
        let mut env = self.env.borrow_mut();
        let obj = env
            .new_object(class, signature, &values)
            .map_err(jni_error)?;
        Ok(ObjectRef::from_raw(obj.into_raw() as usize as u64))
    }

    fn array_length(&self, array: ObjectRef) -> AbiResult<usize> {
        if array.is_null() {
            return Err(NativeError::NullReference("array"));
        }
        // SAFETY: see `local`
        let array = unsafe { JObjectArray::from_raw(raw_object(array)) };
        let len = self
            .env
            .borrow_mut()
            .get_array_length(&array)
            .map_err(jni_error)?;
        usize::try_from(len)
            .map_err(|_| NativeError::AbiError(format!("negative array length {len}")))
    }

    fn array_element(&self, array: ObjectRef, index: usize) -> AbiResult<ObjectRef> {
        if array.is_null() {
            return Err(NativeError::NullReference("array"));
        }
        let jindex = i32::try_from(index)
            .map_err(|_| NativeError::AbiError(format!("array index {index} exceeds jsize")))?;
        // SAFETY: see `local`
        let array = unsafe { JObjectArray::from_raw(raw_object(array)) };
        let element = self
            .env
            .borrow_mut()
            .get_object_array_element(&array, jindex)
            .map_err(jni_error)?;
        Ok(ObjectRef::from_raw(element.into_raw() as usize as u64))
    }

    fn get_string(&self, string: ObjectRef) -> AbiResult<String> {
        if string.is_null() {
            return Err(NativeError::NullReference("string"));
        }
        // SAFETY: see `local`
        let string = unsafe { JString::from_raw(raw_object(string)) };
        let mut env = self.env.borrow_mut();
        let value = env.get_string(&string).map_err(jni_error)?;
        Ok(value.into())
    }

    fn new_string(&self, value: &str) -> AbiResult<ObjectRef> {
        let string = self.env.borrow_mut().new_string(value).map_err(jni_error)?;
        Ok(ObjectRef::from_raw(string.into_raw() as usize as u64))
    }

    fn is_same_object(&self, a: ObjectRef, b: ObjectRef) -> AbiResult<bool> {
        self.env
            .borrow_mut()
            .is_same_object(local(a), local(b))
            .map_err(jni_error)
    }

    fn throw_new(&self, class: &str, message: &str) -> AbiResult<()> {
        self.env
            .borrow_mut()
            .throw_new(class, message)
            .map_err(jni_error)
    }
}

fn object_args<'local>(args: &[ManagedArg]) -> Vec<JObject<'local>> {
    args.iter()
        .map(|arg| match arg {
            ManagedArg::Object(obj) => local(*obj),
            _ => JObject::null(),
        })
        .collect()
}

fn jvalues<'local, 'obj>(
    args: &[ManagedArg],
    objects: &'obj [JObject<'local>],
) -> Vec<JValue<'local, 'obj>> {
    args.iter()
        .zip(objects)
        .map(|(arg, obj)| match arg {
            ManagedArg::Bool(flag) => JValue::Bool(u8::from(*flag)),
            ManagedArg::Int(value) => JValue::Int(*value),
            ManagedArg::Long(value) => JValue::Long(*value),
            ManagedArg::Object(_) => JValue::Object(obj),
        })
        .collect()
}

/// [`ManagedRuntime`] over a [`JavaVM`].
///
/// Threads the JVM has never seen are attached as daemons on first use and
/// stay attached.
pub struct JniRuntime {
    vm: JavaVM,
}

impl ManagedRuntime for JniRuntime {
    fn attach(&self) -> AbiResult<Box<dyn ManagedEnv + '_>> {
        let env = self
            .vm
            .attach_current_thread_as_daemon()
            .map_err(jni_error)?;
        Ok(Box::new(JniEnv::new(env)))
    }
}
