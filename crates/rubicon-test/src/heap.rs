//! In-memory stand-in for the managed runtime

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rubicon_sdk::{
    class, AbiResult, ManagedArg, ManagedEnv, ManagedRuntime, NativeError, ObjectRef,
};

/// Object stored on the [`HeapRuntime`] heap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapObject {
    /// Instance with `long` fields
    Instance {
        /// Binary class name
        class: String,
        /// `long` fields by name
        fields: HashMap<String, i64>,
    },
    /// Reflective method descriptor
    Method {
        /// Method name returned by `getName()`
        name: String,
    },
    /// String
    Str(String),
    /// Object array
    Array(Vec<ObjectRef>),
    /// Boxed scalar (`Boolean`, `Integer`, `Long`)
    Boxed {
        /// Binary class name
        class: String,
        /// Unboxed value; booleans are 0 or 1
        value: i64,
    },
}

struct Heap {
    objects: HashMap<u64, HeapObject>,
    statics: HashMap<(String, String), ObjectRef>,
    next: u64,
    pending_exception: Option<String>,
    reject_throws: bool,
}

impl Heap {
    fn alloc(&mut self, object: HeapObject) -> ObjectRef {
        let raw = self.next;
        self.next += 1;
        self.objects.insert(raw, object);
        ObjectRef::from_raw(raw)
    }

    fn get(&self, obj: ObjectRef, what: &'static str) -> AbiResult<&HeapObject> {
        if obj.is_null() {
            return Err(NativeError::NullReference(what));
        }
        self.objects
            .get(&obj.as_raw())
            .ok_or_else(|| NativeError::AbiError(format!("dangling reference {obj:?}")))
    }
}

/// Managed runtime backed by a process-local object heap.
///
/// `Boolean.TRUE` and `Boolean.FALSE` are allocated once at construction,
/// so identity comparisons behave as on a real runtime.
pub struct HeapRuntime {
    heap: Mutex<Heap>,
    attaches: AtomicUsize,
}

impl HeapRuntime {
    /// Create a heap holding only the boxed boolean singletons
    pub fn new() -> Self {
        let mut heap = Heap {
            objects: HashMap::new(),
            statics: HashMap::new(),
            next: 0x100,
            pending_exception: None,
            reject_throws: false,
        };
        for (name, value) in [("TRUE", 1), ("FALSE", 0)] {
            let singleton = heap.alloc(HeapObject::Boxed {
                class: class::BOOLEAN.to_string(),
                value,
            });
            heap.statics
                .insert((class::BOOLEAN.to_string(), name.to_string()), singleton);
        }
        Self {
            heap: Mutex::new(heap),
            attaches: AtomicUsize::new(0),
        }
    }

    /// Environment for the calling thread
    pub fn env(&self) -> HeapEnv<'_> {
        HeapEnv { runtime: self }
    }

    /// Allocate a proxy handler wrapping interpreter instance `id`
    pub fn python_instance(&self, id: i64) -> ObjectRef {
        let fields = HashMap::from([(class::INSTANCE_FIELD.to_string(), id)]);
        self.alloc(HeapObject::Instance {
            class: class::PYTHON_INSTANCE.to_string(),
            fields,
        })
    }

    /// Allocate a method descriptor
    pub fn method(&self, name: &str) -> ObjectRef {
        self.alloc(HeapObject::Method {
            name: name.to_string(),
        })
    }

    /// Allocate a string
    pub fn string(&self, value: &str) -> ObjectRef {
        self.alloc(HeapObject::Str(value.to_string()))
    }

    /// Allocate an object array
    pub fn array(&self, items: &[ObjectRef]) -> ObjectRef {
        self.alloc(HeapObject::Array(items.to_vec()))
    }

    /// The canonical `Boolean.TRUE` / `Boolean.FALSE`
    pub fn boolean(&self, flag: bool) -> ObjectRef {
        let name = if flag { "TRUE" } else { "FALSE" };
        self.heap
            .lock()
            .statics
            .get(&(class::BOOLEAN.to_string(), name.to_string()))
            .copied()
            .unwrap_or(ObjectRef::NULL)
    }

    /// Copy of a heap object
    pub fn get(&self, obj: ObjectRef) -> Option<HeapObject> {
        self.heap.lock().objects.get(&obj.as_raw()).cloned()
    }

    /// Class name and value of a boxed scalar
    pub fn unbox(&self, obj: ObjectRef) -> Option<(String, i64)> {
        match self.get(obj)? {
            HeapObject::Boxed { class, value } => Some((class, value)),
            _ => None,
        }
    }

    /// Exception raised with `throw_new` and not yet taken
    pub fn take_exception(&self) -> Option<String> {
        self.heap.lock().pending_exception.take()
    }

    /// Make every following `throw_new` fail
    pub fn reject_throws(&self) {
        self.heap.lock().reject_throws = true;
    }

    /// Number of `attach` calls so far
    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    fn alloc(&self, object: HeapObject) -> ObjectRef {
        self.heap.lock().alloc(object)
    }
}

impl Default for HeapRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagedRuntime for HeapRuntime {
    fn attach(&self) -> AbiResult<Box<dyn ManagedEnv + '_>> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.env()))
    }
}

/// [`ManagedEnv`] over a [`HeapRuntime`]
pub struct HeapEnv<'a> {
    runtime: &'a HeapRuntime,
}

fn member_not_found(name: &str, signature: &str) -> NativeError {
    NativeError::MemberNotFound {
        name: name.to_string(),
        signature: signature.to_string(),
    }
}

impl ManagedEnv for HeapEnv<'_> {
    fn get_long_field(&self, obj: ObjectRef, name: &str) -> AbiResult<i64> {
        let heap = self.runtime.heap.lock();
        match heap.get(obj, "field owner")? {
            HeapObject::Instance { fields, .. } => fields
                .get(name)
                .copied()
                .ok_or_else(|| member_not_found(name, "J")),
            _ => Err(member_not_found(name, "J")),
        }
    }

    fn get_static_object_field(
        &self,
        class: &str,
        name: &str,
        signature: &str,
    ) -> AbiResult<ObjectRef> {
        self.runtime
            .heap
            .lock()
            .statics
            .get(&(class.to_string(), name.to_string()))
            .copied()
            .ok_or_else(|| member_not_found(name, signature))
    }

    fn call_object_method(
        &self,
        obj: ObjectRef,
        name: &str,
        signature: &str,
        _args: &[ManagedArg],
    ) -> AbiResult<ObjectRef> {
        let mut heap = self.runtime.heap.lock();
        let method_name = match heap.get(obj, "method receiver")? {
            HeapObject::Method { name: method_name }
                if name == "getName" && signature == class::GET_NAME_SIGNATURE =>
            {
                method_name.clone()
            }
            _ => return Err(member_not_found(name, signature)),
        };
        Ok(heap.alloc(HeapObject::Str(method_name)))
    }

    fn new_object(
        &self,
        class: &str,
        signature: &str,
        args: &[ManagedArg],
    ) -> AbiResult<ObjectRef> {
        let value = match (signature, args) {
            ("(I)V", [ManagedArg::Int(v)]) => i64::from(*v),
            ("(J)V", [ManagedArg::Long(v)]) => *v,
            _ => return Err(member_not_found("<init>", signature)),
        };
        Ok(self.runtime.alloc(HeapObject::Boxed {
            class: class.to_string(),
            value,
        }))
    }

    fn array_length(&self, array: ObjectRef) -> AbiResult<usize> {
        match self.runtime.heap.lock().get(array, "array")? {
            HeapObject::Array(items) => Ok(items.len()),
            other => Err(NativeError::TypeMismatch {
                expected: "Object[]".to_string(),
                got: format!("{other:?}"),
            }),
        }
    }

    fn array_element(&self, array: ObjectRef, index: usize) -> AbiResult<ObjectRef> {
        match self.runtime.heap.lock().get(array, "array")? {
            HeapObject::Array(items) => items.get(index).copied().ok_or(
                NativeError::IndexOutOfBounds {
                    index,
                    len: items.len(),
                },
            ),
            other => Err(NativeError::TypeMismatch {
                expected: "Object[]".to_string(),
                got: format!("{other:?}"),
            }),
        }
    }

    fn get_string(&self, string: ObjectRef) -> AbiResult<String> {
        match self.runtime.heap.lock().get(string, "string")? {
            HeapObject::Str(value) => Ok(value.clone()),
            other => Err(NativeError::TypeMismatch {
                expected: "String".to_string(),
                got: format!("{other:?}"),
            }),
        }
    }

    fn new_string(&self, value: &str) -> AbiResult<ObjectRef> {
        Ok(self.runtime.string(value))
    }

    fn is_same_object(&self, a: ObjectRef, b: ObjectRef) -> AbiResult<bool> {
        Ok(a == b)
    }

    fn throw_new(&self, class: &str, message: &str) -> AbiResult<()> {
        let mut heap = self.runtime.heap.lock();
        if heap.reject_throws {
            return Err(NativeError::PendingException(format!(
                "cannot raise {class} while another exception is pending"
            )));
        }
        heap.pending_exception = Some(format!("{class}: {message}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_singletons_are_stable() {
        let runtime = HeapRuntime::new();
        let env = runtime.env();

        let t = env
            .get_static_object_field(class::BOOLEAN, "TRUE", class::BOOLEAN_SIGNATURE)
            .unwrap();
        assert_eq!(t, runtime.boolean(true));
        assert_ne!(t, runtime.boolean(false));
        assert_eq!(runtime.unbox(t), Some((class::BOOLEAN.to_string(), 1)));
    }

    #[test]
    fn test_method_name_and_fields() {
        let runtime = HeapRuntime::new();
        let env = runtime.env();

        let proxy = runtime.python_instance(77);
        assert_eq!(env.get_long_field(proxy, class::INSTANCE_FIELD).unwrap(), 77);

        let method = runtime.method("onClick");
        let name = env
            .call_object_method(method, "getName", class::GET_NAME_SIGNATURE, &[])
            .unwrap();
        assert_eq!(env.get_string(name).unwrap(), "onClick");
    }

    #[test]
    fn test_arrays() {
        let runtime = HeapRuntime::new();
        let env = runtime.env();
        let a = runtime.string("a");
        let array = runtime.array(&[a]);

        assert_eq!(env.array_length(array).unwrap(), 1);
        assert_eq!(env.array_element(array, 0).unwrap(), a);
        assert_eq!(
            env.array_element(array, 1),
            Err(NativeError::IndexOutOfBounds { index: 1, len: 1 })
        );
        assert_eq!(
            env.array_length(ObjectRef::NULL),
            Err(NativeError::NullReference("array"))
        );
    }
}
