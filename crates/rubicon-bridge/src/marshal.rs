//! Boxing interpreter results for the managed caller

use rubicon_sdk::{class, AbiResult, ManagedArg, ManagedEnv, ObjectRef, ScriptReturn};

/// Convert a classified dispatch result into a managed return value.
///
/// Booleans map to the canonical `Boolean.TRUE` / `Boolean.FALSE`
/// singletons, integers to a freshly boxed number, everything else to
/// `None`.
pub fn box_return(env: &dyn ManagedEnv, value: ScriptReturn) -> AbiResult<Option<ObjectRef>> {
    match value {
        ScriptReturn::Boolean(flag) => boxed_boolean(env, flag).map(Some),
        ScriptReturn::Integer(value) => boxed_integer(env, value).map(Some),
        ScriptReturn::Other => Ok(None),
    }
}

/// The shared boxed boolean singleton for `flag`
pub fn boxed_boolean(env: &dyn ManagedEnv, flag: bool) -> AbiResult<ObjectRef> {
    let name = if flag { "TRUE" } else { "FALSE" };
    env.get_static_object_field(class::BOOLEAN, name, class::BOOLEAN_SIGNATURE)
}

/// Box an integer as `Integer` when it fits in 32 bits, as `Long` otherwise
pub fn boxed_integer(env: &dyn ManagedEnv, value: i64) -> AbiResult<ObjectRef> {
    match i32::try_from(value) {
        Ok(small) => env.new_object(class::INTEGER, "(I)V", &[ManagedArg::Int(small)]),
        Err(_) => env.new_object(class::LONG, "(J)V", &[ManagedArg::Long(value)]),
    }
}

/// Decode every element of a managed string array.
///
/// A null array decodes as empty.
pub fn string_array(env: &dyn ManagedEnv, array: ObjectRef) -> AbiResult<Vec<String>> {
    if array.is_null() {
        return Ok(Vec::new());
    }
    (0..env.array_length(array)?)
        .map(|i| env.get_string(env.array_element(array, i)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubicon_test::HeapRuntime;

    #[test]
    fn test_booleans_are_singletons() {
        let runtime = HeapRuntime::new();
        let env = runtime.env();

        let t = box_return(&env, ScriptReturn::Boolean(true)).unwrap();
        let f = box_return(&env, ScriptReturn::Boolean(false)).unwrap();
        assert_eq!(t, Some(runtime.boolean(true)));
        assert_eq!(f, Some(runtime.boolean(false)));
    }

    #[test]
    fn test_integer_width() {
        let runtime = HeapRuntime::new();
        let env = runtime.env();

        let small = boxed_integer(&env, -7).unwrap();
        assert_eq!(runtime.unbox(small), Some((class::INTEGER.to_string(), -7)));

        let edge = boxed_integer(&env, i64::from(i32::MAX)).unwrap();
        assert_eq!(runtime.unbox(edge).unwrap().0, class::INTEGER);

        let large = boxed_integer(&env, 1 << 40).unwrap();
        assert_eq!(runtime.unbox(large), Some((class::LONG.to_string(), 1 << 40)));
    }

    #[test]
    fn test_other_is_absent() {
        let runtime = HeapRuntime::new();
        assert_eq!(box_return(&runtime.env(), ScriptReturn::Other), Ok(None));
    }

    #[test]
    fn test_string_array() {
        let runtime = HeapRuntime::new();
        let env = runtime.env();
        let array = runtime.array(&[runtime.string("-v"), runtime.string("--flag")]);

        assert_eq!(string_array(&env, array).unwrap(), vec!["-v", "--flag"]);
        assert!(string_array(&env, ObjectRef::NULL).unwrap().is_empty());
    }
}
