//! The trampoline: one managed reflective call into the dispatch entry point

use rubicon_sdk::{
    class, AbiResult, InstanceId, Interpreter, ManagedEnv, ObjectRef, ScriptScope, ScriptValue,
};

use crate::bridge::{report, Bridge};
use crate::config::FailurePolicy;
use crate::error::InvokeError;
use crate::marshal;
use crate::session::Session;

/// One cross-runtime call, read off the managed side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Interpreter-side target
    pub instance: InstanceId,
    /// Method name as reported by the method descriptor
    pub method: String,
    /// Arguments as opaque managed handles, in call order
    pub args: Vec<ObjectRef>,
}

impl InvocationRequest {
    /// Read the target's instance id, the method name and the argument
    /// handles. A null argument array reads as no arguments.
    pub fn from_managed(
        env: &dyn ManagedEnv,
        target: ObjectRef,
        method: ObjectRef,
        args: ObjectRef,
    ) -> AbiResult<Self> {
        let instance = InstanceId::new(env.get_long_field(target, class::INSTANCE_FIELD)?);
        let name = env.call_object_method(method, "getName", class::GET_NAME_SIGNATURE, &[])?;
        let method = env.get_string(name)?;

        let args = if args.is_null() {
            Vec::new()
        } else {
            (0..env.array_length(args)?)
                .map(|i| env.array_element(args, i))
                .collect::<AbiResult<Vec<_>>>()?
        };

        Ok(Self {
            instance,
            method,
            args,
        })
    }

    /// Positional arguments for `dispatch(instance_id, method_name, args)`
    pub fn to_script_args(&self) -> [ScriptValue; 3] {
        [
            ScriptValue::Int(self.instance.get()),
            ScriptValue::Str(self.method.clone()),
            ScriptValue::tuple(
                self.args
                    .iter()
                    .map(|arg| ScriptValue::Int(arg.as_raw() as i64)),
            ),
        ]
    }
}

/// Hand an invocation outcome back to the managed caller.
///
/// Absent results and calls made while stopped become a null reference.
/// Any other error is raised in the caller as `java.lang.RuntimeException`,
/// and the return value is null as well.
pub fn managed_return(
    env: &dyn ManagedEnv,
    outcome: Result<Option<ObjectRef>, InvokeError>,
) -> ObjectRef {
    match outcome {
        Ok(Some(result)) => result,
        Ok(None) | Err(InvokeError::NotRunning) => ObjectRef::NULL,
        Err(e) => {
            if let Err(throw) = env.throw_new(class::RUNTIME_EXCEPTION, &e.to_string()) {
                log::error!("Unable to raise {e}: {throw}");
            }
            ObjectRef::NULL
        }
    }
}

impl<I: Interpreter> Bridge<I> {
    /// Route a reflective call on a managed proxy into the interpreter.
    ///
    /// `env` must belong to the calling thread. Returns the boxed result,
    /// or `None` when the dispatch result has no managed representation.
    /// Under [`FailurePolicy::ReturnAbsent`] every failure after the
    /// running check is logged and turned into `Ok(None)`.
    pub fn invoke(
        &self,
        env: &dyn ManagedEnv,
        target: ObjectRef,
        method: ObjectRef,
        args: ObjectRef,
    ) -> Result<Option<ObjectRef>, InvokeError> {
        let guard = self.session.read_recursive();
        let Some(session) = guard.as_ref() else {
            log::error!("Python runtime doesn't appear to be running");
            return Err(InvokeError::NotRunning);
        };

        let result = InvocationRequest::from_managed(env, target, method, args)
            .map_err(|e| {
                log::error!("Unable to read native invocation: {e}");
                InvokeError::from(e)
            })
            .and_then(|request| {
                log::debug!("Native invocation {} :: {}", request.instance, request.method);
                let result = self.dispatch_request(session, env, &request);
                log::debug!("Native invocation done.");
                result
            });

        match (result, session.policy()) {
            (Ok(value), _) => Ok(value),
            (Err(_), FailurePolicy::ReturnAbsent) => Ok(None),
            (Err(e), FailurePolicy::Raise) => Err(e),
        }
    }

    /// Call the dispatch entry point and box its result, all under the
    /// interpreter's execution lock.
    pub fn dispatch_request(
        &self,
        session: &Session<I::Object>,
        env: &dyn ManagedEnv,
        request: &InvocationRequest,
    ) -> Result<Option<ObjectRef>, InvokeError> {
        let args = request.to_script_args();
        self.interpreter.exclusive(|scope| {
            let result = scope.call(session.dispatch(), &args).map_err(|e| {
                log::error!("Error invoking callback");
                InvokeError::Dispatch {
                    instance: request.instance,
                    method: request.method.clone(),
                    message: report(scope, e),
                }
            })?;
            let kind = scope.classify(&result);
            drop(result);

            marshal::box_return(env, kind).map_err(|e| {
                log::error!("Unable to box return value: {e}");
                InvokeError::from(e)
            })
        })
    }

    /// Run `f` with a managed environment for the calling thread.
    ///
    /// For interpreter-side code that calls into the managed runtime
    /// outside of an [`invoke`](Self::invoke).
    pub fn with_managed_env<R>(
        &self,
        f: impl FnOnce(&dyn ManagedEnv) -> R,
    ) -> Result<R, InvokeError> {
        let guard = self.session.read_recursive();
        let session = guard.as_ref().ok_or(InvokeError::NotRunning)?;
        let env = session.attach()?;
        Ok(f(env.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubicon_test::HeapRuntime;

    #[test]
    fn test_request_from_managed() {
        let runtime = HeapRuntime::new();
        let env = runtime.env();
        let a = runtime.string("a");
        let b = runtime.string("b");

        let request = InvocationRequest::from_managed(
            &env,
            runtime.python_instance(i64::MAX),
            runtime.method("compare"),
            runtime.array(&[a, b]),
        )
        .unwrap();

        assert_eq!(request.instance, InstanceId::new(i64::MAX));
        assert_eq!(request.method, "compare");
        assert_eq!(request.args, vec![a, b]);
    }

    #[test]
    fn test_null_args_read_as_empty() {
        let runtime = HeapRuntime::new();
        let request = InvocationRequest::from_managed(
            &runtime.env(),
            runtime.python_instance(1),
            runtime.method("run"),
            ObjectRef::NULL,
        )
        .unwrap();
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_script_args_shape() {
        let request = InvocationRequest {
            instance: InstanceId::new(0x1_0000_0001),
            method: "onClick".to_string(),
            args: vec![ObjectRef::from_raw(0x200), ObjectRef::from_raw(0x100)],
        };

        let [id, name, args] = request.to_script_args();
        assert_eq!(id, ScriptValue::Int(0x1_0000_0001));
        assert_eq!(name, ScriptValue::Str("onClick".to_string()));
        assert_eq!(
            args,
            ScriptValue::tuple([ScriptValue::Int(0x200), ScriptValue::Int(0x100)])
        );
    }
}
