//! Installing registered stubs into a runtime.
//!
//! Stubs on doubles answer messages sent to that double; stubs on real
//! targets (partial doubles) replace the method implementation at the
//! reserved stub location. Every answered message becomes a mocked
//! [`MethodCall`] handed to the sink. A sink error is raised back into the
//! calling test.

use std::sync::Arc;

use super::registry::is_allocator_stub;
use super::MockRegistry;
use crate::core::{CallTarget, DoubleRef, Value};
use crate::method_call::{MethodCall, VerificationError, ALLOCATOR};
use crate::observability::current_example;
use crate::runtime::{DoubleHandler, MethodEntry, Raised, Runtime, STUB_LOCATION};

/// Receives each mocked call as it happens
pub type MockedCallSink = Arc<dyn Fn(MethodCall) -> Result<(), VerificationError> + Send + Sync>;

/// Stubs installed on a runtime; dropping the set uninstalls them
pub struct StubSet {
    runtime: Arc<Runtime>,
    replaced: Vec<(CallTarget, String, Option<MethodEntry>)>,
    previous_handler: Option<Option<DoubleHandler>>,
}

impl StubSet {
    pub fn install(runtime: &Arc<Runtime>, registry: &MockRegistry, sink: MockedCallSink) -> Self {
        let mut set = StubSet {
            runtime: runtime.clone(),
            replaced: Vec::new(),
            previous_handler: None,
        };

        let mut double_stubs = Vec::new();
        for (target, methods) in registry.targets() {
            for method in methods {
                let (on_doubles, partial): (Vec<MethodCall>, Vec<MethodCall>) = registry
                    .stubs_for(&target, &method)
                    .iter()
                    .cloned()
                    .partition(|stub| matches!(stub.mocked_object(), Some(Value::Double(_))));
                double_stubs.extend(on_doubles);

                let (allocators, partial): (Vec<MethodCall>, Vec<MethodCall>) =
                    partial.into_iter().partition(is_allocator_stub);
                if let CallTarget::Instance(type_name) = &target {
                    let allocator = CallTarget::Static(type_name.clone());
                    set.replace(allocator, ALLOCATOR.to_string(), allocators, &sink);
                }
                set.replace(target.clone(), method, partial, &sink);
            }
        }

        if !double_stubs.is_empty() {
            let handler = double_handler(double_stubs, sink);
            set.previous_handler = Some(runtime.set_double_handler(Some(handler)));
        }

        log::debug!(
            "Installed {} partial stub(s){}",
            set.replaced.len(),
            if set.previous_handler.is_some() { " and double stubs" } else { "" }
        );
        set
    }

    /// Restore the replaced implementations and the previous double handler
    pub fn uninstall(self) {
        drop(self);
    }

    fn replace(
        &mut self,
        target: CallTarget,
        method: String,
        stubs: Vec<MethodCall>,
        sink: &MockedCallSink,
    ) {
        if stubs.is_empty() {
            return;
        }
        let entry = MethodEntry {
            implementation: partial_stub(target.clone(), method.clone(), stubs, sink.clone()),
            location: STUB_LOCATION.to_string(),
        };
        let previous = self.runtime.replace_method(&target, &method, entry);
        self.replaced.push((target, method, previous));
    }
}

impl Drop for StubSet {
    fn drop(&mut self) {
        for (target, method, previous) in std::mem::take(&mut self.replaced).into_iter().rev() {
            self.runtime.restore_method(&target, &method, previous);
        }
        if let Some(previous) = self.previous_handler.take() {
            self.runtime.set_double_handler(previous);
        }
    }
}

/// Last configured stub whose expected arguments match; a stub configured
/// without arguments matches any call
fn select_stub<'s>(stubs: &'s [MethodCall], args: &[Value]) -> Option<&'s MethodCall> {
    stubs
        .iter()
        .rev()
        .find(|stub| stub.arguments().is_empty() || stub.arguments() == args)
}

/// A constructor stub on a double answers `new` sent to it
fn answers_message(stub: &MethodCall, method: &str) -> bool {
    stub.method_name() == method || (method == ALLOCATOR && stub.is_constructor())
}

/// Record the mocked call and hand back the canned value. Constructor
/// records never carry a return value; a stubbed `new` still answers with
/// its canned value.
fn answer(
    runtime: &Runtime,
    stub: &MethodCall,
    receiver: &Value,
    args: &[Value],
    sink: &MockedCallSink,
) -> Result<Value, Raised> {
    let canned = stub.return_value().clone();
    let mut call = MethodCall::new(stub.target().clone(), stub.method_name(), args.to_vec())
        .with_mocked_object(receiver.clone())
        .with_location(STUB_LOCATION)
        .with_example(current_example());
    if let Some((_, def)) = runtime.method_def(stub.target(), stub.method_name()) {
        call = call.with_shape(def.shape);
    }
    if !call.is_constructor() {
        call = call.with_return(canned.clone());
    }

    sink(call).map_err(|err| match err {
        VerificationError::TypeCheck(_) => Raised::new("TypeCheckError", err.to_string()),
        VerificationError::Contract(_) => Raised::new("ContractError", err.to_string()),
    })?;
    Ok(canned)
}

fn unexpected(target: &CallTarget, method: &str, args: &[Value]) -> Raised {
    let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
    Raised::new(
        "MockExpectationError",
        format!(
            "{} received unexpected arguments ({})",
            target.describe(method),
            rendered.join(", ")
        ),
    )
}

fn partial_stub(
    target: CallTarget,
    method: String,
    stubs: Vec<MethodCall>,
    sink: MockedCallSink,
) -> crate::runtime::MethodImpl {
    Arc::new(move |runtime: &Runtime, receiver: &Value, args: &[Value]| {
        match select_stub(&stubs, args) {
            Some(stub) => answer(runtime, stub, receiver, args, &sink),
            None => Err(unexpected(&target, &method, args)),
        }
    })
}

fn double_handler(stubs: Vec<MethodCall>, sink: MockedCallSink) -> DoubleHandler {
    Arc::new(move |runtime: &Runtime, double: &DoubleRef, method: &str, args: &[Value]| {
        let receiver = Value::Double(double.clone());
        let candidates: Vec<MethodCall> = stubs
            .iter()
            .filter(|stub| answers_message(stub, method) && stub.mocked_object() == Some(&receiver))
            .cloned()
            .collect();

        match select_stub(&candidates, args) {
            Some(stub) => answer(runtime, stub, &receiver, args, &sink),
            None if candidates.is_empty() => Err(Raised::new(
                "MockExpectationError",
                format!("{} received unexpected message :{}", double.double(), method),
            )),
            None => Err(unexpected(candidates[0].target(), method, args)),
        }
    })
}
