//! Wrapping strategy: swap each traced method for a recording wrapper.
//!
//! The wrapper records the arguments before forwarding to the original
//! implementation and attaches the outcome afterwards. Arguments and return
//! values pass through untouched.

use std::sync::Arc;

use super::{complete_at, push_call, raise_at, CallStore, Targets};
use crate::core::{CallTarget, MethodShape, Value};
use crate::method_call::MethodCall;
use crate::observability::current_example;
use crate::runtime::{MethodEntry, MethodImpl, Runtime};

/// A wrapper installed on the runtime and what it displaced
pub(crate) struct WrappedMethod {
    target: CallTarget,
    method: String,
    previous: Option<MethodEntry>,
}

pub(crate) fn install(runtime: &Runtime, targets: &Targets, store: &CallStore) -> Vec<WrappedMethod> {
    let mut installed = Vec::new();

    for (target, methods) in targets {
        for method in methods {
            let Some((_, original)) = runtime.resolve(target, method) else {
                log::warn!("Cannot trace {}: method is not defined", target.describe(method));
                continue;
            };
            let shape = runtime.method_def(target, method).map(|(_, def)| def.shape);
            let wrapper = MethodEntry {
                implementation: wrapper_for(target, method, &original, shape, store),
                location: original.location.clone(),
            };
            let previous = runtime.replace_method(target, method, wrapper);
            installed.push(WrappedMethod {
                target: target.clone(),
                method: method.clone(),
                previous,
            });
        }
    }

    installed
}

/// Restore whatever each wrapper displaced, newest first
pub(crate) fn uninstall(runtime: &Runtime, installed: Vec<WrappedMethod>) {
    for wrapped in installed.into_iter().rev() {
        runtime.restore_method(&wrapped.target, &wrapped.method, wrapped.previous);
    }
}

fn wrapper_for(
    target: &CallTarget,
    method: &str,
    original: &MethodEntry,
    shape: Option<Arc<MethodShape>>,
    store: &CallStore,
) -> MethodImpl {
    let target = target.clone();
    let method = method.to_string();
    let original = original.clone();
    let store = store.clone();

    Arc::new(move |runtime: &Runtime, receiver: &Value, args: &[Value]| {
        let mut call = MethodCall::new(target.clone(), method.clone(), args.to_vec())
            .with_location(original.location.clone())
            .with_example(current_example());
        if let Some(shape) = &shape {
            call = call.with_shape(shape.clone());
        }
        let index = push_call(&store, call);

        let result = (original.implementation)(runtime, receiver, args);
        match &result {
            Ok(value) => complete_at(&store, index, value),
            Err(raised) => raise_at(&store, index, raised),
        }
        result
    })
}
