//! Event-stream strategy: correlate call and return events on a stack.
//!
//! Every call event pushes a frame, watched or not, and every return or
//! unwind event pops one. Since events nest strictly, the popped frame is
//! always the call that is finishing, so recursion and re-entrant calls
//! complete the right records.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{complete_at, push_call, raise_at, CallStore, Targets};
use crate::core::{BoundParam, CallTarget, ParamKind, Value};
use crate::method_call::MethodCall;
use crate::observability::current_example;
use crate::runtime::{Runtime, SubscriptionId, TraceEvent};

pub(crate) fn subscribe(runtime: &Runtime, targets: Targets, store: CallStore) -> SubscriptionId {
    let frames: Mutex<Vec<Option<usize>>> = Mutex::new(Vec::new());

    runtime.subscribe(Arc::new(move |event: &TraceEvent<'_>| match event {
        TraceEvent::Call {
            target,
            method,
            receiver,
            binding,
            location,
        } => {
            let frame = watched_target(&targets, target, receiver, method).map(|watched| {
                push_call(&store, record_from_binding(watched, method, binding, location))
            });
            frames.lock().push(frame);
        }
        TraceEvent::Return { value, .. } => {
            let frame = frames.lock().pop();
            if let Some(Some(index)) = frame {
                complete_at(&store, index, value);
            }
        }
        TraceEvent::Unwind { error, .. } => {
            let frame = frames.lock().pop();
            if let Some(Some(index)) = frame {
                raise_at(&store, index, error);
            }
        }
    }))
}

/// The registered target an event belongs to: the receiver's own type
/// first, then the type defining the running implementation
fn watched_target(
    targets: &Targets,
    owner: &CallTarget,
    receiver: &Value,
    method: &str,
) -> Option<CallTarget> {
    let observed = match receiver {
        Value::Type(type_name) => CallTarget::Static(type_name.clone()),
        other => CallTarget::Instance(other.type_name()),
    };

    [observed, owner.clone()].into_iter().find(|candidate| {
        targets
            .iter()
            .any(|(target, methods)| target == candidate && methods.iter().any(|m| m == method))
    })
}

/// Rebuild the argument list from a frame binding: rest parameters are
/// spread, keyword parameters gathered into a trailing map
fn record_from_binding(
    target: CallTarget,
    method: &str,
    binding: &[BoundParam],
    location: &str,
) -> MethodCall {
    let mut arguments = Vec::new();
    let mut named: Vec<(Value, Value)> = Vec::new();

    for param in binding {
        match param.kind {
            ParamKind::Required | ParamKind::Optional => arguments.push(param.value.clone()),
            ParamKind::Rest => match &param.value {
                Value::Array(items) => arguments.extend(items.iter().cloned()),
                other => arguments.push(other.clone()),
            },
            ParamKind::KeyRequired | ParamKind::Key => {
                named.push((Value::sym(param.name.as_str()), param.value.clone()));
            }
            ParamKind::KeyRest => {
                if let Some(pairs) = param.value.as_map() {
                    named.extend(pairs.iter().cloned());
                }
            }
            ParamKind::NoKey | ParamKind::Block => {}
        }
    }

    let has_named_args = !named.is_empty();
    if has_named_args {
        arguments.push(Value::Map(named));
    }

    MethodCall::new(target, method, arguments)
        .with_named_args(has_named_args)
        .with_location(location)
        .with_example(current_example())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MethodShape;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_spreads_rest_and_gathers_keywords() {
        let shape = MethodShape::new().req("a").rest("more").key("value").key_rest("opts");
        let binding = shape.bind(&[
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::named([("value", Value::Int(4)), ("extra", Value::Bool(true))]),
        ]);

        let call = record_from_binding(CallTarget::instance("T"), "m", &binding, "t.rs:1");

        assert!(call.has_named_args());
        assert_eq!(call.positional_args(), &[Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(
            call.arguments().last(),
            Some(&Value::named([("value", Value::Int(4)), ("extra", Value::Bool(true))]))
        );
        assert_eq!(call.metadata.location.as_deref(), Some("t.rs:1"));
    }

    #[test]
    fn test_watched_target_prefers_receiver_type() {
        let targets: Targets = vec![(CallTarget::instance("TaxCalculator"), vec!["for_income".into()])];
        let receiver = Value::object("TaxCalculator");

        assert_eq!(
            watched_target(&targets, &CallTarget::instance("Calculator"), &receiver, "for_income"),
            Some(CallTarget::instance("TaxCalculator"))
        );
        assert_eq!(
            watched_target(&targets, &CallTarget::instance("Calculator"), &receiver, "round"),
            None
        );
    }
}
