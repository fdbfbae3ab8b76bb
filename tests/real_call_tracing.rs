//! Real-call tracing under both interception strategies.

use doublecheck::core::{MethodShape, TestDouble};
use doublecheck::runtime::{Raised, TypeDef};
use doublecheck::testkit::{tax_runtime, ACCOUNTANT, TAX_CALCULATOR, TAX_RESULT};
use doublecheck::{CallFilter, CallTarget, MethodCall, Runtime, TraceStrategy, Tracer, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const MATH: &str = "Math";

/// `Math#factorial(n)` recursing through the runtime, raising below zero
fn math_runtime() -> Arc<Runtime> {
    let runtime = Runtime::new();
    runtime.define_type(TypeDef::new(MATH));
    runtime.define_method(
        CallTarget::instance(MATH),
        "factorial",
        MethodShape::new().req("n"),
        "fixtures/math.rs:3",
        |rt, receiver, args| match args.first() {
            Some(Value::Int(n)) if *n < 0 => Err(Raised::new("ArgumentError", "negative input")),
            Some(Value::Int(0)) => Ok(Value::Int(1)),
            Some(Value::Int(n)) => match rt.invoke(receiver, "factorial", vec![Value::Int(n - 1)])? {
                Value::Int(rest) => Ok(Value::Int(n * rest)),
                other => Err(Raised::new("TypeError", format!("unexpected {}", other))),
            },
            _ => Err(Raised::new("ArgumentError", "expected an integer")),
        },
    );
    Arc::new(runtime)
}

fn summary(calls: &[MethodCall]) -> Vec<(Vec<Value>, Option<Value>)> {
    calls
        .iter()
        .map(|call| {
            (
                call.arguments().to_vec(),
                call.is_completed().then(|| call.return_value().clone()),
            )
        })
        .collect()
}

#[test]
fn test_recursive_calls_complete_their_own_records() {
    for strategy in TraceStrategy::ALL {
        let runtime = math_runtime();
        let mut tracer = Tracer::new(strategy);
        tracer.register(CallTarget::instance(MATH), ["factorial"]);
        tracer.start(&runtime).unwrap();

        let math = runtime.construct(MATH, vec![]).unwrap();
        assert_eq!(
            runtime.invoke(&math, "factorial", vec![Value::Int(3)]),
            Ok(Value::Int(6))
        );

        let calls = tracer.stop();
        assert_eq!(
            summary(&calls),
            vec![
                (vec![Value::Int(3)], Some(Value::Int(6))),
                (vec![Value::Int(2)], Some(Value::Int(2))),
                (vec![Value::Int(1)], Some(Value::Int(1))),
                (vec![Value::Int(0)], Some(Value::Int(1))),
            ],
            "{}",
            strategy
        );
    }
}

#[test]
fn test_raised_call_stays_incomplete() {
    for strategy in TraceStrategy::ALL {
        let runtime = math_runtime();
        let mut tracer = Tracer::new(strategy);
        tracer.register(CallTarget::instance(MATH), ["factorial"]);
        tracer.start(&runtime).unwrap();

        let math = runtime.construct(MATH, vec![]).unwrap();
        assert!(runtime.invoke(&math, "factorial", vec![Value::Int(-1)]).is_err());
        assert_eq!(
            runtime.invoke(&math, "factorial", vec![Value::Int(1)]),
            Ok(Value::Int(1))
        );

        let calls = tracer.stop();
        assert_eq!(calls.len(), 3, "{}", strategy);
        assert!(!calls[0].is_completed());
        assert!(calls[0]
            .metadata
            .raised
            .as_deref()
            .is_some_and(|raised| raised.contains("negative input")));
        assert_eq!(calls[1].return_value(), &Value::Int(1));
        assert_eq!(calls[2].return_value(), &Value::Int(1));
    }
}

#[test]
fn test_strategies_record_named_arguments_alike() {
    let recorded: Vec<Vec<MethodCall>> = TraceStrategy::ALL
        .into_iter()
        .map(|strategy| {
            let runtime = tax_runtime();
            let mut tracer = Tracer::new(strategy);
            tracer.register(CallTarget::static_of(TAX_CALCULATOR), ["tax_rate_for"]);
            tracer.start(&runtime).unwrap();

            let calculator = runtime.construct(TAX_CALCULATOR, vec![]).unwrap();
            runtime
                .invoke(&calculator, "for_income", vec![Value::Int(89)])
                .unwrap();
            tracer.stop()
        })
        .collect();

    for calls in &recorded {
        assert_eq!(calls.len(), 1);
        assert!(calls[0].has_named_args());
        assert_eq!(calls[0].named_args().to_vec(), vec![(Value::sym("value"), Value::Int(89))]);
        assert_eq!(calls[0].return_value(), &Value::Float(0.22));
    }
    assert_eq!(summary(&recorded[0]), summary(&recorded[1]));
}

#[test]
fn test_constructor_traced_through_allocator() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let mut tracer = Tracer::new(strategy);
        tracer.register(CallTarget::static_of(ACCOUNTANT), ["new"]);
        tracer.start(&runtime).unwrap();

        let calculator = runtime.construct(TAX_CALCULATOR, vec![]).unwrap();
        runtime
            .construct(ACCOUNTANT, vec![Value::named([("tax_calculator", calculator)])])
            .unwrap();
        runtime
            .construct(
                ACCOUNTANT,
                vec![Value::named([(
                    "tax_calculator",
                    Value::double(TestDouble::instance_of(TAX_CALCULATOR)),
                )])],
            )
            .unwrap();

        let calls = tracer.stop();
        assert_eq!(calls.len(), 1, "{}", strategy);
        assert!(calls[0].is_constructor());
        assert!(!calls[0].is_completed());
        assert_eq!(calls[0].describe(), "Accountant#initialize");
        assert_eq!(tracer.stats().filtered, 1);
    }
}

#[test]
fn test_stop_is_idempotent_and_uninstalls() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let mut tracer = Tracer::new(strategy);
        tracer.register(CallTarget::instance(TAX_RESULT), ["result"]);
        tracer.start(&runtime).unwrap();

        let calculator = runtime.construct(TAX_CALCULATOR, vec![]).unwrap();
        let result = runtime
            .invoke(&calculator, "for_income", vec![Value::Int(50)])
            .unwrap();
        runtime.invoke(&result, "result", vec![]).unwrap();

        let first = tracer.stop();
        runtime.invoke(&result, "result", vec![]).unwrap();
        let second = tracer.stop();

        assert_eq!(first.len(), 1, "{}", strategy);
        assert_eq!(summary(&first), summary(&second));
        assert!(!tracer.is_running());
    }
}

#[test]
fn test_ignored_locations_filtered_at_stop() {
    let runtime = tax_runtime();
    let filter = CallFilter::with_patterns(&["^fixtures/tax_calculator"]).unwrap();
    let mut tracer = Tracer::new(TraceStrategy::Events).with_filter(filter);
    tracer.register(CallTarget::instance(TAX_CALCULATOR), ["for_income"]);
    tracer.start(&runtime).unwrap();

    let calculator = runtime.construct(TAX_CALCULATOR, vec![]).unwrap();
    runtime
        .invoke(&calculator, "for_income", vec![Value::Int(10)])
        .unwrap();

    assert!(tracer.stop().is_empty());
    assert_eq!(tracer.stats().collected, 1);
    assert_eq!(tracer.stats().kept(), 0);
}
