//! Inline and automatic type checking of mocked calls.

mod common;

use common::{accountant_with, calculator_double, exercise_real_calculator, run_example};
use doublecheck::testkit::{tax_result, tax_runtime, ConfigBuilder, TAX_CALCULATOR};
use doublecheck::type_checks::MethodSignature;
use doublecheck::{
    assert_contains_error, assert_offense, CallTarget, Suite, TraceStrategy, TypeCheckKind, Value,
};
use indoc::indoc;
use std::fs;
use tempfile::TempDir;

fn auto_suite(strategy: TraceStrategy) -> Suite {
    Suite::new(
        ConfigBuilder::new()
            .type_check(TypeCheckKind::Annotations)
            .auto_type_check()
            .trace_via(strategy)
            .build(),
    )
}

#[test]
fn test_auto_type_check_flags_string_income() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let double = calculator_double();
        let mut suite = auto_suite(strategy);
        suite
            .registry_mut()
            .allow_double(&double, "for_income")
            .and_return(tax_result(25, 0.2));
        suite.cook(&runtime).unwrap();

        run_example(&runtime, &suite, "Accountant#tax_for", |rt| {
            let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
            assert_eq!(
                rt.invoke(&accountant, "tax_for", vec![Value::Int(120)]),
                Ok(Value::Int(25))
            );
            assert_eq!(
                rt.invoke(&accountant, "tax_for", vec![Value::str("125")]),
                Ok(Value::Int(25))
            );
        });
        run_example(&runtime, &suite, "TaxCalculator#for_income", |rt| {
            exercise_real_calculator(rt, &[89, 120]).unwrap();
        });

        assert_eq!(suite.stored_mocked_calls().len(), 2);
        let offenses = suite.eat().unwrap();
        assert_eq!(offenses.len(), 1, "{}", strategy);
        assert_eq!(offenses[0].arguments(), &[Value::str("125")]);
        assert_offense!(offenses[0], "expected `Integer`, got `String`");
        assert_eq!(offenses[0].metadata.example.as_deref(), Some("Accountant#tax_for"));
    }
}

#[test]
fn test_missing_real_calls_fail_auto_check_by_default() {
    let runtime = tax_runtime();
    let double = calculator_double();
    let mut suite = auto_suite(TraceStrategy::Wrap);
    suite
        .registry_mut()
        .allow_double(&double, "for_income")
        .and_return(tax_result(25, 0.2));
    suite.cook(&runtime).unwrap();

    run_example(&runtime, &suite, "Accountant#tax_for", |rt| {
        let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
        rt.invoke(&accountant, "tax_for", vec![Value::Int(120)]).unwrap();
    });

    let offenses = suite.eat().unwrap();
    assert_eq!(offenses.len(), 1);
    assert_offense!(offenses[0], "No signature found for TaxCalculator#for_income");
}

#[test]
fn test_missing_real_calls_tolerated_when_configured() {
    let runtime = tax_runtime();
    let double = calculator_double();
    let config = ConfigBuilder::new()
        .type_check(TypeCheckKind::Annotations)
        .auto_type_check()
        .raise_on_missing_auto_types(false)
        .build();
    let mut suite = Suite::new(config);
    suite
        .registry_mut()
        .allow_double(&double, "for_income")
        .and_return(tax_result(25, 0.2));
    suite.cook(&runtime).unwrap();

    run_example(&runtime, &suite, "Accountant#tax_for", |rt| {
        let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
        rt.invoke(&accountant, "tax_for", vec![Value::Int(120)]).unwrap();
    });

    assert!(suite.eat().unwrap().is_empty());
}

#[test]
fn test_auto_type_check_without_backend_is_fatal() {
    let runtime = tax_runtime();
    let mut suite = Suite::new(ConfigBuilder::new().auto_type_check().build());
    suite.cook(&runtime).unwrap();

    assert_contains_error!(suite.eat(), "No type checker configured");
}

#[test]
fn test_declared_signature_rejects_mocked_return_inline() {
    let sig_dir = TempDir::new().unwrap();
    fs::write(
        sig_dir.path().join("tax_calculator.toml"),
        indoc! {r#"
            [[types]]
            name = "TaxCalculator::Result"

            [[methods]]
            method = "TaxCalculator#for_income"
            signature = "(Integer) -> TaxCalculator::Result | Nil"
        "#},
    )
    .unwrap();

    let runtime = tax_runtime();
    let double = calculator_double();
    let config = ConfigBuilder::new()
        .type_check(TypeCheckKind::Signatures)
        .signature_dir(sig_dir.path())
        .build();
    let mut suite = Suite::new(config);
    suite
        .registry_mut()
        .allow_double(&double, "for_income")
        .and_return(Value::Int(19));
    suite.cook(&runtime).unwrap();

    run_example(&runtime, &suite, "Accountant#net_pay", |rt| {
        let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
        let err = rt
            .invoke(&accountant, "net_pay", vec![Value::Int(89)])
            .unwrap_err();
        assert_eq!(err.type_name.as_str(), "TypeCheckError");
    });

    assert!(suite.eat().unwrap().is_empty());
}

#[test]
fn test_annotated_signature_checks_partial_stub_inline() {
    let runtime = tax_runtime();
    runtime.annotate(
        &CallTarget::static_of(TAX_CALCULATOR),
        "tax_rate_for",
        MethodSignature::parse("(value: Integer) -> Float | Nil").unwrap(),
    );
    let mut suite = Suite::new(
        ConfigBuilder::new()
            .type_check(TypeCheckKind::Annotations)
            .build(),
    );
    suite
        .registry_mut()
        .allow(CallTarget::static_of(TAX_CALCULATOR), "tax_rate_for")
        .and_return(Value::str("ten percent"));
    suite.cook(&runtime).unwrap();

    run_example(&runtime, &suite, "TaxCalculator.tax_rate_for", |rt| {
        let err = rt
            .invoke_static(
                TAX_CALCULATOR,
                "tax_rate_for",
                vec![Value::named([("value", Value::Int(10))])],
            )
            .unwrap_err();
        assert_eq!(err.type_name.as_str(), "TypeCheckError");
    });
}
