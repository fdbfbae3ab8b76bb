//! End-to-end mock contract verification against the tax-calculator fixture.
//!
//! Each test configures stubs, runs an "accountant" example against a
//! double and a "calculator" example against the real implementation, then
//! checks the offenses reported at teardown. Every scenario runs under both
//! tracing strategies.

mod common;

use common::{accountant_with, calculator_double, exercise_real_calculator, run_example};
use doublecheck::testkit::{tax_result, tax_runtime, ConfigBuilder, TAX_CALCULATOR};
use doublecheck::{assert_offense, set_current_example, CallTarget, Suite, TraceStrategy, Value};

const ACCOUNTANT_EXAMPLE: &str = "Accountant#net_pay";
const CALCULATOR_EXAMPLE: &str = "TaxCalculator#for_income";

fn contract_suite(strategy: TraceStrategy) -> Suite {
    Suite::new(
        ConfigBuilder::new()
            .verify_mock_contracts()
            .trace_via(strategy)
            .build(),
    )
}

#[test]
fn test_stub_backed_by_real_calls_passes() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let double = calculator_double();
        let mut suite = contract_suite(strategy);
        suite
            .registry_mut()
            .allow_double(&double, "for_income")
            .with(vec![Value::Int(89)])
            .and_return(tax_result(19, 0.22));
        suite.cook(&runtime).unwrap();

        run_example(&runtime, &suite, ACCOUNTANT_EXAMPLE, |rt| {
            let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
            assert_eq!(
                rt.invoke(&accountant, "tax_for", vec![Value::Int(89)]),
                Ok(Value::Int(19))
            );
        });
        run_example(&runtime, &suite, CALCULATOR_EXAMPLE, |rt| {
            exercise_real_calculator(rt, &[89, -10]).unwrap();
        });

        let offenses = suite.eat().unwrap();
        assert!(offenses.is_empty(), "{}: {:?}", strategy, offenses);
        assert_eq!(suite.real_calls().len(), 2, "{}", strategy);
    }
}

#[test]
fn test_stub_returning_wrong_type_fails() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let double = calculator_double();
        let mut suite = contract_suite(strategy);
        {
            let _context = set_current_example(ACCOUNTANT_EXAMPLE, None);
            suite
                .registry_mut()
                .allow_double(&double, "for_income")
                .with(vec![Value::Int(89)])
                .and_return(Value::Int(19));
        }
        suite.cook(&runtime).unwrap();

        run_example(&runtime, &suite, ACCOUNTANT_EXAMPLE, |rt| {
            let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
            assert_eq!(
                rt.invoke(&accountant, "net_pay", vec![Value::Int(89)]),
                Ok(Value::Int(70))
            );
        });
        run_example(&runtime, &suite, CALCULATOR_EXAMPLE, |rt| {
            exercise_real_calculator(rt, &[89]).unwrap();
        });

        let offenses = suite.eat().unwrap();
        assert_eq!(offenses.len(), 1, "{}", strategy);
        assert_offense!(
            offenses[0],
            "No calls with the expected return type captured for TaxCalculator#for_income: (89) -> Integer"
        );
        assert_offense!(offenses[0], "(89) -> TaxCalculator::Result");
        assert_eq!(offenses[0].metadata.example.as_deref(), Some(ACCOUNTANT_EXAMPLE));
    }
}

#[test]
fn test_stub_with_unseen_arguments_fails() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let double = calculator_double();
        let mut suite = contract_suite(strategy);
        suite
            .registry_mut()
            .allow_double(&double, "for_income")
            .with(vec![Value::Int(-10)])
            .and_return(tax_result(0, 0.1));
        suite.cook(&runtime).unwrap();

        run_example(&runtime, &suite, ACCOUNTANT_EXAMPLE, |rt| {
            let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
            assert_eq!(
                rt.invoke(&accountant, "tax_for", vec![Value::Int(-10)]),
                Ok(Value::Int(0))
            );
        });
        run_example(&runtime, &suite, CALCULATOR_EXAMPLE, |rt| {
            exercise_real_calculator(rt, &[89]).unwrap();
        });

        let offenses = suite.eat().unwrap();
        assert_eq!(offenses.len(), 1, "{}", strategy);
        assert_offense!(
            offenses[0],
            "No matching calls captured for TaxCalculator#for_income: (-10) -> TaxCalculator::Result"
        );
        assert_offense!(offenses[0], "Captured call patterns:\n    (89) -> TaxCalculator::Result");
    }
}

#[test]
fn test_stub_of_method_never_called_for_real_fails() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let double = calculator_double();
        let mut suite = contract_suite(strategy);
        suite
            .registry_mut()
            .allow_double(&double, "for_income")
            .with(vec![Value::Int(89)])
            .and_return(tax_result(19, 0.22));
        suite.cook(&runtime).unwrap();

        run_example(&runtime, &suite, ACCOUNTANT_EXAMPLE, |rt| {
            let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
            rt.invoke(&accountant, "tax_for", vec![Value::Int(89)]).unwrap();
        });

        let offenses = suite.eat().unwrap();
        assert_eq!(offenses.len(), 1, "{}", strategy);
        assert_offense!(
            offenses[0],
            "No method calls captured for TaxCalculator#for_income"
        );
    }
}

#[test]
fn test_partial_stub_calls_never_count_as_real() {
    for strategy in TraceStrategy::ALL {
        let runtime = tax_runtime();
        let mut suite = contract_suite(strategy);
        suite
            .registry_mut()
            .allow(CallTarget::static_of(TAX_CALCULATOR), "tax_rate_for")
            .and_return(Value::Float(0.5));
        suite.cook(&runtime).unwrap();

        run_example(&runtime, &suite, CALCULATOR_EXAMPLE, |rt| {
            let rate = rt
                .invoke_static(
                    TAX_CALCULATOR,
                    "tax_rate_for",
                    vec![Value::named([("value", Value::Int(20))])],
                )
                .unwrap();
            assert_eq!(rate, Value::Float(0.5));
        });

        let offenses = suite.eat().unwrap();
        assert!(suite.real_calls().is_empty(), "{}", strategy);
        assert_eq!(offenses.len(), 1, "{}", strategy);
        assert_offense!(
            offenses[0],
            "No method calls captured for TaxCalculator.tax_rate_for"
        );
    }
}

#[test]
fn test_wildcard_stub_returning_nil_is_skipped() {
    let runtime = tax_runtime();
    let double = calculator_double();
    let mut suite = contract_suite(TraceStrategy::Wrap);
    suite
        .registry_mut()
        .allow_double(&double, "for_income")
        .and_return(Value::Nil);
    suite.cook(&runtime).unwrap();

    run_example(&runtime, &suite, ACCOUNTANT_EXAMPLE, |rt| {
        let accountant = accountant_with(rt, Value::Double(double.clone())).unwrap();
        assert!(rt.invoke(&accountant, "tax_for", vec![Value::Int(89)]).is_err());
    });

    assert!(suite.eat().unwrap().is_empty());
}
