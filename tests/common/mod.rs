//! Shared helpers for integration tests.

#![allow(dead_code)]

use doublecheck::core::{DoubleRef, TestDouble, Value};
use doublecheck::mocks::StubSet;
use doublecheck::runtime::{Raised, Runtime};
use doublecheck::testkit::{ACCOUNTANT, TAX_CALCULATOR};
use doublecheck::{set_current_example, Suite};
use std::sync::Arc;

/// Run `body` as one example: the example name is current and the suite's
/// stubs are installed for its duration.
pub fn run_example<T>(
    runtime: &Arc<Runtime>,
    suite: &Suite,
    name: &str,
    body: impl FnOnce(&Runtime) -> T,
) -> T {
    let _context = set_current_example(name, Some("tests/accountant.rs"));
    let _stubs = StubSet::install(runtime, suite.registry(), suite.mocked_call_sink());
    body(runtime)
}

pub fn calculator_double() -> DoubleRef {
    DoubleRef::new(TestDouble::instance_of(TAX_CALCULATOR))
}

/// An accountant working with `calculator`
pub fn accountant_with(runtime: &Runtime, calculator: Value) -> Result<Value, Raised> {
    runtime.construct(ACCOUNTANT, vec![Value::named([("tax_calculator", calculator)])])
}

/// Exercise the real calculator the way its own examples do
pub fn exercise_real_calculator(runtime: &Runtime, incomes: &[i64]) -> Result<Vec<Value>, Raised> {
    let calculator = runtime.construct(TAX_CALCULATOR, vec![])?;
    incomes
        .iter()
        .map(|income| runtime.invoke(&calculator, "for_income", vec![Value::Int(*income)]))
        .collect()
}
