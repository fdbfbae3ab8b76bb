//! The tax-calculator fixture program.
//!
//! | Method | Behavior |
//! |--------|----------|
//! | `TaxCalculator#for_income(val)` | `nil` for negative income, else a `TaxCalculator::Result` |
//! | `TaxCalculator#tax_rate_for(value:)` | delegates to the static method |
//! | `TaxCalculator.tax_rate_for(value:)` | bracket lookup, `nil` above the top bracket |
//! | `TaxCalculator::Result#result` | the computed tax |
//! | `Accountant#initialize(tax_calculator:)` | stores the calculator, building one when absent |
//! | `Accountant#net_pay(val)` | `val` minus the calculator's answer |
//! | `Accountant#tax_for(val)` | `for_income(val).result` |
//! | `Accountant#tax_rate_for(value)` | passes `value` positionally to the calculator |

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::{CallTarget, MethodShape, ObjectRef, Value};
use crate::method_call::CONSTRUCTOR;
use crate::runtime::{Raised, Runtime, TypeDef};

pub const TAX_CALCULATOR: &str = "TaxCalculator";
pub const TAX_RESULT: &str = "TaxCalculator::Result";
pub const ACCOUNTANT: &str = "Accountant";

/// Upper bound (exclusive) of each bracket and its rate
pub const TAX_BRACKETS: [(i64, f64); 5] = [(10, 0.1), (40, 0.12), (90, 0.22), (170, 0.24), (215, 0.32)];

const SOURCE: &str = "fixtures/tax_calculator.rs";

fn at(line: u32) -> String {
    format!("{}:{}", SOURCE, line)
}

/// A `TaxCalculator::Result` value
pub fn tax_result(result: i64, tax_rate: f64) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("result".to_string(), Value::Int(result));
    fields.insert("tax_rate".to_string(), Value::Float(tax_rate));
    Value::Object(ObjectRef::with_fields(TAX_RESULT, fields))
}

/// Bracket rate for `value`, or nil above the top bracket
pub fn bracket_rate(value: i64) -> Value {
    TAX_BRACKETS
        .iter()
        .find(|(limit, _)| *limit > value)
        .map_or(Value::Nil, |(_, rate)| Value::Float(*rate))
}

fn integer_arg(args: &[Value], index: usize) -> Result<i64, Raised> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(Raised::new(
            "TypeError",
            format!("{} can't be coerced into Integer", other.type_name()),
        )),
        None => Err(Raised::new("ArgumentError", "wrong number of arguments (given 0, expected 1)")),
    }
}

fn keyword_value(args: &[Value]) -> Result<Value, Raised> {
    args.last()
        .and_then(|named| named.map_get(&Value::sym("value")))
        .cloned()
        .ok_or_else(|| Raised::new("ArgumentError", "missing keyword: :value"))
}

fn field(receiver: &Value, name: &str) -> Value {
    match receiver {
        Value::Object(object) => object.get(name).unwrap_or(Value::Nil),
        _ => Value::Nil,
    }
}

/// Runtime with the fixture program defined
pub fn tax_runtime() -> Arc<Runtime> {
    let runtime = Runtime::new();
    define_tax_calculator(&runtime);
    define_accountant(&runtime);
    Arc::new(runtime)
}

fn define_tax_calculator(runtime: &Runtime) {
    runtime.define_type(TypeDef::new(TAX_CALCULATOR));
    runtime.define_type(TypeDef::new(TAX_RESULT));

    runtime.define_method(
        CallTarget::instance(TAX_CALCULATOR),
        "for_income",
        MethodShape::new().req("val"),
        at(14),
        |rt, receiver, args| {
            let income = integer_arg(args, 0)?;
            if income < 0 {
                return Ok(Value::Nil);
            }
            let rate = rt.invoke(
                receiver,
                "tax_rate_for",
                vec![Value::named([("value", Value::Int(income))])],
            )?;
            match rate {
                Value::Float(rate) => Ok(tax_result((rate * income as f64) as i64, rate)),
                other => Err(Raised::new(
                    "NoMethodError",
                    format!("undefined method `*` for {}", other),
                )),
            }
        },
    );

    runtime.define_method(
        CallTarget::instance(TAX_CALCULATOR),
        "tax_rate_for",
        MethodShape::new().key_req("value"),
        at(22),
        |rt, _, args| rt.invoke_static(TAX_CALCULATOR, "tax_rate_for", args.to_vec()),
    );

    runtime.define_method(
        CallTarget::static_of(TAX_CALCULATOR),
        "tax_rate_for",
        MethodShape::new().key_req("value"),
        at(26),
        |_, _, args| match keyword_value(args)? {
            Value::Int(value) => Ok(bracket_rate(value)),
            other => Err(Raised::new(
                "ArgumentError",
                format!("comparison of Integer with {} failed", other.type_name()),
            )),
        },
    );

    runtime.define_method(
        CallTarget::instance(TAX_RESULT),
        "result",
        MethodShape::new(),
        at(4),
        |_, receiver, _| Ok(field(receiver, "result")),
    );
}

fn define_accountant(runtime: &Runtime) {
    runtime.define_type(TypeDef::new(ACCOUNTANT));

    runtime.define_method(
        CallTarget::instance(ACCOUNTANT),
        CONSTRUCTOR,
        MethodShape::new().key("tax_calculator"),
        at(34),
        |rt, receiver, args| {
            let calculator = match args
                .last()
                .and_then(|named| named.map_get(&Value::sym("tax_calculator")))
            {
                Some(calculator) => calculator.clone(),
                None => rt.construct(TAX_CALCULATOR, vec![])?,
            };
            if let Value::Object(object) = receiver {
                object.set("tax_calculator", calculator);
            }
            Ok(Value::Nil)
        },
    );

    runtime.define_method(
        CallTarget::instance(ACCOUNTANT),
        "net_pay",
        MethodShape::new().req("val"),
        at(38),
        |rt, receiver, args| {
            let income = integer_arg(args, 0)?;
            let tax = rt.invoke(&field(receiver, "tax_calculator"), "for_income", vec![Value::Int(income)])?;
            let tax = integer_arg(&[tax], 0)?;
            Ok(Value::Int(income - tax))
        },
    );

    runtime.define_method(
        CallTarget::instance(ACCOUNTANT),
        "tax_for",
        MethodShape::new().req("val"),
        at(42),
        |rt, receiver, args| {
            let result = rt.invoke(&field(receiver, "tax_calculator"), "for_income", args.to_vec())?;
            rt.invoke(&result, "result", vec![])
        },
    );

    runtime.define_method(
        CallTarget::instance(ACCOUNTANT),
        "tax_rate_for",
        MethodShape::new().req("value"),
        at(46),
        |rt, receiver, args| rt.invoke(&field(receiver, "tax_calculator"), "tax_rate_for", args.to_vec()),
    );
}
