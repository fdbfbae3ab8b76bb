//! Rejection of captured calls that are artifacts of mocking.
//!
//! A real call is discarded when its implementation lives in the mocking
//! layer, or when a test double flows through it (return value, positional
//! argument, or named argument value). Only the top level is inspected.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{Result, Value};
use crate::method_call::MethodCall;
use crate::runtime::STUB_LOCATION;

static STUB_LOCATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{}$", regex::escape(STUB_LOCATION))).expect("valid stub location pattern")
});

#[derive(Debug, Clone)]
pub struct CallFilter {
    ignored_locations: Vec<Regex>,
}

impl Default for CallFilter {
    fn default() -> Self {
        Self {
            ignored_locations: vec![STUB_LOCATION_PATTERN.clone()],
        }
    }
}

impl CallFilter {
    /// Default filter plus extra location patterns
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut filter = Self::default();
        for pattern in patterns {
            filter.ignored_locations.push(Regex::new(pattern.as_ref())?);
        }
        Ok(filter)
    }

    fn ignored_location(&self, call: &MethodCall) -> bool {
        call.metadata
            .location
            .as_deref()
            .is_some_and(|location| self.ignored_locations.iter().any(|re| re.is_match(location)))
    }

    /// Whether `call` must not be used as ground truth
    pub fn is_mock_artifact(&self, call: &MethodCall) -> bool {
        self.ignored_location(call)
            || call.return_value().is_double()
            || call.positional_args().iter().any(Value::is_double)
            || call.named_args().iter().any(|(_, value)| value.is_double())
    }

    /// Keep only genuine calls, preserving order
    pub fn retain_real(&self, calls: Vec<MethodCall>) -> Vec<MethodCall> {
        calls
            .into_iter()
            .filter(|call| !self.is_mock_artifact(call))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CallTarget, MethodShape, TestDouble};
    use std::sync::Arc;

    fn call(args: Vec<Value>) -> MethodCall {
        MethodCall::new(CallTarget::instance("TaxCalculator"), "for_income", args)
            .with_location("tax_calculator.rs:10")
    }

    fn double() -> Value {
        Value::double(TestDouble::instance_of("TaxCalculator"))
    }

    #[test]
    fn test_real_call_kept() {
        let filter = CallFilter::default();
        assert!(!filter.is_mock_artifact(&call(vec![Value::Int(89)]).with_return(Value::Int(19))));
    }

    #[test]
    fn test_stub_location_rejected() {
        let filter = CallFilter::default();
        let stubbed = call(vec![Value::Int(89)]).with_location(STUB_LOCATION);
        assert!(filter.is_mock_artifact(&stubbed));
    }

    #[test]
    fn test_doubles_rejected_in_any_position() {
        let filter = CallFilter::default();

        assert!(filter.is_mock_artifact(&call(vec![]).with_return(double())));
        assert!(filter.is_mock_artifact(&call(vec![Value::Int(1), double()])));

        let named = MethodCall::new(
            CallTarget::instance("Accountant"),
            "initialize",
            vec![Value::named([("tax_calculator", double())])],
        )
        .with_shape(Arc::new(MethodShape::new().key_req("tax_calculator")));
        assert!(filter.is_mock_artifact(&named));
    }

    #[test]
    fn test_nested_doubles_not_inspected() {
        let filter = CallFilter::default();
        let nested = call(vec![Value::Array(vec![double()])]);
        assert!(!filter.is_mock_artifact(&nested));
    }

    #[test]
    fn test_extra_patterns() {
        let filter = CallFilter::with_patterns(&["^vendor/mocks/"]).unwrap();
        let vendored = call(vec![]).with_location("vendor/mocks/proxy.rs:4");
        assert!(filter.is_mock_artifact(&vendored));
        assert!(CallFilter::with_patterns(&["("]).is_err());
    }
}
