//! Builders for call records and configurations.
//!
//! ```rust,ignore
//! use doublecheck::testkit::helpers::{real_call, ConfigBuilder};
//!
//! let call = real_call(CallTarget::instance("TaxCalculator"), "for_income", vec![Value::Int(89)], Value::Int(19));
//! let config = ConfigBuilder::new().verify_mock_contracts().build();
//! ```

use std::path::PathBuf;

use crate::config::Configuration;
use crate::core::{CallTarget, Value};
use crate::method_call::MethodCall;
use crate::runtime::STUB_LOCATION;
use crate::tracer::TraceStrategy;
use crate::type_checks::TypeCheckKind;

/// A completed real call located in the fixture sources
pub fn real_call(target: CallTarget, method: &str, args: Vec<Value>, returns: Value) -> MethodCall {
    MethodCall::new(target, method, args)
        .with_return(returns)
        .with_location("fixtures/tax_calculator.rs:1")
}

/// A mocked call as the stub layer reports it
pub fn mocked_call(target: CallTarget, method: &str, args: Vec<Value>, returns: Value) -> MethodCall {
    MethodCall::new(target, method, args)
        .with_return(returns)
        .with_location(STUB_LOCATION)
}

/// Fluent [`Configuration`] construction; flag implications are applied
/// as in the config file
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Configuration,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_check(mut self, kind: TypeCheckKind) -> Self {
        self.config.type_check = Some(kind);
        self
    }

    pub fn signature_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.signature_load_dirs = vec![dir.into()];
        self
    }

    pub fn auto_type_check(mut self) -> Self {
        self.config.set_auto_type_check(true);
        self
    }

    pub fn verify_mock_contracts(mut self) -> Self {
        self.config.set_verify_mock_contracts(true);
        self
    }

    pub fn trace_via(mut self, strategy: TraceStrategy) -> Self {
        self.config.trace_real_calls = true;
        self.config.trace_real_calls_via = strategy;
        self
    }

    pub fn raise_on_missing_types(mut self, raise: bool) -> Self {
        self.config.raise_on_missing_types = raise;
        self
    }

    pub fn raise_on_missing_auto_types(mut self, raise: bool) -> Self {
        self.config.raise_on_missing_auto_types = raise;
        self
    }

    pub fn build(self) -> Configuration {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_applies_implications() {
        let config = ConfigBuilder::new()
            .type_check(TypeCheckKind::Annotations)
            .auto_type_check()
            .trace_via(TraceStrategy::Events)
            .build();

        assert!(config.trace_real_calls);
        assert!(config.store_mocked_calls);
        assert_eq!(config.trace_real_calls_via, TraceStrategy::Events);
    }

    #[test]
    fn test_mocked_call_is_located_in_stub_layer() {
        let call = mocked_call(CallTarget::instance("T"), "m", vec![], Value::Nil);
        assert_eq!(call.metadata.location.as_deref(), Some(STUB_LOCATION));
        assert!(call.is_completed());
    }
}
