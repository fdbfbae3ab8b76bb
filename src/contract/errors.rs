//! Contract verification failures.

use thiserror::Error;

/// Why real calls do not back a mocked call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Nothing was captured for the method at all
    #[error("Mock contract verification failed:\n  No method calls captured for {method_desc}")]
    NoMethodCalls { method_desc: String },

    /// Real calls exist, but none with the stubbed arguments
    #[error(
        "Mock contract verification failed:\n  No matching calls captured for {pattern_desc}.\n  Captured call patterns:\n{}",
        captured.join("\n")
    )]
    NoMatchingMethodCalls {
        pattern_desc: String,
        captured: Vec<String>,
    },

    /// Calls with the stubbed arguments never returned the stubbed type
    #[error(
        "Mock contract verification failed:\n  No calls with the expected return type captured for {pattern_desc}.\n  Captured call patterns:\n{}",
        captured.join("\n")
    )]
    NoMatchingReturnType {
        pattern_desc: String,
        captured: Vec<String>,
    },
}

impl ContractError {
    /// Stable identifier of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            ContractError::NoMethodCalls { .. } => "no_method_calls",
            ContractError::NoMatchingMethodCalls { .. } => "no_matching_method_calls",
            ContractError::NoMatchingReturnType { .. } => "no_matching_return_type",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_method_calls_message() {
        let err = ContractError::NoMethodCalls {
            method_desc: "TaxCalculator#for_income".into(),
        };
        assert_eq!(
            err.to_string(),
            "Mock contract verification failed:\n  No method calls captured for TaxCalculator#for_income"
        );
    }

    #[test]
    fn test_captured_patterns_listed_one_per_line() {
        let err = ContractError::NoMatchingMethodCalls {
            pattern_desc: "TaxCalculator#for_income: (-10) -> TaxCalculator::Result".into(),
            captured: vec!["    (89) -> Integer".into(), "    (0) -> Nil".into()],
        };
        assert_eq!(
            err.to_string(),
            "Mock contract verification failed:\n  \
             No matching calls captured for TaxCalculator#for_income: (-10) -> TaxCalculator::Result.\n  \
             Captured call patterns:\n    (89) -> Integer\n    (0) -> Nil"
        );
        assert_eq!(err.kind(), "no_matching_method_calls");
    }
}
