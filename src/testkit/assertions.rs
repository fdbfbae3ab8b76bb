//! Assertion macros for verification results.
//!
//! - [`crate::assert_contains_error!`] - Assert a Result failed with a message containing a pattern
//! - [`crate::assert_offense!`] - Assert a call carries a verification error containing a pattern
//!
//! # Example
//!
//! ```rust,ignore
//! use doublecheck::{assert_contains_error, assert_offense};
//!
//! assert_contains_error!(suite.eat(), "No type checker configured");
//! assert_offense!(offenses[0], "No matching calls captured");
//! ```

/// Assert that a Result is Err and its message contains a pattern.
///
/// Returns the error.
#[macro_export]
macro_rules! assert_contains_error {
    ($result:expr, $pattern:expr) => {{
        let err = match $result {
            Ok(value) => panic!(
                "Expected Err, got Ok: {:?}\n  at {}:{}",
                value,
                file!(),
                line!()
            ),
            Err(e) => e,
        };
        let message = err.to_string();
        assert!(
            message.contains($pattern),
            "Error '{}' does not contain '{}'\n  at {}:{}",
            message,
            $pattern,
            file!(),
            line!()
        );
        err
    }};
}

/// Assert that a [`MethodCall`](crate::method_call::MethodCall) carries a
/// verification error whose message contains a pattern.
#[macro_export]
macro_rules! assert_offense {
    ($call:expr, $pattern:expr) => {{
        let call = &$call;
        match call.metadata.error.as_ref() {
            Some(error) => {
                let message = error.to_string();
                assert!(
                    message.contains($pattern),
                    "Offense on {} is '{}', expected it to contain '{}'\n  at {}:{}",
                    call.describe(),
                    message,
                    $pattern,
                    file!(),
                    line!()
                );
            }
            None => panic!(
                "Expected an offense on {}, found none\n  at {}:{}",
                call.describe(),
                file!(),
                line!()
            ),
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::contract::ContractError;
    use crate::core::CallTarget;
    use crate::method_call::MethodCall;

    #[test]
    fn test_assert_contains_error_returns_error() {
        let result: Result<(), String> = Err("No type checker configured".to_string());
        let err = assert_contains_error!(result, "type checker");
        assert_eq!(err, "No type checker configured");
    }

    #[test]
    fn test_assert_offense_matches_message() {
        let mut call = MethodCall::new(CallTarget::instance("TaxCalculator"), "for_income", vec![]);
        call.metadata.error = Some(
            ContractError::NoMethodCalls {
                method_desc: call.describe(),
            }
            .into(),
        );
        assert_offense!(call, "No method calls captured");
    }

    #[test]
    #[should_panic(expected = "Expected an offense")]
    fn test_assert_offense_without_error_panics() {
        let call = MethodCall::new(CallTarget::instance("T"), "m", vec![]);
        assert_offense!(call, "anything");
    }
}
