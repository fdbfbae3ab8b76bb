//! Behavioral contracts synthesized from stubs.
//!
//! A contract keeps the comparable parts of one stubbed call (argument
//! values that can be matched by equality, and the runtime type of the
//! canned return value) and asks whether reality ever behaved that way.

pub mod errors;

pub use errors::ContractError;

use std::fmt;

use crate::core::{CallTarget, Subtyping, TypeName, Value, NIL};
use crate::method_call::MethodCall;

/// One slot of a contract's argument pattern
#[derive(Debug, Clone, PartialEq)]
pub enum ArgPattern {
    Exact(Value),
    Anything,
}

impl ArgPattern {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ArgPattern::Anything => true,
            ArgPattern::Exact(expected) => expected == value,
        }
    }

    pub fn is_anything(&self) -> bool {
        matches!(self, ArgPattern::Anything)
    }
}

impl fmt::Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgPattern::Exact(value) => write!(f, "{}", value),
            ArgPattern::Anything => f.write_str("_"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockContract {
    pub target: CallTarget,
    pub method_name: String,
    pub args_pattern: Vec<ArgPattern>,
    pub return_type: TypeName,
}

impl MockContract {
    /// Derive a contract from a stubbed call
    pub fn from_stub(call: &MethodCall) -> Self {
        let args_pattern = call
            .arguments()
            .iter()
            .map(|arg| {
                if Self::is_contractable(arg) {
                    ArgPattern::Exact(arg.clone())
                } else {
                    ArgPattern::Anything
                }
            })
            .collect();

        Self {
            target: call.target().clone(),
            method_name: call.method_name().to_string(),
            args_pattern,
            return_type: promised_type(call),
        }
    }

    /// Whether a value can be compared by equality against real arguments.
    ///
    /// Nil, booleans and numbers qualify; arrays and maps qualify when every
    /// element (map values only) does. Strings, symbols, objects, types and
    /// doubles never do.
    pub fn is_contractable(value: &Value) -> bool {
        match value {
            Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) => true,
            Value::Array(items) => items.iter().all(Self::is_contractable),
            Value::Map(pairs) => pairs.iter().all(|(_, v)| Self::is_contractable(v)),
            Value::Str(_) | Value::Symbol(_) | Value::Type(_) | Value::Object(_) | Value::Double(_) => {
                false
            }
        }
    }

    /// A contract with nothing to check: every slot is a wildcard and the
    /// stub returns nil
    pub fn is_noop(&self) -> bool {
        self.args_pattern.iter().all(ArgPattern::is_anything)
            && self.return_type.as_str() == crate::core::builtin::NIL
    }

    pub fn method_desc(&self) -> String {
        self.target.describe(&self.method_name)
    }

    /// `Type#method: (2020, _) -> Integer`
    pub fn pattern_desc(&self) -> String {
        let args: Vec<String> = self.args_pattern.iter().map(ToString::to_string).collect();
        format!(
            "{}: ({}) -> {}",
            self.method_desc(),
            args.join(", "),
            self.return_type
        )
    }

    fn matches_args(&self, call: &MethodCall) -> bool {
        self.args_pattern
            .iter()
            .enumerate()
            .all(|(index, pattern)| pattern.matches(call.arguments().get(index).unwrap_or(&NIL)))
    }

    /// Check the contract against the real calls captured for its method.
    ///
    /// Fails when nothing was captured, when no call matches the argument
    /// pattern, or when no matching call returned a subtype of the promised
    /// return type.
    pub fn verify(
        &self,
        real_calls: Option<&[MethodCall]>,
        hierarchy: &dyn Subtyping,
    ) -> Result<(), ContractError> {
        let calls = match real_calls {
            Some(calls) if !calls.is_empty() => calls,
            _ => {
                return Err(ContractError::NoMethodCalls {
                    method_desc: self.method_desc(),
                })
            }
        };

        let matching: Vec<&MethodCall> = calls.iter().filter(|c| self.matches_args(c)).collect();
        if matching.is_empty() {
            return Err(ContractError::NoMatchingMethodCalls {
                pattern_desc: self.pattern_desc(),
                captured: self.captured_patterns(calls.iter()),
            });
        }

        let returns_promised_type = matching
            .iter()
            .any(|call| hierarchy.is_subtype(&call.return_value().type_name(), &self.return_type));
        if returns_promised_type {
            return Ok(());
        }

        Err(ContractError::NoMatchingReturnType {
            pattern_desc: self.pattern_desc(),
            captured: self.captured_patterns(matching.into_iter()),
        })
    }

    /// Distinct `(args) -> ReturnType` lines for the evidence, restricted to
    /// the slots the pattern constrains
    fn captured_patterns<'c>(&self, calls: impl Iterator<Item = &'c MethodCall>) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for call in calls {
            let args: Vec<String> = self
                .args_pattern
                .iter()
                .enumerate()
                .map(|(index, pattern)| match pattern {
                    ArgPattern::Anything => "_".to_string(),
                    ArgPattern::Exact(_) => call
                        .arguments()
                        .get(index)
                        .unwrap_or(&NIL)
                        .to_string(),
                })
                .collect();
            let line = format!(
                "    ({}) -> {}",
                args.join(", "),
                call.return_value().type_name()
            );
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
        lines
    }
}

/// Type a stub promises to return; verifying doubles promise the type they
/// stand in for
/// Constructors promise nothing, even when a stubbed `new` answers with a
/// canned value
fn promised_type(call: &MethodCall) -> TypeName {
    if call.is_constructor() {
        return TypeName::new(crate::core::builtin::NIL);
    }
    let value = call.return_value();
    match value {
        Value::Double(double) => double
            .double()
            .doubled_type()
            .cloned()
            .unwrap_or_else(|| value.type_name()),
        other => other.type_name(),
    }
}

impl fmt::Display for MockContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern_desc())
    }
}
