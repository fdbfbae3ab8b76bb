//! Per-call type-check failures.

use std::fmt;
use thiserror::Error;

use super::signature::SigType;
use crate::core::Value;

/// Which argument a type error refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgPosition {
    Positional(usize),
    Named(String),
}

impl fmt::Display for ArgPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgPosition::Positional(index) => write!(f, "argument {}", index),
            ArgPosition::Named(name) => write!(f, "keyword `{}`", name),
        }
    }
}

/// One violation found while checking a call against a signature
#[derive(Debug, Clone, PartialEq)]
pub enum MismatchDetail {
    ArgumentType {
        position: ArgPosition,
        expected: SigType,
        actual: Value,
    },
    ReturnType {
        expected: SigType,
        actual: Value,
    },
    Arity {
        expected: String,
        given: usize,
    },
    UnknownKeyword(String),
    MissingKeyword(String),
}

impl fmt::Display for MismatchDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchDetail::ArgumentType {
                position,
                expected,
                actual,
            } => write!(
                f,
                "ArgumentTypeError: expected `{}`, got `{}` ({}: {})",
                expected,
                actual.type_name(),
                position,
                actual
            ),
            MismatchDetail::ReturnType { expected, actual } => write!(
                f,
                "ReturnTypeError: expected `{}`, got `{}` ({})",
                expected,
                actual.type_name(),
                actual
            ),
            MismatchDetail::Arity { expected, given } => write!(
                f,
                "ArgumentError: expected method type {}, given {} positional argument(s)",
                expected, given
            ),
            MismatchDetail::UnknownKeyword(name) => {
                write!(f, "ArgumentError: unknown keyword `{}`", name)
            }
            MismatchDetail::MissingKeyword(name) => {
                write!(f, "ArgumentError: missing keyword `{}`", name)
            }
        }
    }
}

/// A call whose arguments or return value violate the method's signature
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMismatch {
    /// `Type#method` of the offending call
    pub method: String,
    pub details: Vec<MismatchDetail>,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .details
            .iter()
            .map(|detail| format!("[{}] {}", self.method, detail))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

impl std::error::Error for TypeMismatch {}

/// No signature, declared or inferred, exists for the called method
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No signature found for {method}{}", hint.as_deref().map(|h| format!(". {}", h)).unwrap_or_default())]
pub struct MissingSignature {
    pub method: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeCheckError {
    #[error(transparent)]
    Missing(#[from] MissingSignature),
    #[error(transparent)]
    Mismatch(#[from] TypeMismatch),
}
