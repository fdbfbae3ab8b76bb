//! Pluggable type-check backends.
//!
//! A backend answers one question per call record: do its arguments and
//! return value agree with the signature known for `(target, method)`?
//! Backends differ only in where authoritative signatures come from:
//!
//! - [`DeclaredSignatures`] reads TOML signature files from load directories
//! - [`AnnotatedSignatures`] reads signatures annotated on runtime methods
//!
//! Both fall back to signatures inferred from real calls
//! (see [`infer_signatures`]) for methods they have nothing on.

pub mod annotated;
pub mod check;
pub mod declared;
pub mod errors;
pub mod inference;
pub mod signature;

pub use annotated::AnnotatedSignatures;
pub use check::check_call;
pub use declared::DeclaredSignatures;
pub use errors::{ArgPosition, MismatchDetail, MissingSignature, TypeCheckError, TypeMismatch};
pub use inference::{infer_signatures, InferredReturn, InferredSignature, SignatureSet, SlotTypes};
pub use signature::{MethodSignature, NamedParam, PositionalParam, SigType};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::{CallTarget, Error, Result, Subtyping, TypeName};
use crate::method_call::MethodCall;

/// Reflective view of the host program a backend checks against
pub trait TypeEnvironment: Subtyping + Send + Sync {
    /// Signature annotated directly on the method, if any
    fn annotated_signature(&self, target: &CallTarget, method: &str) -> Option<MethodSignature>;

    fn knows_type(&self, name: &TypeName) -> bool;
}

pub trait TypeChecker: Send + Sync {
    fn kind(&self) -> TypeCheckKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Check one call; missing signatures only fail when `raise_on_missing`
    fn typecheck(&self, call: &MethodCall, raise_on_missing: bool) -> std::result::Result<(), TypeCheckError>;

    /// Make inferred signatures available to subsequent checks
    fn load_signatures(&self, signatures: &SignatureSet);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCheckKind {
    Signatures,
    Annotations,
}

impl TypeCheckKind {
    pub const ALL: [TypeCheckKind; 2] = [TypeCheckKind::Signatures, TypeCheckKind::Annotations];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeCheckKind::Signatures => "signatures",
            TypeCheckKind::Annotations => "annotations",
        }
    }
}

impl fmt::Display for TypeCheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeCheckKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for TypeCheckKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TypeCheckKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = TypeCheckKind::ALL.iter().map(|k| k.as_str()).collect();
                Error::configuration(format!(
                    "Unsupported type checker: {}. Supported: {}",
                    s,
                    supported.join(",")
                ))
            })
    }
}

/// Instantiate the backend for `kind`
pub fn build_checker(
    kind: TypeCheckKind,
    env: Arc<dyn TypeEnvironment>,
    signature_load_dirs: &[PathBuf],
) -> Result<Arc<dyn TypeChecker>> {
    match kind {
        TypeCheckKind::Signatures => {
            let checker = DeclaredSignatures::new(env);
            let loaded = checker.load_dirs(signature_load_dirs)?;
            log::debug!(
                "Loaded {} declared signature(s) from {} dir(s)",
                loaded,
                signature_load_dirs.len()
            );
            Ok(Arc::new(checker))
        }
        TypeCheckKind::Annotations => Ok(Arc::new(AnnotatedSignatures::new(env))),
    }
}

/// Hierarchy consulted during checks: types declared alongside signatures
/// first, then the environment.
pub(crate) struct LayeredHierarchy<'a> {
    pub(crate) env: &'a dyn TypeEnvironment,
    pub(crate) declared: &'a std::collections::HashMap<TypeName, Option<TypeName>>,
}

impl Subtyping for LayeredHierarchy<'_> {
    fn superclass_of(&self, ty: &TypeName) -> Option<TypeName> {
        match self.declared.get(ty) {
            Some(Some(superclass)) => Some(superclass.clone()),
            Some(None) | None => self.env.superclass_of(ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("signatures".parse::<TypeCheckKind>().unwrap(), TypeCheckKind::Signatures);
        assert_eq!("annotations".parse::<TypeCheckKind>().unwrap(), TypeCheckKind::Annotations);

        let err = "steep".parse::<TypeCheckKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Unsupported type checker: steep. Supported: signatures,annotations"
        );
    }
}
