//! Type identities, call targets and subtype resolution.
//!
//! A [`TypeName`] names a runtime type. A [`CallTarget`] pairs a type with the
//! dispatch context a method lives in: instance methods and static
//! (type-level) methods of the same type are distinct targets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a runtime type, e.g. `Integer` or `TaxCalculator::Result`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the builtin value types.
    ///
    /// Everything else is a custom type that a signature store may need to
    /// declare before it can reference it.
    pub fn is_builtin(&self) -> bool {
        builtin::ALL.contains(&self.0.as_str())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Names of the builtin value types
pub mod builtin {
    pub const NIL: &str = "Nil";
    pub const BOOL: &str = "Bool";
    pub const INTEGER: &str = "Integer";
    pub const FLOAT: &str = "Float";
    pub const NUMERIC: &str = "Numeric";
    pub const STRING: &str = "String";
    pub const SYMBOL: &str = "Symbol";
    pub const ARRAY: &str = "Array";
    pub const MAP: &str = "Map";
    pub const TYPE: &str = "Type";
    pub const DOUBLE: &str = "Double";
    pub const OBJECT: &str = "Object";

    pub const ALL: &[&str] = &[
        NIL, BOOL, INTEGER, FLOAT, NUMERIC, STRING, SYMBOL, ARRAY, MAP, TYPE, DOUBLE, OBJECT,
    ];
}

/// The receiver context of a method: instance dispatch or static dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallTarget {
    Instance(TypeName),
    Static(TypeName),
}

impl CallTarget {
    pub fn instance(name: impl Into<TypeName>) -> Self {
        Self::Instance(name.into())
    }

    pub fn static_of(name: impl Into<TypeName>) -> Self {
        Self::Static(name.into())
    }

    /// The type the target belongs to, regardless of dispatch context
    pub fn underlying_type(&self) -> &TypeName {
        match self {
            Self::Instance(name) | Self::Static(name) => name,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    pub fn separator(&self) -> char {
        if self.is_static() {
            '.'
        } else {
            '#'
        }
    }

    /// Human-readable method reference: `Type#method` or `Type.method`
    pub fn describe(&self, method_name: &str) -> String {
        format!("{}{}{}", self.underlying_type(), self.separator(), method_name)
    }

    /// Parse a `Type#method` / `Type.method` reference.
    pub fn parse_method_ref(reference: &str) -> Option<(CallTarget, String)> {
        let split_at = reference.rfind(['#', '.'])?;
        let (type_part, rest) = reference.split_at(split_at);
        let method = &rest[1..];
        if type_part.is_empty() || method.is_empty() {
            return None;
        }

        let target = if rest.starts_with('.') {
            CallTarget::static_of(type_part)
        } else {
            CallTarget::instance(type_part)
        };
        Some((target, method.to_string()))
    }
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(name) => write!(f, "{}", name),
            Self::Static(name) => write!(f, "{} (static)", name),
        }
    }
}

const MAX_HIERARCHY_DEPTH: usize = 64;

/// Subtype resolution over a type hierarchy.
///
/// Implementors only provide direct superclass lookup; the walk, the
/// reflexive case and the `Object` top type are shared.
pub trait Subtyping {
    fn superclass_of(&self, ty: &TypeName) -> Option<TypeName>;

    fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        if sub == sup || sup.as_str() == builtin::OBJECT {
            return true;
        }

        let mut current = sub.clone();
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match self.superclass_of(&current) {
                Some(parent) if &parent == sup => return true,
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

/// Hierarchy of the builtin value types only
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinHierarchy;

impl BuiltinHierarchy {
    pub fn builtin_superclass(ty: &TypeName) -> Option<TypeName> {
        match ty.as_str() {
            builtin::OBJECT => None,
            builtin::INTEGER | builtin::FLOAT => Some(TypeName::new(builtin::NUMERIC)),
            _ => Some(TypeName::new(builtin::OBJECT)),
        }
    }
}

impl Subtyping for BuiltinHierarchy {
    fn superclass_of(&self, ty: &TypeName) -> Option<TypeName> {
        Self::builtin_superclass(ty)
    }
}
