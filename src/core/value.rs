//! Runtime values observed in method calls.
//!
//! Values are what flows through captured arguments and return values.
//! Scalars and collections compare structurally; objects and test doubles
//! compare by identity.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{builtin, TypeName};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// A runtime value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
    Array(Vec<Value>),
    /// Ordered key/value pairs; equality ignores order
    Map(Vec<(Value, Value)>),
    /// A type used as a value (the receiver of static calls)
    Type(TypeName),
    Object(ObjectRef),
    Double(DoubleRef),
}

pub static NIL: Value = Value::Nil;

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn sym(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    /// Build a map keyed by symbols, the shape named arguments travel in
    pub fn named<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (Value::Symbol(k.into()), v))
                .collect(),
        )
    }

    pub fn object(type_name: impl Into<TypeName>) -> Self {
        Value::Object(ObjectRef::new(type_name))
    }

    pub fn double(double: TestDouble) -> Self {
        Value::Double(DoubleRef::new(double))
    }

    /// Runtime type of this value
    pub fn type_name(&self) -> TypeName {
        match self {
            Value::Nil => TypeName::new(builtin::NIL),
            Value::Bool(_) => TypeName::new(builtin::BOOL),
            Value::Int(_) => TypeName::new(builtin::INTEGER),
            Value::Float(_) => TypeName::new(builtin::FLOAT),
            Value::Str(_) => TypeName::new(builtin::STRING),
            Value::Symbol(_) => TypeName::new(builtin::SYMBOL),
            Value::Array(_) => TypeName::new(builtin::ARRAY),
            Value::Map(_) => TypeName::new(builtin::MAP),
            Value::Type(_) => TypeName::new(builtin::TYPE),
            Value::Object(obj) => obj.type_name().clone(),
            Value::Double(_) => TypeName::new(builtin::DOUBLE),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Value::Double(_))
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// A non-empty map whose keys are all symbols
    pub fn is_symbol_keyed_map(&self) -> bool {
        self.as_map()
            .is_some_and(|pairs| {
                !pairs.is_empty() && pairs.iter().all(|(k, _)| matches!(k, Value::Symbol(_)))
            })
    }

    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.iter().any(|(bk, bv)| k == bk && v == bv))
            }
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match k {
                        Value::Symbol(name) => write!(f, "{}: {}", name, v)?,
                        other => write!(f, "{} => {}", other, v)?,
                    }
                }
                f.write_str("}")
            }
            Value::Type(name) => write!(f, "{}", name),
            Value::Object(obj) => write!(f, "#<{}>", obj.type_name()),
            Value::Double(double) => write!(f, "{}", double.0),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Instance of a named type with mutable fields
#[derive(Debug)]
pub struct Object {
    id: u64,
    type_name: TypeName,
    fields: Mutex<BTreeMap<String, Value>>,
}

/// Shared handle to an [`Object`]; equality is identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ObjectSnapshot", into = "ObjectSnapshot")]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self::with_fields(type_name, BTreeMap::new())
    }

    pub fn with_fields(type_name: impl Into<TypeName>, fields: BTreeMap<String, Value>) -> Self {
        ObjectRef(Arc::new(Object {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            type_name: type_name.into(),
            fields: Mutex::new(fields),
        }))
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn type_name(&self) -> &TypeName {
        &self.0.type_name
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.0.fields.lock().get(field).cloned()
    }

    pub fn set(&self, field: impl Into<String>, value: Value) {
        self.0.fields.lock().insert(field.into(), value);
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Serialize, Deserialize)]
struct ObjectSnapshot {
    #[serde(rename = "type")]
    type_name: TypeName,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl From<ObjectSnapshot> for ObjectRef {
    fn from(snapshot: ObjectSnapshot) -> Self {
        ObjectRef::with_fields(snapshot.type_name, snapshot.fields)
    }
}

impl From<ObjectRef> for ObjectSnapshot {
    fn from(obj: ObjectRef) -> Self {
        ObjectSnapshot {
            type_name: obj.type_name().clone(),
            fields: obj.0.fields.lock().clone(),
        }
    }
}

/// What a test double stands in for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoubleKind {
    /// Unverified double; may carry a type name as its label
    Plain,
    /// Stands in for an instance of the type
    Instance(TypeName),
    /// Stands in for the type itself
    Static(TypeName),
}

/// A test double created by the mocking framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDouble {
    pub name: Option<String>,
    pub kind: DoubleKind,
}

impl TestDouble {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: DoubleKind::Plain,
        }
    }

    pub fn instance_of(type_name: impl Into<TypeName>) -> Self {
        Self {
            name: None,
            kind: DoubleKind::Instance(type_name.into()),
        }
    }

    pub fn static_of(type_name: impl Into<TypeName>) -> Self {
        Self {
            name: None,
            kind: DoubleKind::Static(type_name.into()),
        }
    }

    /// Type a verifying double stands in for
    pub fn doubled_type(&self) -> Option<&TypeName> {
        match &self.kind {
            DoubleKind::Plain => None,
            DoubleKind::Instance(t) | DoubleKind::Static(t) => Some(t),
        }
    }
}

impl fmt::Display for TestDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.name) {
            (DoubleKind::Plain, Some(name)) => write!(f, "#<Double {:?}>", name),
            (DoubleKind::Plain, None) => f.write_str("#<Double (anonymous)>"),
            (DoubleKind::Instance(t), _) => write!(f, "#<InstanceDouble({})>", t),
            (DoubleKind::Static(t), _) => write!(f, "#<StaticDouble({})>", t),
        }
    }
}

/// Shared handle to a [`TestDouble`]; equality is identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoubleRef(Arc<TestDouble>);

impl DoubleRef {
    pub fn new(double: TestDouble) -> Self {
        DoubleRef(Arc::new(double))
    }

    pub fn double(&self) -> &TestDouble {
        &self.0
    }
}

impl PartialEq for DoubleRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality_crosses_int_and_float() {
        assert_eq!(Value::Int(10), Value::Float(10.0));
        assert_ne!(Value::Int(10), Value::Float(10.5));
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = Value::named([("value", Value::Int(2020)), ("from", Value::str("a"))]);
        let b = Value::named([("from", Value::str("a")), ("value", Value::Int(2020))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_objects_compare_by_identity() {
        let a = ObjectRef::new("TaxCalculator");
        let b = ObjectRef::new("TaxCalculator");
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Nil.type_name().as_str(), "Nil");
        assert_eq!(Value::Int(1).type_name().as_str(), "Integer");
        assert_eq!(Value::object("Accountant").type_name().as_str(), "Accountant");
        assert_eq!(
            Value::double(TestDouble::instance_of("Accountant")).type_name().as_str(),
            "Double"
        );
    }

    #[test]
    fn test_display_inspect_forms() {
        let value = Value::Array(vec![
            Value::Int(1),
            Value::str("x"),
            Value::sym("y"),
            Value::Nil,
            Value::named([("rate", Value::Float(10.0))]),
        ]);
        assert_eq!(value.to_string(), r#"[1, "x", :y, nil, {rate: 10.0}]"#);
    }

    #[test]
    fn test_object_fields_are_shared_between_handles() {
        let obj = ObjectRef::new("Accountant");
        let alias = obj.clone();
        alias.set("tax_calculator", Value::Int(1));
        assert_eq!(obj.get("tax_calculator"), Some(Value::Int(1)));
    }

    #[test]
    fn test_symbol_keyed_map_detection() {
        assert!(Value::named([("value", Value::Int(1))]).is_symbol_keyed_map());
        assert!(!Value::Map(vec![(Value::str("value"), Value::Int(1))]).is_symbol_keyed_map());
        assert!(!Value::Int(1).is_symbol_keyed_map());
    }
}
