//! The uniform record of one method invocation, mocked or real.
//!
//! A [`MethodCall`] is created when an invocation begins (tracing) or when a
//! stub is configured (mock capture). Its arguments never change afterwards;
//! the return value is attached at most once, and verification errors are
//! attached to its [`Metadata`].

use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::contract::ContractError;
use crate::core::{CallTarget, Error, MethodShape, Result, Value, NIL};
use crate::type_checks::TypeCheckError;

/// Instance-side name of the constructor
pub const CONSTRUCTOR: &str = "initialize";

/// Type-level allocation method that runs the constructor
pub const ALLOCATOR: &str = "new";

/// Failure attached to an offending call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    TypeCheck(#[from] TypeCheckError),
}

/// Open key-value bag carried by every call record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Test case the call originates from
    pub example: Option<String>,
    /// Source location of the invoked implementation
    pub location: Option<String>,
    /// Verification failure attached after the run
    pub error: Option<VerificationError>,
    /// Message of the error the traced method raised instead of returning
    pub raised: Option<String>,
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct MethodCall {
    target: CallTarget,
    method_name: String,
    arguments: Vec<Value>,
    has_named_args: OnceCell<bool>,
    shape: Option<Arc<MethodShape>>,
    return_value: OnceCell<Value>,
    mocked_object: Option<Value>,
    pub metadata: Metadata,
}

impl MethodCall {
    pub fn new(target: CallTarget, method_name: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            target,
            method_name: method_name.into(),
            arguments,
            has_named_args: OnceCell::new(),
            shape: None,
            return_value: OnceCell::new(),
            mocked_object: None,
            metadata: Metadata::default(),
        }
    }

    pub fn with_return(self, value: Value) -> Self {
        let _ = self.return_value.set(value);
        self
    }

    /// Fix the named-argument flag instead of deriving it from the shape
    pub fn with_named_args(self, has_named_args: bool) -> Self {
        let _ = self.has_named_args.set(has_named_args);
        self
    }

    pub fn with_shape(mut self, shape: Arc<MethodShape>) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_mocked_object(mut self, object: Value) -> Self {
        self.mocked_object = Some(object);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.metadata.location = Some(location.into());
        self
    }

    pub fn with_example(mut self, example: Option<String>) -> Self {
        self.metadata.example = example;
        self
    }

    pub fn target(&self) -> &CallTarget {
        &self.target
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn shape(&self) -> Option<&MethodShape> {
        self.shape.as_deref()
    }

    pub fn mocked_object(&self) -> Option<&Value> {
        self.mocked_object.as_ref()
    }

    /// The recorded return value, or nil when the call never completed
    pub fn return_value(&self) -> &Value {
        self.return_value.get().unwrap_or(&NIL)
    }

    pub fn is_completed(&self) -> bool {
        self.return_value.get().is_some()
    }

    /// Attach the return value; a record completes at most once.
    pub fn complete(&self, value: Value) -> Result<()> {
        self.return_value
            .set(value)
            .map_err(|_| Error::AlreadyCompleted(self.describe()))
    }

    pub fn is_constructor(&self) -> bool {
        self.method_name == CONSTRUCTOR
    }

    /// Whether the trailing argument is a named-argument map.
    ///
    /// Unless set explicitly, derived once from the target method's parameter
    /// shape: the method must accept keywords and the last argument must be a
    /// symbol-keyed map.
    pub fn has_named_args(&self) -> bool {
        *self.has_named_args.get_or_init(|| {
            let accepts_keywords = self
                .shape
                .as_deref()
                .is_some_and(MethodShape::accepts_named_args);

            accepts_keywords
                && self
                    .arguments
                    .last()
                    .is_some_and(Value::is_symbol_keyed_map)
        })
    }

    /// Arguments without the trailing named-argument map
    pub fn positional_args(&self) -> &[Value] {
        if self.has_named_args() {
            &self.arguments[..self.arguments.len() - 1]
        } else {
            &self.arguments
        }
    }

    /// The trailing named-argument map, or nothing
    pub fn named_args(&self) -> &[(Value, Value)] {
        if !self.has_named_args() {
            return &[];
        }
        self.arguments
            .last()
            .and_then(Value::as_map)
            .unwrap_or_default()
    }

    /// `Type#method` or `Type.method`
    pub fn describe(&self) -> String {
        self.target.describe(&self.method_name)
    }
}

impl fmt::Display for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
        write!(
            f,
            "{}({}) -> {}",
            self.describe(),
            args.join(", "),
            self.return_value()
        )
    }
}
