//! Core data model: values, types, call targets and parameter shapes.

pub mod errors;
pub mod params;
pub mod types;
pub mod value;

pub use errors::{Error, Result, ResultExt};
pub use params::{BoundParam, MethodShape, Param, ParamKind};
pub use types::{builtin, BuiltinHierarchy, CallTarget, Subtyping, TypeName};
pub use value::{DoubleKind, DoubleRef, ObjectRef, TestDouble, Value, NIL};
