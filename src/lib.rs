//! Verifies that test doubles behave like the real methods they replace.
//!
//! Real calls of mocked methods are traced while a suite runs. At teardown
//! every stub is turned into a [`MockContract`] and checked against those
//! calls, and mocked calls are type-checked against signatures inferred from
//! them.

// Export modules for library usage
pub mod cli;
pub mod commands;
pub mod config;
pub mod contract;
pub mod core;
pub mod logging;
pub mod method_call;
pub mod mocks;
pub mod observability;
pub mod recording;
pub mod reporting;
pub mod runtime;
pub mod suite;
pub mod testkit;
pub mod tracer;
pub mod type_checks;

// Re-export commonly used types
pub use crate::core::{
    BuiltinHierarchy, CallTarget, Error, MethodShape, Result, Subtyping, TestDouble, TypeName,
    Value,
};

pub use crate::config::{load_config, Configuration, LogLevel};
pub use crate::contract::{ContractError, MockContract};
pub use crate::method_call::{MethodCall, VerificationError};
pub use crate::mocks::{MockRegistry, MockedCallSink, StubSet};
pub use crate::observability::{set_current_example, VerificationPhase};
pub use crate::recording::Recording;
pub use crate::reporting::{report_offenses, ConsoleReporter, OffenseReporter, ReportSummary};
pub use crate::runtime::{Raised, Runtime, TypeCatalog};
pub use crate::suite::{auto_type_check, verify_contracts, Suite};
pub use crate::tracer::{CallFilter, TraceStrategy, Tracer};
pub use crate::type_checks::{
    build_checker, infer_signatures, AnnotatedSignatures, DeclaredSignatures, MethodSignature,
    TypeCheckError, TypeCheckKind, TypeChecker, TypeEnvironment,
};
