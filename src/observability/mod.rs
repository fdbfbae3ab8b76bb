//! Run context and lifecycle tracking.
//!
//! ## Features
//!
//! - **Example Tracking**: Thread-local identifier of the running test case,
//!   used to attribute captured calls and offenses
//! - **Phases**: The forward-only lifecycle of a verification run
//!
//! ## Usage
//!
//! ```ignore
//! use doublecheck::observability::set_current_example;
//!
//! for case in cases {
//!     let _example = set_current_example(case.name(), Some(case.location()));
//!     case.run();
//! }
//! ```

pub mod context;
pub mod phase;

pub use context::{
    current_example, get_current_context, set_current_example, ContextGuard, VerificationContext,
};
pub use phase::VerificationPhase;
