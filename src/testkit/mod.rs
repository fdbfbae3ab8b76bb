//! Testing infrastructure for doublecheck.
//!
//! - **[`fixtures`]**: the tax-calculator program (`TaxCalculator`,
//!   `TaxCalculator::Result`, `Accountant`) defined on a fresh [`Runtime`]
//! - **[`helpers`]**: builders for real and mocked call records
//! - **Assertion macros**: [`crate::assert_contains_error!`] and
//!   [`crate::assert_offense!`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use doublecheck::testkit::{tax_runtime, TAX_CALCULATOR};
//! use doublecheck::core::Value;
//!
//! let runtime = tax_runtime();
//! let calculator = runtime.construct(TAX_CALCULATOR, vec![])?;
//! let result = runtime.invoke(&calculator, "for_income", vec![Value::Int(89)])?;
//! ```
//!
//! [`Runtime`]: crate::runtime::Runtime

pub mod assertions;
pub mod fixtures;
pub mod helpers;

pub use fixtures::{
    bracket_rate, tax_result, tax_runtime, ACCOUNTANT, TAX_BRACKETS, TAX_CALCULATOR, TAX_RESULT,
};
pub use helpers::{mocked_call, real_call, ConfigBuilder};
