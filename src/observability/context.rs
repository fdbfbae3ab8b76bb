//! Thread-local tracking of the test case currently running.
//!
//! Mocked and real calls captured while a test case runs are tagged with
//! its identifier so offenses can be attributed back to it. The host test
//! runner enters a case with [`set_current_example`] and the returned guard
//! restores the previous context when the case finishes.
//!
//! ## Thread Safety
//!
//! - Each thread has its own context (via `thread_local!`)
//! - Context guards use RAII for automatic cleanup on drop

use std::cell::RefCell;

thread_local! {
    static CURRENT_CONTEXT: RefCell<VerificationContext> = const { RefCell::new(VerificationContext::new()) };
}

/// Context snapshot for the code currently running
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationContext {
    /// Identifier of the running test case
    pub example: Option<String>,
    /// Source location of the running test case
    pub location: Option<String>,
}

impl VerificationContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            example: None,
            location: None,
        }
    }
}

/// RAII guard restoring the previous context on drop.
pub struct ContextGuard {
    previous: VerificationContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

/// Mark `example` as the running test case until the guard drops.
///
/// ```ignore
/// let _example = set_current_example("Accountant#net_pay returns net", Some("accountant_test.rs:12"));
/// run_test_body();
/// ```
#[must_use]
pub fn set_current_example(example: impl Into<String>, location: Option<&str>) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        let mut current = ctx.borrow_mut();
        current.example = Some(example.into());
        current.location = location.map(str::to_string);
        ContextGuard { previous }
    })
}

#[must_use]
pub fn current_example() -> Option<String> {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().example.clone())
}

#[must_use]
pub fn get_current_context() -> VerificationContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}
