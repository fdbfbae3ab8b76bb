//! Global call/return event stream.
//!
//! Every dispatch emits a `Call` event before the implementation runs and a
//! `Return` (or `Unwind`, when the method raised) afterwards. Events are
//! totally ordered; nested dispatches produce properly nested event pairs.

use std::sync::Arc;

use super::Raised;
use crate::core::{BoundParam, CallTarget, Value};

#[derive(Debug)]
pub enum TraceEvent<'a> {
    Call {
        /// Target that defines the running implementation
        target: &'a CallTarget,
        method: &'a str,
        receiver: &'a Value,
        binding: &'a [BoundParam],
        location: &'a str,
    },
    Return {
        target: &'a CallTarget,
        method: &'a str,
        value: &'a Value,
    },
    Unwind {
        target: &'a CallTarget,
        method: &'a str,
        error: &'a Raised,
    },
}

impl TraceEvent<'_> {
    pub fn target(&self) -> &CallTarget {
        match self {
            TraceEvent::Call { target, .. }
            | TraceEvent::Return { target, .. }
            | TraceEvent::Unwind { target, .. } => target,
        }
    }

    pub fn method(&self) -> &str {
        match self {
            TraceEvent::Call { method, .. }
            | TraceEvent::Return { method, .. }
            | TraceEvent::Unwind { method, .. } => method,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&TraceEvent<'_>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
