//! Lifecycle phases of one verification run.

use serde::Serialize;

use crate::core::{Error, Result};

/// `Idle → Collecting → Draining → TypeChecking → ContractVerifying → Reported`.
///
/// Phases only move forward; the optional passes may be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPhase {
    /// Nothing installed yet
    Idle,
    /// Tracer running, mocked calls being stored
    Collecting,
    /// Tracer stopped, real calls filtered
    Draining,
    /// Mocked calls checked against signatures
    TypeChecking,
    /// Stubs checked against real calls
    ContractVerifying,
    /// Offenses handed to the reporter
    Reported,
}

impl VerificationPhase {
    /// Move to `next`, failing if it is not strictly later than `self`
    pub fn advance(self, next: VerificationPhase) -> Result<VerificationPhase> {
        if next > self {
            Ok(next)
        } else {
            Err(Error::Phase {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for VerificationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Collecting => write!(f, "collecting"),
            Self::Draining => write!(f, "draining"),
            Self::TypeChecking => write!(f, "type_checking"),
            Self::ContractVerifying => write!(f, "contract_verifying"),
            Self::Reported => write!(f, "reported"),
        }
    }
}
