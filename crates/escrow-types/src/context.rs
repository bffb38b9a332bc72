//! Ambient inputs supplied by the invoking environment on every call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Identity;

/// Who is calling and when.
///
/// Expiry is always evaluated against `at`, never against a clock the
/// ledger reads on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The authenticated caller identity.
    pub caller: Identity,
    /// The ambient time of the call.
    pub at: DateTime<Utc>,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: Identity, at: DateTime<Utc>) -> Self {
        Self { caller, at }
    }

    /// Context stamped with the current wall-clock time.
    #[must_use]
    pub fn now(caller: Identity) -> Self {
        Self::new(caller, Utc::now())
    }

    /// Same caller, later time.
    #[must_use]
    pub fn advanced(self, by: chrono::Duration) -> Self {
        Self::new(self.caller, self.at + by)
    }

    /// Same time, different caller.
    #[must_use]
    pub fn as_caller(self, caller: Identity) -> Self {
        Self::new(caller, self.at)
    }
}

/// A gated ledger operation, as seen by an authorization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Create,
    Approve,
    Reject,
    Complete,
    Refund,
    BatchWithdraw,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Approve => write!(f, "APPROVE"),
            Self::Reject => write!(f, "REJECT"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Refund => write!(f, "REFUND"),
            Self::BatchWithdraw => write!(f, "BATCH_WITHDRAW"),
        }
    }
}
