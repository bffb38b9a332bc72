//! Batch withdrawal report.
//!
//! A batch call answers for every entry it was given, in input order, so
//! callers can tell "nothing happened because ineligible" apart from
//! "paid" and from "failed".

use std::fmt;

use escrow_types::{Amount, EscrowError, Identity, OrderId, OrderState};

/// Why an entry was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No addressable record at the id.
    UnknownOrder,
    /// The record exists but neither payout rule applies to it.
    NotEligible { state: OrderState, expired: bool },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOrder => write!(f, "unknown order"),
            Self::NotEligible { state, expired } => {
                write!(f, "not eligible in {state} (expired: {expired})")
            }
        }
    }
}

/// What happened to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEntryOutcome {
    /// Approved and unexpired: paid to the recipient.
    Completed { recipient: Identity, amount: Amount },
    /// Expired while created, or rejected: paid through the refund path.
    Refunded { depositor: Identity, amount: Amount },
    Skipped { reason: SkipReason },
    /// The entry was eligible but could not be settled. Nothing about it
    /// changed.
    Failed { error: EscrowError },
}

impl BatchEntryOutcome {
    /// Whether value left custody for this entry.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Refunded { .. })
    }
}

/// One line of a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub id: OrderId,
    pub target: Identity,
    pub outcome: BatchEntryOutcome,
}

/// Per-entry result of `batch_withdraw_orders`, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }

    pub(crate) fn push(&mut self, id: OrderId, target: Identity, outcome: BatchEntryOutcome) {
        self.entries.push(BatchEntry {
            id,
            target,
            outcome,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Outcomes only, in input order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<&BatchEntryOutcome> {
        self.entries.iter().map(|e| &e.outcome).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, BatchEntryOutcome::Completed { .. }))
    }

    #[must_use]
    pub fn refunded(&self) -> usize {
        self.count(|o| matches!(o, BatchEntryOutcome::Refunded { .. }))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, BatchEntryOutcome::Skipped { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BatchEntryOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&BatchEntryOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}
