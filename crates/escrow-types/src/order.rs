//! # Order: the escrow record and its lifecycle
//!
//! ## State Machine
//!
//! ```text
//!                approve              complete
//!   ┌─────────┐ ───────▶ ┌──────────┐ ───────▶ ┌───────────┐
//!   │ CREATED │          │ APPROVED │          │ COMPLETED │
//!   └──┬───┬──┘          └──────────┘          └───────────┘
//!      │   │ reject      ┌──────────┐  batch   ┌───────────┐
//!      │   └───────────▶ │ REJECTED │ ───────▶ │ REFUNDED  │
//!      │                 └──────────┘          └───────────┘
//!      │ refund (expired)                            ▲
//!      └─────────────────────────────────────────────┘
//! ```
//!
//! ## Custody Properties
//!
//! - **Monotonic**: no edge ever leads back to an earlier state
//! - **Single payout**: value leaves custody only on entering `COMPLETED`
//!   or `REFUNDED`, and neither has an outgoing edge
//! - **Immutable terms**: `amount`, `expiry`, `depositor` and `nonce` are
//!   fixed at creation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, EscrowError, Identity, OrderId, Result};

/// The lifecycle state of an order. No other values are ever observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Value escrowed, awaiting the verifier.
    Created,
    /// Verifier approved; completable until expiry.
    Approved,
    /// Value paid to the recipient. **Irreversible.**
    Completed,
    /// Value returned through the refund path. **Irreversible.**
    Refunded,
    /// Verifier rejected. Value stays locked until a batch release.
    Rejected,
}

impl OrderState {
    /// Whether `self → target` is an edge of the lifecycle graph.
    ///
    /// `Rejected → Refunded` is only taken by the batch withdrawal path.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Created,
                Self::Approved | Self::Rejected | Self::Refunded
            ) | (Self::Approved, Self::Completed)
                | (Self::Rejected, Self::Refunded)
        )
    }

    /// `Completed`, `Refunded` and `Rejected` accept no further
    /// single-order operation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded | Self::Rejected)
    }

    /// Whether an order in this state still holds value in custody.
    #[must_use]
    pub fn holds_funds(&self) -> bool {
        matches!(self, Self::Created | Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Refunded => write!(f, "REFUNDED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A single escrow record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Caller-supplied key.
    pub id: OrderId,
    /// Current lifecycle state.
    pub state: OrderState,
    /// Value locked at creation.
    pub amount: Amount,
    /// Completion deadline; refund eligibility starts strictly after it.
    pub expiry: DateTime<Utc>,
    /// Recipient fixed at creation, when the ledger runs in that mode.
    pub recipient: Option<Identity>,
    /// The party whose value was locked.
    pub depositor: Identity,
    /// Ledger-wide creation sequence. Distinguishes successive records
    /// written at the same id.
    pub nonce: u64,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When value left custody, if it has.
    pub settled_at: Option<DateTime<Utc>>,
    /// Who received the value, if anyone has.
    pub paid_to: Option<Identity>,
}

impl Order {
    /// A freshly escrowed order in `Created` state.
    #[must_use]
    pub fn new(
        id: OrderId,
        amount: Amount,
        expiry: DateTime<Utc>,
        recipient: Option<Identity>,
        depositor: Identity,
        nonce: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            state: OrderState::Created,
            amount,
            expiry,
            recipient,
            depositor,
            nonce,
            created_at,
            settled_at: None,
            paid_to: None,
        }
    }

    /// Strictly after expiry.
    #[must_use]
    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at > self.expiry
    }

    /// `Created → Approved`.
    pub fn mark_approved(&mut self) -> Result<()> {
        self.transition(OrderState::Approved)
    }

    /// `Created → Rejected`.
    pub fn mark_rejected(&mut self) -> Result<()> {
        self.transition(OrderState::Rejected)
    }

    /// `Approved → Completed`, recording the payout party.
    pub fn mark_completed(&mut self, recipient: Identity, at: DateTime<Utc>) -> Result<()> {
        self.transition(OrderState::Completed)?;
        self.paid_to = Some(recipient);
        self.settled_at = Some(at);
        Ok(())
    }

    /// `Created | Rejected → Refunded`, recording the payout party.
    pub fn mark_refunded(&mut self, target: Identity, at: DateTime<Utc>) -> Result<()> {
        self.transition(OrderState::Refunded)?;
        self.paid_to = Some(target);
        self.settled_at = Some(at);
        Ok(())
    }

    fn transition(&mut self, target: OrderState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(EscrowError::InvalidTransition {
                id: self.id.clone(),
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }
}

/// Dummy order for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A `Created` order for `id`, expiring one hour from now.
    pub fn dummy(id: &str, amount: rust_decimal::Decimal) -> Self {
        let now = Utc::now();
        Self::new(
            OrderId::new(id).expect("dummy order id must be non-empty"),
            Amount::new(amount).expect("dummy amount must be positive"),
            now + chrono::Duration::hours(1),
            Some(Identity::random()),
            Identity::random(),
            rand::random::<u64>(),
            now,
        )
    }
}
