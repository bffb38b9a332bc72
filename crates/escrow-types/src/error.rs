//! Error types for the escrow ledger.
//!
//! All errors use the `ESC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Value / custody errors
//! - 3xx: Expiry errors
//! - 4xx: Authorization / party errors
//! - 5xx: Batch errors
//! - 9xx: General / internal errors

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Action, Identity, OrderId, OrderState};

/// Central error enum for all ledger operations.
///
/// Every variant is a rejected-operation outcome: the ledger is left
/// exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// No record at this id (or a record with zero amount).
    #[error("ESC_ERR_100: Order does not exist: {0}")]
    OrderNotFound(OrderId),

    /// Order identifiers must be non-empty.
    #[error("ESC_ERR_101: Order id must not be empty")]
    EmptyOrderId,

    /// A record already occupies this id.
    #[error("ESC_ERR_102: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order is not in a state from which this transition is allowed.
    #[error("ESC_ERR_103: Order {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: OrderId,
        from: OrderState,
        to: OrderState,
    },

    // =================================================================
    // Value / Custody Errors (2xx)
    // =================================================================
    /// No value attached to a creation.
    #[error("ESC_ERR_200: Attached value must be greater than zero")]
    ZeroValue,

    /// Attached value is negative or otherwise unusable.
    #[error("ESC_ERR_201: Invalid amount: {value}")]
    InvalidAmount { value: Decimal },

    /// Handing value to the payout party failed.
    #[error("ESC_ERR_202: Transfer to {to} failed: {reason}")]
    TransferFailed { to: Identity, reason: String },

    /// Custody does not hold enough value for a release.
    #[error("ESC_ERR_203: Insufficient custody: need {needed}, escrowed {escrowed}")]
    InsufficientCustody { needed: Decimal, escrowed: Decimal },

    /// The order record was already paid out once.
    #[error("ESC_ERR_204: Order {id} (nonce {nonce}) was already paid out")]
    AlreadyPaidOut { id: OrderId, nonce: u64 },

    /// Value conservation invariant violated. Critical.
    #[error("ESC_ERR_205: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    /// A running value total would leave the representable range.
    #[error("ESC_ERR_206: Value overflow in {context}")]
    ValueOverflow { context: &'static str },

    // =================================================================
    // Expiry Errors (3xx)
    // =================================================================
    /// Creation with an expiry that is not strictly in the future.
    #[error("ESC_ERR_300: Expiry {expiry} is not after {now}")]
    ExpiryNotInFuture {
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// Completion attempted after expiry.
    #[error("ESC_ERR_301: Order {0} has expired")]
    OrderExpired(OrderId),

    /// Refund attempted at or before expiry.
    #[error("ESC_ERR_302: Order {0} has not expired yet")]
    OrderNotExpired(OrderId),

    // =================================================================
    // Authorization / Party Errors (4xx)
    // =================================================================
    /// The caller is not allowed to perform this action.
    #[error("ESC_ERR_400: Caller {caller} is not authorized to {action}")]
    Unauthorized { caller: Identity, action: Action },

    /// A required party identity is missing or null.
    #[error("ESC_ERR_401: A non-null {role} identity is required")]
    NullIdentity { role: &'static str },

    /// The supplied payout party differs from the one on record.
    #[error("ESC_ERR_402: Payout target {supplied} does not match recorded {recorded}")]
    PayoutTargetMismatch {
        supplied: Identity,
        recorded: Identity,
    },

    // =================================================================
    // Batch Errors (5xx)
    // =================================================================
    /// `ids` and `targets` differ in length.
    #[error("ESC_ERR_500: Batch length mismatch: {ids} ids, {targets} targets")]
    BatchLengthMismatch { ids: usize, targets: usize },

    /// Too many entries in one call.
    #[error("ESC_ERR_501: Batch of {size} entries exceeds limit {max}")]
    BatchTooLarge { size: usize, max: usize },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("ESC_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("ESC_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid document, inconsistent settings).
    #[error("ESC_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;

impl From<serde_json::Error> for EscrowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = EscrowError::OrderNotFound(OrderId::new("A").unwrap());
        let msg = format!("{err}");
        assert!(msg.starts_with("ESC_ERR_100"), "Got: {msg}");
        assert!(msg.contains("does not exist"));
    }

    #[test]
    fn invalid_transition_display() {
        let err = EscrowError::InvalidTransition {
            id: OrderId::new("A").unwrap(),
            from: OrderState::Completed,
            to: OrderState::Completed,
        };
        let msg = format!("{err}");
        assert!(msg.contains("ESC_ERR_103"));
        assert!(msg.contains("COMPLETED"));
    }

    #[test]
    fn unauthorized_display() {
        let err = EscrowError::Unauthorized {
            caller: Identity::from_bytes([1u8; 32]),
            action: Action::Approve,
        };
        let msg = format!("{err}");
        assert!(msg.contains("ESC_ERR_400"));
        assert!(msg.contains("APPROVE"));
        assert!(msg.contains("0101"));
    }

    #[test]
    fn serde_json_error_converts() {
        let err: EscrowError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(matches!(err, EscrowError::Serialization(_)));
    }

    #[test]
    fn all_errors_have_esc_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(EscrowError::EmptyOrderId),
            Box::new(EscrowError::ZeroValue),
            Box::new(EscrowError::ValueOverflow { context: "custody pool" }),
            Box::new(EscrowError::NullIdentity { role: "recipient" }),
            Box::new(EscrowError::BatchLengthMismatch { ids: 2, targets: 1 }),
            Box::new(EscrowError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("ESC_ERR_"),
                "Error missing ESC_ERR_ prefix: {msg}"
            );
        }
    }
}
