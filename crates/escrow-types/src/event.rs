//! Ledger events: the append-only audit trail consumed by indexers.
//!
//! Every committed transition produces exactly one [`LedgerEvent`]. Events
//! are hash-chained: each carries the hash of its predecessor, so a gap or
//! an edit anywhere in the log is detectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{constants, Amount, EventId, Identity, OrderId, OrderState};

/// What happened to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Value escrowed and the record stored.
    Created {
        amount: Amount,
        expiry: DateTime<Utc>,
        recipient: Option<Identity>,
        depositor: Identity,
    },
    /// Verifier approved.
    Approved,
    /// Verifier rejected.
    Rejected,
    /// Value paid to the recipient.
    Completed { recipient: Identity, amount: Amount },
    /// Value paid back through the refund path.
    Refunded { depositor: Identity, amount: Amount },
}

impl EventKind {
    /// The state the order entered with this event.
    #[must_use]
    pub fn resulting_state(&self) -> OrderState {
        match self {
            Self::Created { .. } => OrderState::Created,
            Self::Approved => OrderState::Approved,
            Self::Rejected => OrderState::Rejected,
            Self::Completed { .. } => OrderState::Completed,
            Self::Refunded { .. } => OrderState::Refunded,
        }
    }

    /// Value that left custody with this event, if any.
    #[must_use]
    pub fn payout(&self) -> Option<(Identity, Amount)> {
        match self {
            Self::Completed { recipient, amount } => Some((*recipient, *amount)),
            Self::Refunded { depositor, amount } => Some((*depositor, *amount)),
            _ => None,
        }
    }

    /// Canonical byte form fed into the event hash.
    ///
    /// Format: `tag(1) || fields...`, fixed order. Amounts are decimal
    /// strings behind an 8-byte length prefix.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        match self {
            Self::Created {
                amount,
                expiry,
                recipient,
                depositor,
            } => {
                out.push(0);
                put_decimal(&mut out, *amount);
                out.extend_from_slice(&expiry.timestamp_micros().to_le_bytes());
                match recipient {
                    Some(r) => {
                        out.push(1);
                        out.extend_from_slice(r.as_bytes());
                    }
                    None => out.push(0),
                }
                out.extend_from_slice(depositor.as_bytes());
            }
            Self::Approved => out.push(1),
            Self::Rejected => out.push(2),
            Self::Completed { recipient, amount } => {
                out.push(3);
                out.extend_from_slice(recipient.as_bytes());
                put_decimal(&mut out, *amount);
            }
            Self::Refunded { depositor, amount } => {
                out.push(4);
                out.extend_from_slice(depositor.as_bytes());
                put_decimal(&mut out, *amount);
            }
        }
        out
    }
}

/// `len(8, LE) || utf8` of the amount's decimal form.
fn put_decimal(out: &mut Vec<u8>, amount: Amount) {
    let text = amount.to_string();
    out.extend_from_slice(&(text.len() as u64).to_le_bytes());
    out.extend_from_slice(text.as_bytes());
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created { .. } => write!(f, "ORDER_CREATED"),
            Self::Approved => write!(f, "ORDER_APPROVED"),
            Self::Rejected => write!(f, "ORDER_REJECTED"),
            Self::Completed { .. } => write!(f, "ORDER_COMPLETED"),
            Self::Refunded { .. } => write!(f, "ORDER_REFUNDED"),
        }
    }
}

/// One entry of the ledger's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Unique, time-ordered event id.
    pub id: EventId,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    /// The order this event belongs to.
    pub order_id: OrderId,
    /// Creation nonce of the record the event applies to.
    pub order_nonce: u64,
    /// Who triggered the transition.
    pub caller: Identity,
    /// What happened.
    pub kind: EventKind,
    /// Ambient time of the call that produced the event.
    pub recorded_at: DateTime<Utc>,
    /// Hash of the previous event ([`constants::GENESIS_HASH`] for the first).
    pub prev_hash: [u8; 32],
    /// SHA-256 over the canonical form of this event, `prev_hash` included.
    pub hash: [u8; 32],
}

impl LedgerEvent {
    /// Build an event and seal it with its hash.
    #[must_use]
    pub fn new(
        sequence: u64,
        order_id: OrderId,
        order_nonce: u64,
        caller: Identity,
        kind: EventKind,
        recorded_at: DateTime<Utc>,
        prev_hash: [u8; 32],
    ) -> Self {
        let mut event = Self {
            id: EventId::new(),
            sequence,
            order_id,
            order_nonce,
            caller,
            kind,
            recorded_at,
            prev_hash,
            hash: [0u8; 32],
        };
        event.hash = event.compute_hash();
        event
    }

    /// `SHA-256(domain || sequence || order_id_len || order_id || nonce ||
    /// caller || kind || recorded_at || prev_hash)`
    #[must_use]
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::EVENT_HASH_DOMAIN);
        hasher.update(self.sequence.to_le_bytes());
        hasher.update((self.order_id.as_bytes().len() as u64).to_le_bytes());
        hasher.update(self.order_id.as_bytes());
        hasher.update(self.order_nonce.to_le_bytes());
        hasher.update(self.caller.as_bytes());
        hasher.update(self.kind.canonical_bytes());
        hasher.update(self.recorded_at.timestamp_micros().to_le_bytes());
        hasher.update(self.prev_hash);
        hasher.finalize().into()
    }

    /// Whether the stored hash matches the event contents.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.hash == self.compute_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn make_event(kind: EventKind) -> LedgerEvent {
        LedgerEvent::new(
            0,
            OrderId::new("A").unwrap(),
            1,
            Identity::random(),
            kind,
            Utc::now(),
            constants::GENESIS_HASH,
        )
    }

    #[test]
    fn kind_display() {
        assert_eq!(EventKind::Approved.to_string(), "ORDER_APPROVED");
        assert_eq!(EventKind::Rejected.to_string(), "ORDER_REJECTED");
    }

    #[test]
    fn resulting_state_matches_kind() {
        let amount = Amount::new(Decimal::ONE).unwrap();
        let who = Identity::random();
        assert_eq!(EventKind::Approved.resulting_state(), OrderState::Approved);
        assert_eq!(
            EventKind::Completed {
                recipient: who,
                amount
            }
            .resulting_state(),
            OrderState::Completed
        );
        assert_eq!(
            EventKind::Refunded {
                depositor: who,
                amount
            }
            .payout(),
            Some((who, amount))
        );
        assert_eq!(EventKind::Rejected.payout(), None);
    }

    #[test]
    fn new_event_is_sealed() {
        let event = make_event(EventKind::Approved);
        assert!(event.is_sealed());
    }

    #[test]
    fn tampering_breaks_seal() {
        let mut event = make_event(EventKind::Approved);
        event.kind = EventKind::Rejected;
        assert!(!event.is_sealed());
    }

    #[test]
    fn hash_depends_on_prev_hash() {
        let a = make_event(EventKind::Approved);
        let mut b = a.clone();
        b.prev_hash = [7u8; 32];
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn amounts_are_length_prefixed() {
        let who = Identity::from_bytes([9u8; 32]);
        let kind = EventKind::Completed {
            recipient: who,
            amount: Amount::new(Decimal::new(125, 1)).unwrap(),
        };
        let bytes = kind.canonical_bytes();
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..33], who.as_bytes());
        assert_eq!(&bytes[33..41], &4u64.to_le_bytes());
        assert_eq!(&bytes[41..], b"12.5");
    }

    #[test]
    fn serde_roundtrip() {
        let event = make_event(EventKind::Created {
            amount: Amount::new(Decimal::new(100, 0)).unwrap(),
            expiry: Utc::now(),
            recipient: None,
            depositor: Identity::random(),
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
        assert!(back.is_sealed());
    }
}
