//! Append-only, hash-chained event log.
//!
//! Each committed transition appends exactly one [`LedgerEvent`]. The
//! event's `prev_hash` commits to its predecessor, so indexers replaying
//! the log can detect a dropped, reordered or edited entry with
//! [`EventLog::verify_chain`].

use chrono::{DateTime, Utc};
use escrow_types::{
    constants, EscrowError, EventKind, Identity, LedgerEvent, Order, OrderId, Result,
};

/// The ledger's audit trail.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal and append the event for a transition of `order`.
    pub fn append(
        &mut self,
        order: &Order,
        caller: Identity,
        kind: EventKind,
        at: DateTime<Utc>,
    ) -> &LedgerEvent {
        let event = LedgerEvent::new(
            self.events.len() as u64,
            order.id.clone(),
            order.nonce,
            caller,
            kind,
            at,
            self.head_hash(),
        );
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Hash of the newest event, or the genesis hash for an empty log.
    #[must_use]
    pub fn head_hash(&self) -> [u8; 32] {
        self.events
            .last()
            .map_or(constants::GENESIS_HASH, |event| event.hash)
    }

    #[must_use]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Events for `id`, oldest first. Includes events of records that a
    /// legacy overwrite has since replaced; `order_nonce` tells them apart.
    #[must_use]
    pub fn events_for(&self, id: &OrderId) -> Vec<&LedgerEvent> {
        self.events.iter().filter(|e| &e.order_id == id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every event from position `len` on.
    ///
    /// Only for unwinding events appended earlier in the same atomic call.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Check sequence numbers, per-event hashes and the prev-hash links.
    ///
    /// # Errors
    /// Returns `Internal` naming the first broken entry.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev = constants::GENESIS_HASH;
        for (pos, event) in self.events.iter().enumerate() {
            if event.sequence != pos as u64 {
                return Err(EscrowError::Internal(format!(
                    "event log gap: position {pos} holds sequence {}",
                    event.sequence
                )));
            }
            if event.prev_hash != prev {
                return Err(EscrowError::Internal(format!(
                    "event {pos} does not link to its predecessor"
                )));
            }
            if !event.is_sealed() {
                return Err(EscrowError::Internal(format!(
                    "event {pos} hash does not match its contents"
                )));
            }
            prev = event.hash;
        }
        Ok(())
    }
}
