//! Payout guard: value leaves custody at most once per order record.
//!
//! The order state machine already forbids a second payout. The guard is
//! the independent second line: it remembers every order record (by
//! creation nonce) that has been paid, and refuses to mark one twice.
//! Unlike a settlement cache it never evicts, because a forgotten entry
//! would reopen a double-payout window.

use std::collections::HashSet;

use escrow_types::{EscrowError, OrderId, Result};

/// Remembers which order records have been paid out.
#[derive(Debug, Default)]
pub struct PayoutGuard {
    /// Creation nonces of paid-out records.
    paid: HashSet<u64>,
}

impl PayoutGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the record as paid.
    ///
    /// # Errors
    /// Returns [`EscrowError::AlreadyPaidOut`] if `nonce` was already marked.
    pub fn mark_paid(&mut self, id: &OrderId, nonce: u64) -> Result<()> {
        if !self.paid.insert(nonce) {
            return Err(EscrowError::AlreadyPaidOut {
                id: id.clone(),
                nonce,
            });
        }
        Ok(())
    }

    /// Undo a mark made in the same atomic unit whose transfer then failed.
    pub fn unmark(&mut self, nonce: u64) {
        self.paid.remove(&nonce);
    }

    #[must_use]
    pub fn is_paid(&self, nonce: u64) -> bool {
        self.paid.contains(&nonce)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> OrderId {
        OrderId::new("A").unwrap()
    }

    #[test]
    fn first_payout_ok() {
        let mut guard = PayoutGuard::new();
        assert!(guard.mark_paid(&id(), 1).is_ok());
        assert!(guard.is_paid(1));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn double_payout_blocked() {
        let mut guard = PayoutGuard::new();
        guard.mark_paid(&id(), 1).unwrap();

        let err = guard.mark_paid(&id(), 1).unwrap_err();
        assert!(
            matches!(err, EscrowError::AlreadyPaidOut { nonce: 1, .. }),
            "Expected AlreadyPaidOut, got: {err:?}"
        );
    }

    #[test]
    fn same_id_new_record_is_distinct() {
        // A legacy overwrite creates a new record (new nonce) at the same id.
        let mut guard = PayoutGuard::new();
        guard.mark_paid(&id(), 1).unwrap();
        assert!(guard.mark_paid(&id(), 2).is_ok());
    }

    #[test]
    fn unmark_reopens_record() {
        let mut guard = PayoutGuard::new();
        guard.mark_paid(&id(), 9).unwrap();
        guard.unmark(9);
        assert!(!guard.is_paid(9));
        assert!(guard.mark_paid(&id(), 9).is_ok());
    }

    #[test]
    fn empty_guard() {
        let guard = PayoutGuard::new();
        assert!(guard.is_empty());
        assert!(!guard.is_paid(0));
    }
}
