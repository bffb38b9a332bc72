//! Custody of escrowed value.
//!
//! The [`Treasury`] trait is the seam between the ledger's state machine
//! and whatever actually moves value. [`CustodyVault`] is the in-process
//! implementation: one escrowed pool plus the value credited to each party
//! that has been paid out of it.

use std::collections::HashMap;

use escrow_types::{Amount, EscrowError, Identity, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Moves value into and out of the ledger's custody.
///
/// Every method is all-or-nothing: on `Err` the treasury is unchanged.
pub trait Treasury: Send + Sync {
    /// Take custody of `amount` attached by `from`.
    fn escrow(&mut self, from: Identity, amount: Amount) -> Result<()>;

    /// Hand `amount` out of custody to `to`.
    fn release(&mut self, to: Identity, amount: Amount) -> Result<()>;

    /// Compensate a release made earlier in the same call, pulling the
    /// value back into custody (all-or-nothing batch rollback).
    fn reverse_release(&mut self, to: Identity, amount: Amount) -> Result<()>;

    /// Value currently held in custody.
    fn escrowed(&self) -> Decimal;

    /// Total value paid out of custody to `who` so far.
    fn credited(&self, who: &Identity) -> Decimal;
}

/// Point-in-time view of a [`CustodyVault`], for audit exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub escrowed: Decimal,
    pub credited: Vec<(Identity, Decimal)>,
}

/// In-process custody: an escrowed pool and per-party credited balances.
#[derive(Debug, Default)]
pub struct CustodyVault {
    /// Value held on behalf of live orders.
    escrowed: Decimal,
    /// Value paid out, per receiving party.
    credited: HashMap<Identity, Decimal>,
}

impl CustodyVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Escrowed plus everything credited out. Constant across releases.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.escrowed + self.credited.values().copied().sum::<Decimal>()
    }

    /// Sorted snapshot of the vault.
    #[must_use]
    pub fn snapshot(&self) -> VaultSnapshot {
        let mut credited: Vec<(Identity, Decimal)> =
            self.credited.iter().map(|(k, v)| (*k, *v)).collect();
        credited.sort_by(|a, b| a.0.cmp(&b.0));
        VaultSnapshot {
            escrowed: self.escrowed,
            credited,
        }
    }

    fn take_from_pool(&mut self, amount: Decimal) -> Result<()> {
        if self.escrowed < amount {
            return Err(EscrowError::InsufficientCustody {
                needed: amount,
                escrowed: self.escrowed,
            });
        }
        self.escrowed -= amount;
        Ok(())
    }

    fn credited_after(&self, to: &Identity, amount: Decimal) -> Result<Decimal> {
        self.credited(to)
            .checked_add(amount)
            .ok_or(EscrowError::ValueOverflow {
                context: "credited balance",
            })
    }
}

fn pool_after(escrowed: Decimal, amount: Decimal) -> Result<Decimal> {
    escrowed.checked_add(amount).ok_or(EscrowError::ValueOverflow {
        context: "custody pool",
    })
}

impl Treasury for CustodyVault {
    fn escrow(&mut self, from: Identity, amount: Amount) -> Result<()> {
        if from.is_null() {
            return Err(EscrowError::NullIdentity { role: "depositor" });
        }
        self.escrowed = pool_after(self.escrowed, amount.value())?;
        Ok(())
    }

    fn release(&mut self, to: Identity, amount: Amount) -> Result<()> {
        if to.is_null() {
            return Err(EscrowError::TransferFailed {
                to,
                reason: "null payout target".into(),
            });
        }
        let credited = self.credited_after(&to, amount.value())?;
        self.take_from_pool(amount.value())?;
        self.credited.insert(to, credited);
        tracing::debug!(to = %to, amount = %amount, "Value released from custody");
        Ok(())
    }

    fn reverse_release(&mut self, to: Identity, amount: Amount) -> Result<()> {
        let escrowed = pool_after(self.escrowed, amount.value())?;
        let entry = self
            .credited
            .get_mut(&to)
            .filter(|credited| **credited >= amount.value())
            .ok_or_else(|| EscrowError::Internal(format!(
                "cannot reverse release of {amount} to {to}: not credited"
            )))?;
        *entry -= amount.value();
        self.escrowed = escrowed;
        Ok(())
    }

    fn escrowed(&self) -> Decimal {
        self.escrowed
    }

    fn credited(&self, who: &Identity) -> Decimal {
        self.credited.get(who).copied().unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(v: i64) -> Amount {
        Amount::new(Decimal::new(v, 0)).unwrap()
    }

    #[test]
    fn escrow_increases_pool() {
        let mut vault = CustodyVault::new();
        vault.escrow(Identity::random(), amt(100)).unwrap();
        assert_eq!(vault.escrowed(), Decimal::new(100, 0));
    }

    #[test]
    fn escrow_from_null_rejected() {
        let mut vault = CustodyVault::new();
        let err = vault.escrow(Identity::NULL, amt(1)).unwrap_err();
        assert!(matches!(err, EscrowError::NullIdentity { .. }));
        assert_eq!(vault.escrowed(), Decimal::ZERO);
    }

    #[test]
    fn release_moves_to_recipient() {
        let mut vault = CustodyVault::new();
        let recipient = Identity::random();
        vault.escrow(Identity::random(), amt(100)).unwrap();
        vault.release(recipient, amt(100)).unwrap();
        assert_eq!(vault.escrowed(), Decimal::ZERO);
        assert_eq!(vault.credited(&recipient), Decimal::new(100, 0));
    }

    #[test]
    fn release_beyond_custody_fails() {
        let mut vault = CustodyVault::new();
        let recipient = Identity::random();
        vault.escrow(Identity::random(), amt(50)).unwrap();
        let err = vault.release(recipient, amt(100)).unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientCustody { .. }));
        // Unchanged
        assert_eq!(vault.escrowed(), Decimal::new(50, 0));
        assert_eq!(vault.credited(&recipient), Decimal::ZERO);
    }

    #[test]
    fn escrow_overflow_rejected() {
        let mut vault = CustodyVault::new();
        let depositor = Identity::random();
        vault
            .escrow(depositor, Amount::new(Decimal::MAX).unwrap())
            .unwrap();
        let err = vault.escrow(depositor, amt(1)).unwrap_err();
        assert_eq!(
            err,
            EscrowError::ValueOverflow {
                context: "custody pool"
            }
        );
        assert_eq!(vault.escrowed(), Decimal::MAX);
    }

    #[test]
    fn credit_overflow_leaves_pool_untouched() {
        let mut vault = CustodyVault::new();
        let recipient = Identity::random();
        let max = Amount::new(Decimal::MAX).unwrap();
        vault.escrow(Identity::random(), max).unwrap();
        vault.release(recipient, max).unwrap();
        vault.escrow(Identity::random(), amt(1)).unwrap();

        let err = vault.release(recipient, amt(1)).unwrap_err();
        assert!(matches!(err, EscrowError::ValueOverflow { .. }));
        assert_eq!(vault.escrowed(), Decimal::ONE);
        assert_eq!(vault.credited(&recipient), Decimal::MAX);
    }

    #[test]
    fn release_to_null_fails() {
        let mut vault = CustodyVault::new();
        vault.escrow(Identity::random(), amt(10)).unwrap();
        let err = vault.release(Identity::NULL, amt(10)).unwrap_err();
        assert!(matches!(err, EscrowError::TransferFailed { .. }));
        assert_eq!(vault.escrowed(), Decimal::new(10, 0));
    }

    #[test]
    fn reverse_release_restores_pool() {
        let mut vault = CustodyVault::new();
        let recipient = Identity::random();
        vault.escrow(Identity::random(), amt(30)).unwrap();
        vault.release(recipient, amt(30)).unwrap();
        vault.reverse_release(recipient, amt(30)).unwrap();
        assert_eq!(vault.escrowed(), Decimal::new(30, 0));
        assert_eq!(vault.credited(&recipient), Decimal::ZERO);
    }

    #[test]
    fn reverse_release_requires_credit() {
        let mut vault = CustodyVault::new();
        let err = vault
            .reverse_release(Identity::random(), amt(1))
            .unwrap_err();
        assert!(matches!(err, EscrowError::Internal(_)));
    }

    #[test]
    fn total_supply_constant_across_release() {
        let mut vault = CustodyVault::new();
        vault.escrow(Identity::random(), amt(70)).unwrap();
        vault.escrow(Identity::random(), amt(30)).unwrap();
        let before = vault.total_supply();
        vault.release(Identity::random(), amt(70)).unwrap();
        assert_eq!(vault.total_supply(), before);
        assert_eq!(before, Decimal::new(100, 0));
    }

    #[test]
    fn snapshot_serde_roundtrip() {
        let mut vault = CustodyVault::new();
        vault.escrow(Identity::random(), amt(5)).unwrap();
        vault.release(Identity::random(), amt(2)).unwrap();
        let snap = vault.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: VaultSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
        assert_eq!(back.escrowed, Decimal::new(3, 0));
    }
}
