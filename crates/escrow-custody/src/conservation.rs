//! Custody conservation invariant checker.
//!
//! Mathematical invariants enforced after every committed call:
//! ```text
//! escrowed == Σ(deposits) - Σ(payouts)
//! escrowed == Σ(amount of records still holding funds) + stranded
//! ```
//!
//! `stranded` is value whose record was clobbered by a legacy duplicate-id
//! overwrite: still in custody, no longer addressable.

use escrow_types::{EscrowError, Result};
use rust_decimal::Decimal;

/// Independent running totals of value entering and leaving custody.
#[derive(Debug, Default)]
pub struct CustodyConservation {
    deposits: Decimal,
    payouts: Decimal,
    stranded: Decimal,
}

impl CustodyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns `ValueOverflow` if the deposit total would overflow; the
    /// totals are unchanged.
    pub fn record_deposit(&mut self, amount: Decimal) -> Result<()> {
        self.deposits = checked_total(self.deposits, amount, "deposit total")?;
        Ok(())
    }

    /// Undo a deposit recorded in the same call, when custody refused it.
    pub fn reverse_deposit(&mut self, amount: Decimal) {
        self.deposits -= amount;
    }

    /// # Errors
    /// Returns `ValueOverflow` if the payout total would overflow.
    pub fn record_payout(&mut self, amount: Decimal) -> Result<()> {
        self.payouts = checked_total(self.payouts, amount, "payout total")?;
        Ok(())
    }

    /// Undo a payout recorded in the same call.
    pub fn reverse_payout(&mut self, amount: Decimal) {
        self.payouts -= amount;
    }

    pub fn record_stranded(&mut self, amount: Decimal) {
        self.stranded += amount;
    }

    /// Expected custody: deposits - payouts.
    #[must_use]
    pub fn expected_escrow(&self) -> Decimal {
        self.deposits - self.payouts
    }

    #[must_use]
    pub fn total_deposits(&self) -> Decimal {
        self.deposits
    }

    #[must_use]
    pub fn total_payouts(&self) -> Decimal {
        self.payouts
    }

    #[must_use]
    pub fn stranded(&self) -> Decimal {
        self.stranded
    }

    /// Check both invariants.
    ///
    /// - `actual_escrow`: what the treasury reports it holds
    /// - `live_total`: sum of amounts of records that still hold funds
    ///
    /// # Errors
    /// Returns [`EscrowError::CustodyInvariantViolation`] if either fails.
    pub fn verify(&self, actual_escrow: Decimal, live_total: Decimal) -> Result<()> {
        let expected = self.expected_escrow();
        if actual_escrow != expected {
            return Err(EscrowError::CustodyInvariantViolation {
                reason: format!(
                    "escrowed {actual_escrow} != expected {expected} \
                     (deposits={}, payouts={})",
                    self.deposits, self.payouts
                ),
            });
        }
        if actual_escrow != live_total + self.stranded {
            return Err(EscrowError::CustodyInvariantViolation {
                reason: format!(
                    "escrowed {actual_escrow} != live orders {live_total} + stranded {}",
                    self.stranded
                ),
            });
        }
        Ok(())
    }
}

fn checked_total(total: Decimal, amount: Decimal, context: &'static str) -> Result<Decimal> {
    total
        .checked_add(amount)
        .ok_or(EscrowError::ValueOverflow { context })
}
