//! The single fungible value unit escrowed by an order.
//!
//! An [`Amount`] is always strictly positive. A zero amount is how the
//! ledger encodes "no such order", so it can never be constructed here.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EscrowError, Result};

/// A strictly positive quantity of the escrowed value unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Validate an attached value.
    ///
    /// # Errors
    /// - `ZeroValue` if `value` is zero
    /// - `InvalidAmount` if `value` is negative
    pub fn new(value: Decimal) -> Result<Self> {
        if value.is_zero() {
            return Err(EscrowError::ZeroValue);
        }
        if value.is_sign_negative() {
            return Err(EscrowError::InvalidAmount { value });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EscrowError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
