//! Thread-safe handle over one ledger.
//!
//! Writers serialize on the lock, so each mutating call stays one atomic
//! unit. Readers only ever observe committed state.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use escrow_types::{EscrowError, OrderId, OrderState, Result};

use crate::ledger::EscrowLedger;

/// Cloneable, shareable [`EscrowLedger`].
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<EscrowLedger>>,
}

impl SharedLedger {
    #[must_use]
    pub fn new(ledger: EscrowLedger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// # Errors
    /// `Internal` if a writer panicked while holding the lock.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, EscrowLedger>> {
        self.inner
            .read()
            .map_err(|_| EscrowError::Internal("ledger lock poisoned".into()))
    }

    /// # Errors
    /// `Internal` if a writer panicked while holding the lock.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, EscrowLedger>> {
        self.inner
            .write()
            .map_err(|_| EscrowError::Internal("ledger lock poisoned".into()))
    }

    /// Run `f` with exclusive access.
    ///
    /// # Errors
    /// Lock poisoning, or whatever `f` returns.
    pub fn with_write<T>(&self, f: impl FnOnce(&mut EscrowLedger) -> Result<T>) -> Result<T> {
        let mut ledger = self.write()?;
        f(&mut ledger)
    }

    /// # Errors
    /// Lock poisoning or `OrderNotFound`.
    pub fn get_order_state(&self, id: &OrderId) -> Result<OrderState> {
        self.read()?.get_order_state(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use escrow_types::{CallContext, Identity, LedgerConfig};
    use rust_decimal::Decimal;

    #[test]
    fn clones_share_one_ledger() {
        let shared = SharedLedger::new(EscrowLedger::new(LedgerConfig::default()).unwrap());
        let other = shared.clone();
        let ctx = CallContext::now(Identity::random());

        shared
            .with_write(|l| {
                l.create_order(
                    ctx,
                    "A",
                    Decimal::ONE,
                    ctx.at + Duration::hours(1),
                    Some(Identity::random()),
                )
            })
            .unwrap();

        let id = OrderId::new("A").unwrap();
        assert_eq!(other.get_order_state(&id).unwrap(), OrderState::Created);
        assert_eq!(other.read().unwrap().order_count(), 1);
    }
}
