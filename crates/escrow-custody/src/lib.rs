//! # escrow-custody
//!
//! **Custody Plane**: where escrowed value lives and how it leaves.
//!
//! ## Architecture
//!
//! The ledger's state machine decides *whether* value moves; this crate
//! moves it and double-checks it:
//! 1. [`Treasury`] / [`CustodyVault`]: escrow on creation, release on payout
//! 2. [`PayoutGuard`]: each order record is paid out at most once
//! 3. [`CustodyConservation`]: custody always equals deposits minus payouts

pub mod conservation;
pub mod payout_guard;
pub mod treasury;

pub use conservation::CustodyConservation;
pub use payout_guard::PayoutGuard;
pub use treasury::{CustodyVault, Treasury, VaultSnapshot};
