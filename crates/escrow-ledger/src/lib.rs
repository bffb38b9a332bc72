//! # escrow-ledger
//!
//! **Ledger Plane**: the order lifecycle state machine and everything that
//! decides whether value may move.
//!
//! ## Architecture
//!
//! 1. **OrderStore**: the authoritative id → order mapping
//! 2. **AuthorizationPolicy**: open, or gated by a single verifier
//! 3. **EscrowLedger**: validates each call, writes the new state, then
//!    hands value to the custody plane
//! 4. **EventLog**: one hash-chained event per committed transition
//! 5. **SharedLedger**: lock-serialized handle for concurrent callers
//!
//! ## Order Flow
//!
//! ```text
//! create ─▶ CREATED ─approve─▶ APPROVED ─complete─▶ COMPLETED (pay recipient)
//!              │  └─reject──▶ REJECTED ─batch──┐
//!              └─refund (expired)──────────────┴──▶ REFUNDED  (pay depositor)
//! ```
//!
//! Value leaves custody at most once per order record.

pub mod authorization;
pub mod batch;
pub mod event_log;
pub mod ledger;
pub mod shared;
pub mod store;

pub use authorization::{policy_for, AuthorizationPolicy, OpenPolicy, VerifierPolicy};
pub use batch::{BatchEntry, BatchEntryOutcome, BatchReport, SkipReason};
pub use event_log::EventLog;
pub use ledger::EscrowLedger;
pub use shared::SharedLedger;
pub use store::{InMemoryOrderStore, OrderStore};
