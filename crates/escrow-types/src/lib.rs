//! # escrow-types
//!
//! Shared types, errors, and configuration for the custodial **escrow ledger**.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`Identity`], [`EventId`]
//! - **Value**: [`Amount`]
//! - **Order model**: [`Order`], [`OrderState`]
//! - **Call model**: [`CallContext`], [`Action`]
//! - **Event model**: [`LedgerEvent`], [`EventKind`]
//! - **Configuration**: [`LedgerConfig`], [`AuthorizationMode`], [`RecipientMode`],
//!   [`DuplicateOrderPolicy`], [`PayoutRouting`], [`BatchMode`]
//! - **Errors**: [`EscrowError`] with `ESC_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use escrow_types::{Order, OrderState, Identity, ...};

pub use amount::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;

// Constants are accessed via `escrow_types::constants::FOO`
// (not re-exported to avoid name collisions).
