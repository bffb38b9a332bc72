//! System-wide constants for the escrow ledger.

/// Default upper bound on entries in one batch withdrawal call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1_000;

/// Domain separator for ledger event hashes.
pub const EVENT_HASH_DOMAIN: &[u8] = b"escrow:event:v1:";

/// `prev_hash` of the first event in a log.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "EscrowLedger";
