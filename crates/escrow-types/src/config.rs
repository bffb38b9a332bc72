//! Ledger configuration, chosen once at construction by the deployer.
//!
//! The defaults select the safe behaviour everywhere a legacy variant
//! exists: duplicate ids are refused, refunds go to the recorded
//! depositor only, and batch entries report their own outcomes.

use serde::{Deserialize, Serialize};

use crate::{constants, EscrowError, Identity, Result};

/// Who may drive orders through their lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// No verifier concept: every caller is trusted.
    Open,
    /// A single verifier identity gates approve, reject, complete, refund
    /// and batch withdrawal.
    Verifier { verifier: Identity },
}

/// Where the completion recipient comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientMode {
    /// Fixed by the depositor at creation.
    #[default]
    FixedAtCreation,
    /// Supplied by the completing caller.
    SuppliedAtCompletion,
}

/// What `create_order` does when the id already holds a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateOrderPolicy {
    /// Refuse the creation.
    #[default]
    Reject,
    /// Legacy: replace the record. The replaced record's value stays in
    /// custody as stranded value.
    Overwrite,
}

/// Who receives value released through the refund path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutRouting {
    /// Only the depositor recorded at creation; a supplied target must match.
    #[default]
    RecordedDepositor,
    /// Legacy: whichever non-null target the caller supplies.
    CallerSupplied,
}

/// How a batch withdrawal treats a failing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Entries commit independently; failures are reported per entry.
    #[default]
    PerEntry,
    /// The first failure aborts the call and rolls back the whole batch.
    AllOrNothing,
}

/// Configuration for one ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub authorization: AuthorizationMode,
    pub recipient_mode: RecipientMode,
    pub duplicate_policy: DuplicateOrderPolicy,
    pub payout_routing: PayoutRouting,
    pub batch_mode: BatchMode,
    /// Maximum entries accepted by one batch withdrawal.
    pub max_batch_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            authorization: AuthorizationMode::Open,
            recipient_mode: RecipientMode::default(),
            duplicate_policy: DuplicateOrderPolicy::default(),
            payout_routing: PayoutRouting::default(),
            batch_mode: BatchMode::default(),
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl LedgerConfig {
    /// Default settings gated by `verifier`.
    #[must_use]
    pub fn with_verifier(verifier: Identity) -> Self {
        Self {
            authorization: AuthorizationMode::Verifier { verifier },
            ..Self::default()
        }
    }

    /// The verifier identity, if the ledger is verifier-gated.
    #[must_use]
    pub fn verifier(&self) -> Option<Identity> {
        match self.authorization {
            AuthorizationMode::Open => None,
            AuthorizationMode::Verifier { verifier } => Some(verifier),
        }
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `Configuration` for a null verifier or a zero batch size.
    pub fn validate(&self) -> Result<()> {
        if let AuthorizationMode::Verifier { verifier } = self.authorization {
            if verifier.is_null() {
                return Err(EscrowError::Configuration(
                    "verifier identity must not be null".into(),
                ));
            }
        }
        if self.max_batch_size == 0 {
            return Err(EscrowError::Configuration(
                "max_batch_size must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns `Configuration` if the document is malformed or invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| EscrowError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
