//! Authorization policy: who may drive an order through its lifecycle.
//!
//! The policy is chosen once, at construction, from
//! [`AuthorizationMode`]. Both modes sit behind the same trait so the
//! ledger never branches on which one is active.
//!
//! | Action           | `OpenPolicy` | `VerifierPolicy`  |
//! |------------------|--------------|-------------------|
//! | `Create`         | anyone       | anyone            |
//! | `Approve`        | anyone       | verifier only     |
//! | `Reject`         | anyone       | verifier only     |
//! | `Complete`       | anyone       | verifier only     |
//! | `Refund`         | anyone       | verifier only     |
//! | `BatchWithdraw`  | anyone       | verifier only     |

use escrow_types::{Action, AuthorizationMode, EscrowError, Identity, Result};

/// Capability check on the caller identity of a ledger call.
pub trait AuthorizationPolicy: Send + Sync {
    /// # Errors
    /// Returns [`EscrowError::Unauthorized`] if `caller` may not perform `action`.
    fn authorize(&self, caller: &Identity, action: Action) -> Result<()>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Every caller is trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenPolicy;

impl AuthorizationPolicy for OpenPolicy {
    fn authorize(&self, _caller: &Identity, _action: Action) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "open"
    }
}

/// A single verifier identity gates every action except creation.
#[derive(Debug, Clone, Copy)]
pub struct VerifierPolicy {
    verifier: Identity,
}

impl VerifierPolicy {
    #[must_use]
    pub fn new(verifier: Identity) -> Self {
        Self { verifier }
    }

    #[must_use]
    pub fn verifier(&self) -> Identity {
        self.verifier
    }
}

impl AuthorizationPolicy for VerifierPolicy {
    fn authorize(&self, caller: &Identity, action: Action) -> Result<()> {
        if action == Action::Create || *caller == self.verifier {
            return Ok(());
        }
        Err(EscrowError::Unauthorized {
            caller: *caller,
            action,
        })
    }

    fn name(&self) -> &'static str {
        "verifier"
    }
}

/// Build the policy selected by `mode`.
#[must_use]
pub fn policy_for(mode: AuthorizationMode) -> Box<dyn AuthorizationPolicy> {
    match mode {
        AuthorizationMode::Open => Box::new(OpenPolicy),
        AuthorizationMode::Verifier { verifier } => Box::new(VerifierPolicy::new(verifier)),
    }
}
