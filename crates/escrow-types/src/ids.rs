//! Identifiers used throughout the escrow ledger.
//!
//! Orders are keyed by an opaque caller-supplied string. Parties are keyed
//! by a 32-byte [`Identity`] (the raw ed25519 public key form). Ledger
//! events carry a UUIDv7 so indexers can sort them by time.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{EscrowError, Result};

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Opaque, caller-supplied order identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    /// Wrap a caller-supplied identifier.
    ///
    /// # Errors
    /// Returns [`EscrowError::EmptyOrderId`] if `id` is empty.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(EscrowError::EmptyOrderId);
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for OrderId {
    type Error = EscrowError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for OrderId {
    type Error = EscrowError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A party known to the ledger: depositor, recipient, verifier or caller.
///
/// Stored as the raw 32-byte ed25519 public key. The all-zero value is the
/// null identity and is never a valid payout target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Identity(pub [u8; 32]);

impl Identity {
    /// The null identity.
    pub const NULL: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Identity of the holder of an ed25519 verifying key.
    #[must_use]
    pub fn from_verifying_key(key: &ed25519_dalek::VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Full 64-character hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{}", hex::encode(&self.0[..8]))
    }
}

impl FromStr for Identity {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| EscrowError::Serialization(format!("identity {s:?}: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            EscrowError::Serialization(format!("identity must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Random identity for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Identity {
    pub fn random() -> Self {
        let mut bytes = rand::random::<[u8; 32]>();
        // Keep the null identity out of the sample space.
        bytes[0] |= 1;
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// EventId
// ---------------------------------------------------------------------------

/// Globally unique ledger event identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_rejects_empty() {
        assert!(matches!(OrderId::new(""), Err(EscrowError::EmptyOrderId)));
        assert_eq!(OrderId::new("A").unwrap().as_str(), "A");
    }

    #[test]
    fn order_id_deserialize_enforces_non_empty() {
        let err = serde_json::from_str::<OrderId>("\"\"");
        assert!(err.is_err());
        let id: OrderId = serde_json::from_str("\"order-7\"").unwrap();
        assert_eq!(id.to_string(), "order-7");
    }

    #[test]
    fn null_identity() {
        assert!(Identity::NULL.is_null());
        assert!(!Identity::random().is_null());
    }

    #[test]
    fn identity_hex_roundtrip() {
        let id = Identity::random();
        let parsed: Identity = id.to_hex().parse().unwrap();
        assert_eq!(id, parsed);

        let prefixed: Identity = format!("0x{}", id.to_hex()).parse().unwrap();
        assert_eq!(id, prefixed);
    }

    #[test]
    fn identity_parse_rejects_wrong_length() {
        assert!("abcd".parse::<Identity>().is_err());
        assert!("zz".repeat(32).parse::<Identity>().is_err());
    }

    #[test]
    fn identity_from_verifying_key() {
        let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let verifying = signing.verifying_key();
        let id = Identity::from_verifying_key(&verifying);
        assert_eq!(id.as_bytes(), verifying.as_bytes());
    }

    #[test]
    fn identity_serializes_as_hex_string() {
        let id = Identity::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn event_id_ordering() {
        let a = EventId::new();
        let b = EventId::new();
        assert!(a < b);
    }
}
