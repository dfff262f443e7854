//! Fixed-width identifiers used throughout OpenPerp.
//!
//! Addresses and keys are opaque 32-byte values. Request keys and parameter
//! keys are SHA-256 outputs (see [`crate::keys`]); addresses are whatever the
//! surrounding ledger uses for accounts, tokens, and markets.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A ledger address: account, token contract, or market token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The zero address, used for "no callback" and "no fee receiver".
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0[..8]))
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// A random address for unit tests.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }
}

// ---------------------------------------------------------------------------
// RequestKey
// ---------------------------------------------------------------------------

/// Unique identifier for a pending request (order, deposit, or withdrawal).
///
/// Derived by [`crate::keys::derive_request_key`] from the request's
/// immutable fields plus an account-scoped nonce. No two simultaneously
/// pending requests share a key; a consumed key is never reused for a
/// request with different content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RequestKey(pub [u8; 32]);

impl RequestKey {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// ParamKey
// ---------------------------------------------------------------------------

/// Storage-slot key for the generic data store.
///
/// Produced by hashing a parameter name plus optional scoping arguments,
/// e.g. "max pool amount for (market, token)". See [`crate::keys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ParamKey(pub [u8; 32]);

impl ParamKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1u8; 32]).is_zero());
    }

    #[test]
    fn address_display_is_prefixed_hex() {
        let addr = Address([0xab; 32]);
        assert_eq!(format!("{addr}"), "0xabababababababab");
    }

    #[test]
    fn request_key_display() {
        let key = RequestKey([0x01; 32]);
        assert_eq!(format!("{key}"), "req:0101010101010101");
        assert_eq!(key.short(), "01010101");
    }

    #[test]
    fn random_addresses_differ() {
        assert_ne!(Address::random(), Address::random());
    }

    #[test]
    fn serde_roundtrips() {
        let addr = Address::random();
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);

        let key = RequestKey([7u8; 32]);
        let json = serde_json::to_string(&key).unwrap();
        let back: RequestKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }
}
