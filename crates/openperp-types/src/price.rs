//! Price types: decoded attestation points and validated price bounds.

use std::collections::HashMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::{Address, PerpError, Result};

/// One token's decoded attestation: price bounds, validity window, scale.
///
/// Produced by the compacted-proof codec; consumed by the attestation
/// validator. `min_price` / `max_price` are in compacted units and must be
/// scaled by `10^decimals` to reach the protocol's price precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// The token this point prices.
    pub token: Address,
    /// Minimum attested price, compacted units.
    pub min_price: U256,
    /// Maximum attested price, compacted units.
    pub max_price: U256,
    /// Decimal scale: real price = compacted price * 10^decimals.
    pub decimals: u8,
    /// First oracle block covered by the attestation.
    pub min_block: u64,
    /// Last oracle block covered by the attestation.
    pub max_block: u64,
    /// Unix timestamp at which the attestation was produced.
    pub timestamp: u64,
}

impl PricePoint {
    /// Canonical bytes each oracle signer signs.
    ///
    /// Format: `"openperp:oracle:v1:" || token || min_price || max_price ||
    /// min_block || max_block || timestamp || decimals`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(160);
        payload.extend_from_slice(b"openperp:oracle:v1:");
        payload.extend_from_slice(self.token.as_bytes());
        payload.extend_from_slice(&self.min_price.to_big_endian());
        payload.extend_from_slice(&self.max_price.to_big_endian());
        payload.extend_from_slice(&self.min_block.to_le_bytes());
        payload.extend_from_slice(&self.max_block.to_le_bytes());
        payload.extend_from_slice(&self.timestamp.to_le_bytes());
        payload.push(self.decimals);
        payload
    }

    /// Minimum price scaled to protocol precision.
    #[must_use]
    pub fn scaled_min(&self) -> U256 {
        self.min_price * U256::exp10(usize::from(self.decimals))
    }

    /// Maximum price scaled to protocol precision.
    #[must_use]
    pub fn scaled_max(&self) -> U256 {
        self.max_price * U256::exp10(usize::from(self.decimals))
    }
}

/// Validated min/max price for one token, scaled to protocol precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: U256,
    pub max: U256,
}

impl PriceBounds {
    /// The bound that favors the pool: max when the trader benefits from a
    /// low price, min otherwise.
    #[must_use]
    pub fn pick(&self, maximize: bool) -> U256 {
        if maximize { self.max } else { self.min }
    }

    /// Midpoint, rounding down.
    #[must_use]
    pub fn mid(&self) -> U256 {
        (self.min + self.max) / U256::from(2u64)
    }
}

/// The attested prices that survived validation, keyed by token.
///
/// Only the attestation validator constructs one of these; holding a
/// `ValidatedPrices` is the settlement strategies' proof that every check
/// in the validator passed for every token in the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedPrices {
    prices: HashMap<Address, PriceBounds>,
}

impl ValidatedPrices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: Address, bounds: PriceBounds) {
        self.prices.insert(token, bounds);
    }

    #[must_use]
    pub fn get(&self, token: Address) -> Option<&PriceBounds> {
        self.prices.get(&token)
    }

    /// Like [`Self::get`] but an error if the token was not attested.
    pub fn require(&self, token: Address) -> Result<&PriceBounds> {
        self.prices
            .get(&token)
            .ok_or(PerpError::PriceNotAttested { token })
    }

    #[must_use]
    pub fn contains(&self, token: Address) -> bool {
        self.prices.contains_key(&token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
