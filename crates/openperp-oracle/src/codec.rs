//! The compacted price-proof wire format.
//!
//! A proof covering N tokens packs its per-token fields into 256-bit words
//! at fixed bit widths, cutting the call payload to a fraction of the naive
//! encoding:
//!
//! | Array | Bits/slot | Slots/word | Indexed? |
//! |---|---|---|---|
//! | `compacted_min_prices` / `compacted_max_prices` | 32 | 8 | yes |
//! | `compacted_min_price_indexes` / `compacted_max_price_indexes` | 8 | 32 | — |
//! | `compacted_decimals` | 8 | 32 | no |
//! | `compacted_min_block_numbers` / `compacted_max_block_numbers` | 64 | 4 | no |
//! | `compacted_timestamps` | 64 | 4 | no |
//!
//! Slot `j` of a packed array lives in word `j / slots_per_word`, at bit
//! offset `(j % slots_per_word) * bits`, least-significant slot first.
//!
//! Non-indexed arrays hold token `i`'s value in slot `i`. The two price
//! arrays need not preserve token order: price slot `j` belongs to the token
//! ordinal stored in index slot `j` of the matching index array. Decoding
//! therefore recovers the identical token → price mapping for every legal
//! packing arrangement.
//!
//! This is a binary serialization format: every unpack is bounds-checked
//! and every structural violation is a [`PerpError::MalformedProof`], never
//! a truncation or a default value.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use openperp_types::{Address, PerpError, PricePoint, Result, constants};

use crate::attestation::OracleSignature;

/// The compacted numeric arrays of a price proof, as they appear in the
/// execution call payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactedPrices {
    /// The tokens covered, ordinal position = token ordinal.
    pub tokens: Vec<Address>,
    pub compacted_min_block_numbers: Vec<U256>,
    pub compacted_max_block_numbers: Vec<U256>,
    pub compacted_timestamps: Vec<U256>,
    pub compacted_decimals: Vec<U256>,
    pub compacted_min_prices: Vec<U256>,
    pub compacted_min_price_indexes: Vec<U256>,
    pub compacted_max_prices: Vec<U256>,
    pub compacted_max_price_indexes: Vec<U256>,
}

/// A full price proof: compacted prices plus, per token ordinal, the
/// oracle signatures over that token's attestation payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceProof {
    pub prices: CompactedPrices,
    pub signatures: Vec<Vec<OracleSignature>>,
}

impl PriceProof {
    /// Decode the compacted arrays. See [`CompactedPrices::decode`].
    pub fn decode(&self) -> Result<Vec<PricePoint>> {
        self.prices.decode()
    }
}

fn malformed(reason: impl Into<String>) -> PerpError {
    PerpError::MalformedProof {
        reason: reason.into(),
    }
}

/// Words needed to hold `slots` slots at `slots_per_word` per word.
fn word_count(slots: usize, slots_per_word: usize) -> usize {
    slots.div_ceil(slots_per_word)
}

/// Extract slot `slot` from a packed array. `bits` must divide 256.
fn unpack(words: &[U256], slot: usize, bits: usize, array: &str) -> Result<U256> {
    let slots_per_word = 256 / bits;
    let word = words
        .get(slot / slots_per_word)
        .ok_or_else(|| malformed(format!("{array}: missing word for slot {slot}")))?;
    let shift = (slot % slots_per_word) * bits;
    let mask = (U256::one() << bits) - U256::one();
    Ok((*word >> shift) & mask)
}

/// Write `value` into slot `slot` of a packed array being built.
fn pack(words: &mut [U256], slot: usize, bits: usize, value: U256) {
    let slots_per_word = 256 / bits;
    let shift = (slot % slots_per_word) * bits;
    words[slot / slots_per_word] = words[slot / slots_per_word] | (value << shift);
}

fn check_word_count(words: &[U256], slots: usize, slots_per_word: usize, array: &str) -> Result<()> {
    let expected = word_count(slots, slots_per_word);
    if words.len() != expected {
        return Err(malformed(format!(
            "{array}: expected {expected} words for {slots} slots, got {}",
            words.len()
        )));
    }
    Ok(())
}

impl CompactedPrices {
    /// Decode into one [`PricePoint`] per token.
    ///
    /// Fails with [`PerpError::MalformedProof`] if any array has the wrong
    /// word count for the token count, a price index falls outside
    /// `[0, token_count)`, a token ordinal appears twice in an index array,
    /// a decoded price is zero, or a decimal scale exceeds
    /// [`constants::MAX_ORACLE_DECIMALS`].
    ///
    /// Pure function: same input always yields the same points, and the
    /// recovered token → price mapping is independent of the packing
    /// arrangement the encoder chose.
    #[allow(clippy::too_many_lines)]
    pub fn decode(&self) -> Result<Vec<PricePoint>> {
        let n = self.tokens.len();
        if n == 0 {
            return Err(malformed("empty token set"));
        }
        if n > constants::COMPACTED_PRICE_INDEXES_PER_WORD * u8::MAX as usize {
            return Err(malformed(format!("token count {n} exceeds index range")));
        }

        check_word_count(
            &self.compacted_min_block_numbers,
            n,
            constants::COMPACTED_BLOCK_NUMBERS_PER_WORD,
            "compacted_min_block_numbers",
        )?;
        check_word_count(
            &self.compacted_max_block_numbers,
            n,
            constants::COMPACTED_BLOCK_NUMBERS_PER_WORD,
            "compacted_max_block_numbers",
        )?;
        check_word_count(
            &self.compacted_timestamps,
            n,
            constants::COMPACTED_TIMESTAMPS_PER_WORD,
            "compacted_timestamps",
        )?;
        check_word_count(
            &self.compacted_decimals,
            n,
            constants::COMPACTED_DECIMALS_PER_WORD,
            "compacted_decimals",
        )?;
        check_word_count(
            &self.compacted_min_prices,
            n,
            constants::COMPACTED_PRICES_PER_WORD,
            "compacted_min_prices",
        )?;
        check_word_count(
            &self.compacted_min_price_indexes,
            n,
            constants::COMPACTED_PRICE_INDEXES_PER_WORD,
            "compacted_min_price_indexes",
        )?;
        check_word_count(
            &self.compacted_max_prices,
            n,
            constants::COMPACTED_PRICES_PER_WORD,
            "compacted_max_prices",
        )?;
        check_word_count(
            &self.compacted_max_price_indexes,
            n,
            constants::COMPACTED_PRICE_INDEXES_PER_WORD,
            "compacted_max_price_indexes",
        )?;

        // Non-indexed fields: slot i belongs to token i.
        let mut points = Vec::with_capacity(n);
        for (i, token) in self.tokens.iter().enumerate() {
            let min_block = unpack(
                &self.compacted_min_block_numbers,
                i,
                constants::COMPACTED_BLOCK_NUMBER_BITS,
                "compacted_min_block_numbers",
            )?
            .low_u64();
            let max_block = unpack(
                &self.compacted_max_block_numbers,
                i,
                constants::COMPACTED_BLOCK_NUMBER_BITS,
                "compacted_max_block_numbers",
            )?
            .low_u64();
            let timestamp = unpack(
                &self.compacted_timestamps,
                i,
                constants::COMPACTED_TIMESTAMP_BITS,
                "compacted_timestamps",
            )?
            .low_u64();
            let decimals = unpack(
                &self.compacted_decimals,
                i,
                constants::COMPACTED_DECIMAL_BITS,
                "compacted_decimals",
            )?
            .low_u64();
            if decimals > u64::from(constants::MAX_ORACLE_DECIMALS) {
                return Err(malformed(format!(
                    "token {token}: decimal scale {decimals} exceeds {}",
                    constants::MAX_ORACLE_DECIMALS
                )));
            }
            #[allow(clippy::cast_possible_truncation)]
            points.push(PricePoint {
                token: *token,
                min_price: U256::zero(),
                max_price: U256::zero(),
                decimals: decimals as u8,
                min_block,
                max_block,
                timestamp,
            });
        }

        // Indexed fields: price slot j belongs to the token ordinal stored
        // in index slot j. Scatter, rejecting ambiguity.
        scatter_prices(
            &self.compacted_min_prices,
            &self.compacted_min_price_indexes,
            "compacted_min_prices",
            &mut points,
            |point, price| point.min_price = price,
        )?;
        scatter_prices(
            &self.compacted_max_prices,
            &self.compacted_max_price_indexes,
            "compacted_max_prices",
            &mut points,
            |point, price| point.max_price = price,
        )?;

        Ok(points)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scatter_prices(
    prices: &[U256],
    indexes: &[U256],
    array: &str,
    points: &mut [PricePoint],
    assign: impl Fn(&mut PricePoint, U256),
) -> Result<()> {
    let n = points.len();
    let mut seen = vec![false; n];
    for slot in 0..n {
        let ordinal = unpack(indexes, slot, constants::COMPACTED_PRICE_INDEX_BITS, array)?
            .low_u64() as usize;
        if ordinal >= n {
            return Err(malformed(format!(
                "{array}: index {ordinal} out of range for {n} tokens"
            )));
        }
        if seen[ordinal] {
            return Err(malformed(format!(
                "{array}: duplicate token ordinal {ordinal}"
            )));
        }
        seen[ordinal] = true;

        let price = unpack(prices, slot, constants::COMPACTED_PRICE_BITS, array)?;
        if price.is_zero() {
            return Err(malformed(format!(
                "{array}: zero price for token {}",
                points[ordinal].token
            )));
        }
        assign(&mut points[ordinal], price);
    }
    Ok(())
}

/// Encode price points in token-ordinal order (slot `i` prices token `i`).
pub fn compact(points: &[PricePoint]) -> Result<CompactedPrices> {
    let identity: Vec<usize> = (0..points.len()).collect();
    compact_with_layout(points, &identity)
}

/// Encode price points with an explicit packing arrangement: price slot `j`
/// carries the prices of token ordinal `slot_order[j]`.
///
/// `slot_order` must be a permutation of `0..points.len()`; the decoder
/// recovers the same mapping whichever permutation is used.
pub fn compact_with_layout(points: &[PricePoint], slot_order: &[usize]) -> Result<CompactedPrices> {
    let n = points.len();
    if n == 0 {
        return Err(malformed("cannot encode an empty point set"));
    }
    if slot_order.len() != n {
        return Err(malformed(format!(
            "slot order has {} entries for {n} points",
            slot_order.len()
        )));
    }
    let mut seen = vec![false; n];
    for &ordinal in slot_order {
        if ordinal >= n || seen[ordinal] {
            return Err(malformed("slot order is not a permutation"));
        }
        seen[ordinal] = true;
    }

    let price_mask = (U256::one() << constants::COMPACTED_PRICE_BITS) - U256::one();
    let mut out = CompactedPrices {
        tokens: points.iter().map(|p| p.token).collect(),
        compacted_min_block_numbers: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_BLOCK_NUMBERS_PER_WORD)
        ],
        compacted_max_block_numbers: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_BLOCK_NUMBERS_PER_WORD)
        ],
        compacted_timestamps: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_TIMESTAMPS_PER_WORD)
        ],
        compacted_decimals: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_DECIMALS_PER_WORD)
        ],
        compacted_min_prices: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_PRICES_PER_WORD)
        ],
        compacted_min_price_indexes: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_PRICE_INDEXES_PER_WORD)
        ],
        compacted_max_prices: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_PRICES_PER_WORD)
        ],
        compacted_max_price_indexes: vec![
            U256::zero();
            word_count(n, constants::COMPACTED_PRICE_INDEXES_PER_WORD)
        ],
    };

    for (i, point) in points.iter().enumerate() {
        if point.decimals > constants::MAX_ORACLE_DECIMALS {
            return Err(malformed(format!(
                "token {}: decimal scale {} exceeds {}",
                point.token,
                point.decimals,
                constants::MAX_ORACLE_DECIMALS
            )));
        }
        pack(
            &mut out.compacted_min_block_numbers,
            i,
            constants::COMPACTED_BLOCK_NUMBER_BITS,
            U256::from(point.min_block),
        );
        pack(
            &mut out.compacted_max_block_numbers,
            i,
            constants::COMPACTED_BLOCK_NUMBER_BITS,
            U256::from(point.max_block),
        );
        pack(
            &mut out.compacted_timestamps,
            i,
            constants::COMPACTED_TIMESTAMP_BITS,
            U256::from(point.timestamp),
        );
        pack(
            &mut out.compacted_decimals,
            i,
            constants::COMPACTED_DECIMAL_BITS,
            U256::from(point.decimals),
        );
    }

    for (slot, &ordinal) in slot_order.iter().enumerate() {
        let point = &points[ordinal];
        for (prices, value) in [
            (&mut out.compacted_min_prices, point.min_price),
            (&mut out.compacted_max_prices, point.max_price),
        ] {
            if value.is_zero() {
                return Err(malformed(format!("token {}: zero price", point.token)));
            }
            if value > price_mask {
                return Err(malformed(format!(
                    "token {}: price {value} overflows {} bits",
                    point.token,
                    constants::COMPACTED_PRICE_BITS
                )));
            }
            pack(prices, slot, constants::COMPACTED_PRICE_BITS, value);
        }
        for indexes in [
            &mut out.compacted_min_price_indexes,
            &mut out.compacted_max_price_indexes,
        ] {
            pack(
                indexes,
                slot,
                constants::COMPACTED_PRICE_INDEX_BITS,
                U256::from(ordinal),
            );
        }
    }

    Ok(out)
}
