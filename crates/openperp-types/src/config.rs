//! Configuration for the oracle validator and settlement engine.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Attestation validation parameters.
///
/// `max_price_age_secs` may be overridden per deployment through the data
/// store (`max_oracle_price_age_key`); this struct carries the fallback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Distinct valid signers required per token.
    pub signer_threshold: usize,
    /// Maximum accepted attestation age, seconds.
    pub max_price_age_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            signer_threshold: constants::DEFAULT_SIGNER_THRESHOLD,
            max_price_age_secs: constants::DEFAULT_MAX_ORACLE_PRICE_AGE_SECS,
        }
    }
}

/// Settlement engine parameters, used where the data store holds no
/// deployment-specific override.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum swap-path hops accepted at request creation.
    pub max_swap_path_length: usize,
    /// Blocks after which anyone may cancel a pending request.
    pub request_cancellation_delay_blocks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_swap_path_length: constants::DEFAULT_MAX_SWAP_PATH_LENGTH,
            request_cancellation_delay_blocks:
                constants::DEFAULT_REQUEST_CANCELLATION_DELAY_BLOCKS,
        }
    }
}

/// The chain position a call executes at. Passed in by the caller so the
/// core stays deterministic; nothing here reads a wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Current block number.
    pub number: u64,
    /// Current unix timestamp, seconds.
    pub timestamp: u64,
}

impl BlockContext {
    #[must_use]
    pub fn new(number: u64, timestamp: u64) -> Self {
        Self { number, timestamp }
    }

    /// The context `blocks` later, with time advanced at `secs_per_block`.
    #[must_use]
    pub fn advanced(&self, blocks: u64, secs_per_block: u64) -> Self {
        Self {
            number: self.number + blocks,
            timestamp: self.timestamp + blocks * secs_per_block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_constants() {
        let oracle = OracleConfig::default();
        assert_eq!(oracle.signer_threshold, constants::DEFAULT_SIGNER_THRESHOLD);
        assert_eq!(
            oracle.max_price_age_secs,
            constants::DEFAULT_MAX_ORACLE_PRICE_AGE_SECS
        );

        let engine = EngineConfig::default();
        assert_eq!(
            engine.max_swap_path_length,
            constants::DEFAULT_MAX_SWAP_PATH_LENGTH
        );
    }

    #[test]
    fn block_context_advances() {
        let ctx = BlockContext::new(100, 1_000);
        let later = ctx.advanced(10, 2);
        assert_eq!(later.number, 110);
        assert_eq!(later.timestamp, 1_020);
    }
}
