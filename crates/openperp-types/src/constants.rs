//! System-wide constants for the OpenPerp settlement core.

// ---------------------------------------------------------------------------
// Compacted price-proof bit layout (one 256-bit word per array entry)
// ---------------------------------------------------------------------------

/// Bits per compacted price slot.
pub const COMPACTED_PRICE_BITS: usize = 32;

/// Price slots per 256-bit word.
pub const COMPACTED_PRICES_PER_WORD: usize = 256 / COMPACTED_PRICE_BITS;

/// Bits per compacted price-index slot.
pub const COMPACTED_PRICE_INDEX_BITS: usize = 8;

/// Price-index slots per 256-bit word.
pub const COMPACTED_PRICE_INDEXES_PER_WORD: usize = 256 / COMPACTED_PRICE_INDEX_BITS;

/// Bits per compacted decimal-scale slot.
pub const COMPACTED_DECIMAL_BITS: usize = 8;

/// Decimal-scale slots per 256-bit word.
pub const COMPACTED_DECIMALS_PER_WORD: usize = 256 / COMPACTED_DECIMAL_BITS;

/// Bits per compacted block-number slot.
pub const COMPACTED_BLOCK_NUMBER_BITS: usize = 64;

/// Block-number slots per 256-bit word.
pub const COMPACTED_BLOCK_NUMBERS_PER_WORD: usize = 256 / COMPACTED_BLOCK_NUMBER_BITS;

/// Bits per compacted timestamp slot.
pub const COMPACTED_TIMESTAMP_BITS: usize = 64;

/// Timestamp slots per 256-bit word.
pub const COMPACTED_TIMESTAMPS_PER_WORD: usize = 256 / COMPACTED_TIMESTAMP_BITS;

/// Largest decimal scale a price point may carry (10^30 keeps any
/// 32-bit compacted price well inside 256 bits).
pub const MAX_ORACLE_DECIMALS: u8 = 30;

// ---------------------------------------------------------------------------
// Protocol defaults (overridable via the data store)
// ---------------------------------------------------------------------------

/// Default number of distinct valid signers an attestation needs.
pub const DEFAULT_SIGNER_THRESHOLD: usize = 1;

/// Default maximum age of a price attestation, seconds.
pub const DEFAULT_MAX_ORACLE_PRICE_AGE_SECS: u64 = 3_600;

/// Default maximum swap-path length, hops.
pub const DEFAULT_MAX_SWAP_PATH_LENGTH: usize = 5;

/// Default blocks before third-party cancellation of a pending request.
pub const DEFAULT_REQUEST_CANCELLATION_DELAY_BLOCKS: u64 = 300;

/// Maximum signers an attestation batch may carry per token.
pub const MAX_ORACLE_SIGNERS: usize = 16;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "OpenPerp";
