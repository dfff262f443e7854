//! Error types for the OpenPerp settlement core.
//!
//! All errors use the `OP_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Request / request-store errors
//! - 2xx: Price-proof codec errors
//! - 3xx: Attestation validation errors
//! - 4xx: Authorization errors
//! - 5xx: Settlement errors
//! - 9xx: General / internal errors
//!
//! Every failure is an explicit result value; a caller can always tell
//! "proof rejected, resubmit" apart from "request terminated, funds
//! returned".

use primitive_types::U256;
use thiserror::Error;

use crate::{Address, RequestKey, RequestState, Role};

/// Central error enum for all OpenPerp operations.
#[derive(Debug, Error)]
pub enum PerpError {
    // =================================================================
    // Request Errors (1xx)
    // =================================================================
    /// The key does not denote a live (non-terminal) request.
    #[error("OP_ERR_100: Request not found: {0}")]
    RequestNotFound(RequestKey),

    /// A live request already exists under the derived key. Given the
    /// nonce scheme this is an integrity violation, not a user error.
    #[error("OP_ERR_101: Duplicate request key: {0}")]
    DuplicateRequestKey(RequestKey),

    /// The requested lifecycle transition is not a legal edge.
    #[error("OP_ERR_102: Invalid transition for {key}: {from} -> {to}")]
    InvalidTransition {
        key: RequestKey,
        from: RequestState,
        to: RequestState,
    },

    /// Removal attempted while the request is still live.
    #[error("OP_ERR_103: Request {key} is {state}, not terminal")]
    RequestNotTerminal {
        key: RequestKey,
        state: RequestState,
    },

    /// The request failed creation-time validation.
    #[error("OP_ERR_104: Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The swap path exceeds the configured maximum length.
    #[error("OP_ERR_105: Swap path too long: {len} hops, max {max}")]
    SwapPathTooLong { len: usize, max: usize },

    // =================================================================
    // Price-Proof Codec Errors (2xx)
    // =================================================================
    /// The compacted proof failed structural decoding.
    #[error("OP_ERR_200: Malformed price proof: {reason}")]
    MalformedProof { reason: String },

    // =================================================================
    // Attestation Validation Errors (3xx)
    // =================================================================
    /// The execution block falls outside the attested block range.
    #[error(
        "OP_ERR_300: Stale price range for {token}: attested [{min_block}, {max_block}], current block {current_block}"
    )]
    StalePriceRange {
        token: Address,
        min_block: u64,
        max_block: u64,
        current_block: u64,
    },

    /// The attestation is older than the configured maximum age.
    #[error("OP_ERR_301: Price for {token} too old: age {age}s, max {max_age}s")]
    PriceTooOld { token: Address, age: u64, max_age: u64 },

    /// Fewer distinct valid signers than the required threshold.
    #[error("OP_ERR_302: Insufficient signers for {token}: {valid} valid, {required} required")]
    InsufficientSigners {
        token: Address,
        valid: usize,
        required: usize,
    },

    /// The attested minimum price exceeds the attested maximum.
    #[error("OP_ERR_303: Inverted price bounds for {token}: min {min} > max {max}")]
    InvertedPriceBounds {
        token: Address,
        min: U256,
        max: U256,
    },

    /// Settlement needed a price the proof does not cover.
    #[error("OP_ERR_304: No attested price for {token}")]
    PriceNotAttested { token: Address },

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// The caller does not hold the required role.
    #[error("OP_ERR_400: Unauthorized: {account} lacks role {role}")]
    Unauthorized { account: Address, role: Role },

    /// Cancellation by a third party before the delay elapsed.
    #[error("OP_ERR_401: Cancellation of {key} not allowed until block {unlock_block}")]
    CancellationTooEarly { key: RequestKey, unlock_block: u64 },

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// The escrow vault could not return or pay out funds.
    #[error("OP_ERR_500: Vault transfer failed: {reason}")]
    VaultTransferFailed { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OP_ERR_900: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PerpError>;

impl PerpError {
    /// Attestation failures reject the call but leave the request
    /// `Pending`; a keeper may resubmit with a corrected proof.
    #[must_use]
    pub fn is_retryable_proof_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedProof { .. }
                | Self::StalePriceRange { .. }
                | Self::PriceTooOld { .. }
                | Self::InsufficientSigners { .. }
                | Self::InvertedPriceBounds { .. }
                | Self::PriceNotAttested { .. }
        )
    }
}
