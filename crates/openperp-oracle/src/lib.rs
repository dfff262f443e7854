//! # openperp-oracle
//!
//! **Price attestation plane**: the compacted price-proof codec and the
//! multi-signer attestation validator.
//!
//! Every settlement call carries a [`PriceProof`]: a batch of per-token
//! price bounds packed into 256-bit words, plus the oracle signatures over
//! each token's attestation payload. This crate:
//!
//! 1. Decodes the compacted wire form into per-token
//!    [`PricePoint`](openperp_types::PricePoint)s ([`codec`]) — a pure
//!    function with exhaustive bounds checks
//! 2. Validates recency, block range, signer threshold, and price-bound
//!    ordering ([`attestation`]) — atomically over the whole batch
//!
//! Nothing in this crate holds signing keys or mutates state; both steps
//! are deterministic given the caller-supplied block context.

pub mod attestation;
pub mod codec;

pub use attestation::{
    AttestationContext, OracleSignature, OracleSignerSet, PriceAttestationValidator,
};
pub use codec::{CompactedPrices, PriceProof, compact, compact_with_layout};
