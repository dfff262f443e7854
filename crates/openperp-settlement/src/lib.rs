//! # openperp-settlement
//!
//! **Finality plane**: the settlement engine that consumes a price proof to
//! finalize or reject a pending request.
//!
//! ## Architecture
//!
//! [`SettlementEngine`] orchestrates one `execute` call end to end:
//! 1. Authorizes the caller's keeper capability ([`RoleAuthorizer`] seam)
//! 2. Looks the request up by key (terminal keys behave as not-found)
//! 3. Decodes the compacted [`PriceProof`](openperp_oracle::PriceProof)
//! 4. Validates signatures, recency, and bounds for every token the
//!    request references — atomically, nothing applied on failure
//! 5. Dispatches to the variant's [`SettlementStrategy`]
//! 6. Transitions the request, moves escrow through the [`TokenVault`]
//!    boundary, and emits the outcome event
//!
//! All effects of a call happen inside that single critical section; the
//! engine never retries internally. Frozen requests wait for an external
//! keeper to re-price them via the frozen-order path.

pub mod engine;
pub mod events;
pub mod params;
pub mod strategy;
pub mod vault;

pub use engine::{SettlementEngine, SettlementReport};
pub use events::{Event, EventSink, RecordingSink, TracingSink};
pub use params::{CreateDepositParams, CreateOrderParams, CreateWithdrawalParams};
pub use strategy::{PriceBoundSettler, SettlementOutcome, SettlementStrategy};
pub use vault::{LedgerVault, TokenVault};

// Re-exported so engine callers don't need a direct openperp-store dep
// just to name the authorizer seam.
pub use openperp_store::RoleAuthorizer;
