//! # openperp-types
//!
//! Shared types, errors, and configuration for the **OpenPerp** settlement core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`RequestKey`], [`ParamKey`]
//! - **Request model**: [`Request`], [`RequestPayload`], [`OrderKind`], [`RequestState`]
//! - **Price model**: [`PricePoint`], [`PriceBounds`], [`ValidatedPrices`]
//! - **Key derivation**: [`derive_request_key`] and the data-store parameter keys
//! - **Roles**: [`Role`] — the closed set of capability names
//! - **Configuration**: [`OracleConfig`], [`EngineConfig`], [`BlockContext`]
//! - **Errors**: [`PerpError`] with `OP_ERR_` prefix codes
//! - **Constants**: compacted bit-layout widths and system defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod keys;
pub mod price;
pub mod request;
pub mod role;

// Re-export all primary types at crate root for ergonomic imports:
//   use openperp_types::{Request, RequestKey, PricePoint, ...};

pub use config::*;
pub use error::*;
pub use ids::*;
pub use keys::*;
pub use price::*;
pub use request::*;
pub use role::*;

// Constants are accessed via `openperp_types::constants::FOO`
// (not re-exported to avoid name collisions).
