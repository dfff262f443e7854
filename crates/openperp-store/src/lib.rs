//! # openperp-store
//!
//! **Storage plane**: the three keyed stores the settlement engine runs on.
//!
//! 1. **RoleStore**: (account, role) → granted; the authoritative answer to
//!    "may this caller execute settlement". Consumed through the
//!    [`RoleAuthorizer`] trait so tests can substitute a mock.
//! 2. **DataStore**: generic keyed store for protocol parameters, addressed
//!    by hashed parameter keys (max price age, swap-path cap, pool caps).
//! 3. **RequestStore**: pending Order/Deposit/Withdrawal records keyed by
//!    their derived [`RequestKey`](openperp_types::RequestKey), with the
//!    lifecycle state machine enforced on every transition.
//!
//! No store blocks or performs I/O; each call is a plain map operation so
//! the engine's read-modify-write critical section stays trivially
//! sequential.

pub mod data_store;
pub mod request_store;
pub mod role_store;

pub use data_store::DataStore;
pub use request_store::RequestStore;
pub use role_store::{RoleAuthorizer, RoleStore};

#[cfg(any(test, feature = "test-helpers"))]
pub use role_store::PermissiveAuthorizer;
