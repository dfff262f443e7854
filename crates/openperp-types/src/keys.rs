//! Deterministic key derivation.
//!
//! Two families of keys are derived here, both SHA-256 over a
//! domain-prefixed canonical byte string:
//!
//! - [`derive_request_key`]: the unique identifier of a pending request,
//!   from its immutable content plus an account-scoped nonce. Same input
//!   always reproduces the same key; any single-bit change yields a
//!   different key with overwhelming probability.
//! - Parameter keys for the generic data store: a named protocol parameter
//!   plus optional scoping arguments, e.g. the max pool amount for a
//!   specific `(market, token)` pair.

use sha2::{Digest, Sha256};

use crate::{Address, ParamKey, RequestKey};

/// Domain prefix for request keys. Versioned so a future layout change
/// cannot collide with keys derived under the current one.
const REQUEST_KEY_DOMAIN: &[u8] = b"openperp:request_key:v1:";

/// Domain prefix for data-store parameter keys.
const PARAM_KEY_DOMAIN: &[u8] = b"openperp:param:v1:";

/// Derive the unique key for a request.
///
/// `content` is the canonical serialization of the request's immutable
/// fields (see `Request::canonical_bytes`); `nonce` is the account-scoped
/// counter maintained by the request store. Pure function, no side effects.
#[must_use]
pub fn derive_request_key(account: Address, nonce: u64, content: &[u8]) -> RequestKey {
    let mut hasher = Sha256::new();
    hasher.update(REQUEST_KEY_DOMAIN);
    hasher.update(account.as_bytes());
    hasher.update(nonce.to_le_bytes());
    hasher.update(content);
    RequestKey(hasher.finalize().into())
}

fn param_key(name: &str, args: &[&[u8]]) -> ParamKey {
    let mut hasher = Sha256::new();
    hasher.update(PARAM_KEY_DOMAIN);
    hasher.update(name.as_bytes());
    for arg in args {
        hasher.update(arg);
    }
    ParamKey(hasher.finalize().into())
}

// ---------------------------------------------------------------------------
// Unscoped protocol parameters
// ---------------------------------------------------------------------------

/// Maximum accepted age of a price attestation, in seconds.
#[must_use]
pub fn max_oracle_price_age_key() -> ParamKey {
    param_key("MAX_ORACLE_PRICE_AGE", &[])
}

/// Maximum number of hops in an order's swap path.
#[must_use]
pub fn max_swap_path_length_key() -> ParamKey {
    param_key("MAX_SWAP_PATH_LENGTH", &[])
}

/// Blocks after which anyone (not just the requester) may cancel a
/// pending request.
#[must_use]
pub fn request_cancellation_delay_key() -> ParamKey {
    param_key("REQUEST_CANCELLATION_DELAY", &[])
}

/// The token execution fees are denominated in.
#[must_use]
pub fn fee_token_key() -> ParamKey {
    param_key("FEE_TOKEN", &[])
}

// ---------------------------------------------------------------------------
// Market-scoped parameters
// ---------------------------------------------------------------------------

/// Current pool amount of `token` held by `market`.
#[must_use]
pub fn pool_amount_key(market: Address, token: Address) -> ParamKey {
    param_key("POOL_AMOUNT", &[market.as_bytes(), token.as_bytes()])
}

/// Cap on the pool amount of `token` in `market`.
#[must_use]
pub fn max_pool_amount_key(market: Address, token: Address) -> ParamKey {
    param_key("MAX_POOL_AMOUNT", &[market.as_bytes(), token.as_bytes()])
}

/// Current open interest in `market` for one side, in units of `token`.
#[must_use]
pub fn open_interest_key(market: Address, token: Address, is_long: bool) -> ParamKey {
    param_key(
        "OPEN_INTEREST",
        &[market.as_bytes(), token.as_bytes(), &[u8::from(is_long)]],
    )
}

/// Cap on open interest in `market` for one side.
#[must_use]
pub fn max_open_interest_key(market: Address, is_long: bool) -> ParamKey {
    param_key("MAX_OPEN_INTEREST", &[market.as_bytes(), &[u8::from(is_long)]])
}

/// Which settlement flow a max-PnL factor applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PnlFactorKind {
    Traders,
    Deposits,
    Withdrawals,
}

impl PnlFactorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traders => "MAX_PNL_FACTOR_FOR_TRADERS",
            Self::Deposits => "MAX_PNL_FACTOR_FOR_DEPOSITS",
            Self::Withdrawals => "MAX_PNL_FACTOR_FOR_WITHDRAWALS",
        }
    }
}

/// Cap on the pool PnL factor for a settlement flow on one side of `market`.
#[must_use]
pub fn max_pnl_factor_key(kind: PnlFactorKind, market: Address, is_long: bool) -> ParamKey {
    param_key(kind.as_str(), &[market.as_bytes(), &[u8::from(is_long)]])
}

/// Fraction of the pool reservable by open positions on one side.
#[must_use]
pub fn reserve_factor_key(market: Address, is_long: bool) -> ParamKey {
    param_key("RESERVE_FACTOR", &[market.as_bytes(), &[u8::from(is_long)]])
}

/// Reserve factor applied to open interest specifically.
#[must_use]
pub fn open_interest_reserve_factor_key(market: Address, is_long: bool) -> ParamKey {
    param_key(
        "OPEN_INTEREST_RESERVE_FACTOR",
        &[market.as_bytes(), &[u8::from(is_long)]],
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_key_deterministic() {
        let account = Address([3u8; 32]);
        let a = derive_request_key(account, 7, b"content");
        let b = derive_request_key(account, 7, b"content");
        assert_eq!(a, b);
    }

    #[test]
    fn request_key_differs_by_nonce() {
        let account = Address([3u8; 32]);
        let a = derive_request_key(account, 7, b"content");
        let b = derive_request_key(account, 8, b"content");
        assert_ne!(a, b);
    }

    #[test]
    fn request_key_differs_by_content() {
        let account = Address([3u8; 32]);
        let a = derive_request_key(account, 7, b"content");
        let b = derive_request_key(account, 7, b"contenu");
        assert_ne!(a, b);
    }

    #[test]
    fn request_key_differs_by_account() {
        let a = derive_request_key(Address([3u8; 32]), 7, b"content");
        let b = derive_request_key(Address([4u8; 32]), 7, b"content");
        assert_ne!(a, b);
    }

    #[test]
    fn param_keys_scope_by_arguments() {
        let market = Address([1u8; 32]);
        let eth = Address([2u8; 32]);
        let usdc = Address([3u8; 32]);

        assert_ne!(
            max_pool_amount_key(market, eth),
            max_pool_amount_key(market, usdc)
        );
        assert_ne!(
            max_open_interest_key(market, true),
            max_open_interest_key(market, false)
        );
        assert_eq!(
            max_pool_amount_key(market, eth),
            max_pool_amount_key(market, eth)
        );
    }

    #[test]
    fn param_keys_scope_by_name() {
        let market = Address([1u8; 32]);
        let token = Address([2u8; 32]);
        assert_ne!(
            pool_amount_key(market, token),
            max_pool_amount_key(market, token)
        );
        assert_ne!(
            reserve_factor_key(market, true),
            open_interest_reserve_factor_key(market, true)
        );
    }

    #[test]
    fn pnl_factor_kinds_distinct() {
        let market = Address([1u8; 32]);
        assert_ne!(
            max_pnl_factor_key(PnlFactorKind::Traders, market, true),
            max_pnl_factor_key(PnlFactorKind::Deposits, market, true)
        );
    }
}
