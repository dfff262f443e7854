//! The escrow vault boundary.
//!
//! Token transfer mechanics live outside this core; the engine only needs
//! three effects: lock funds against a request at creation, refund them all
//! to a receiver on cancellation, or consume them on execution. The
//! [`LedgerVault`] gives tests (and single-process deployments) a concrete
//! ledger with exactly-once refund semantics.

use std::collections::HashMap;

use primitive_types::U256;

use openperp_types::{Address, PerpError, RequestKey, Result};

/// What the settlement engine requires of the escrow holder.
pub trait TokenVault {
    /// Record `amount` of `token` held in escrow for `key`.
    fn lock(&mut self, key: RequestKey, token: Address, amount: U256) -> Result<()>;

    /// Return everything held for `key` to `receiver`. Idempotent only in
    /// the sense that a second call finds nothing to refund and fails.
    fn refund(&mut self, key: RequestKey, receiver: Address) -> Result<()>;

    /// Consume the escrow for `key`: funds moved into the pool, nothing
    /// returns to the requester.
    fn consume(&mut self, key: RequestKey) -> Result<()>;
}

/// In-memory escrow ledger.
#[derive(Debug, Clone, Default)]
pub struct LedgerVault {
    /// Escrow held per request.
    escrow: HashMap<RequestKey, Vec<(Address, U256)>>,
    /// Credited balances per (receiver, token), from refunds.
    balances: HashMap<(Address, Address), U256>,
}

impl LedgerVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance credited to `receiver` in `token` by refunds so far.
    #[must_use]
    pub fn balance(&self, receiver: Address, token: Address) -> U256 {
        self.balances
            .get(&(receiver, token))
            .copied()
            .unwrap_or_default()
    }

    /// Total amount of `token` currently escrowed across all requests.
    #[must_use]
    pub fn escrowed_total(&self, token: Address) -> U256 {
        self.escrow
            .values()
            .flatten()
            .filter(|(t, _)| *t == token)
            .fold(U256::zero(), |acc, (_, amount)| acc + *amount)
    }

    /// Whether any escrow is held for `key`.
    #[must_use]
    pub fn holds(&self, key: RequestKey) -> bool {
        self.escrow.contains_key(&key)
    }
}

impl TokenVault for LedgerVault {
    fn lock(&mut self, key: RequestKey, token: Address, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.escrow.entry(key).or_default().push((token, amount));
        Ok(())
    }

    fn refund(&mut self, key: RequestKey, receiver: Address) -> Result<()> {
        let held = self
            .escrow
            .remove(&key)
            .ok_or_else(|| PerpError::VaultTransferFailed {
                reason: format!("no escrow held for {key}"),
            })?;
        for (token, amount) in held {
            let balance = self.balances.entry((receiver, token)).or_default();
            *balance = *balance + amount;
        }
        Ok(())
    }

    fn consume(&mut self, key: RequestKey) -> Result<()> {
        self.escrow
            .remove(&key)
            .ok_or_else(|| PerpError::VaultTransferFailed {
                reason: format!("no escrow held for {key}"),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> RequestKey {
        RequestKey([seed; 32])
    }

    #[test]
    fn lock_then_refund_credits_receiver() {
        let mut vault = LedgerVault::new();
        let token = Address([1u8; 32]);
        let receiver = Address([2u8; 32]);

        vault.lock(key(1), token, U256::from(100u64)).unwrap();
        assert_eq!(vault.escrowed_total(token), U256::from(100u64));

        vault.refund(key(1), receiver).unwrap();
        assert_eq!(vault.balance(receiver, token), U256::from(100u64));
        assert_eq!(vault.escrowed_total(token), U256::zero());
    }

    #[test]
    fn refund_is_exactly_once() {
        let mut vault = LedgerVault::new();
        let token = Address([1u8; 32]);
        let receiver = Address([2u8; 32]);

        vault.lock(key(1), token, U256::from(100u64)).unwrap();
        vault.refund(key(1), receiver).unwrap();

        let err = vault.refund(key(1), receiver).unwrap_err();
        assert!(matches!(err, PerpError::VaultTransferFailed { .. }));
        assert_eq!(vault.balance(receiver, token), U256::from(100u64));
    }

    #[test]
    fn consume_drops_escrow_without_credit() {
        let mut vault = LedgerVault::new();
        let token = Address([1u8; 32]);

        vault.lock(key(1), token, U256::from(50u64)).unwrap();
        vault.consume(key(1)).unwrap();

        assert_eq!(vault.escrowed_total(token), U256::zero());
        assert!(!vault.holds(key(1)));
        assert!(vault.consume(key(1)).is_err());
    }

    #[test]
    fn multiple_tokens_per_request() {
        let mut vault = LedgerVault::new();
        let long = Address([1u8; 32]);
        let short = Address([2u8; 32]);
        let receiver = Address([3u8; 32]);

        vault.lock(key(1), long, U256::from(10u64)).unwrap();
        vault.lock(key(1), short, U256::from(20u64)).unwrap();
        vault.refund(key(1), receiver).unwrap();

        assert_eq!(vault.balance(receiver, long), U256::from(10u64));
        assert_eq!(vault.balance(receiver, short), U256::from(20u64));
    }

    #[test]
    fn zero_lock_is_noop() {
        let mut vault = LedgerVault::new();
        vault.lock(key(1), Address([1u8; 32]), U256::zero()).unwrap();
        assert!(!vault.holds(key(1)));
    }
}
