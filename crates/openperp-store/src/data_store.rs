//! Generic keyed parameter storage.
//!
//! Protocol constants (max oracle price age, swap-path cap, pool and
//! open-interest caps) live here under hashed [`ParamKey`]s produced by
//! `openperp_types::keys`. Writes are gated by the controller role at the
//! engine layer; the store itself is policy-free.

use std::collections::HashMap;

use primitive_types::U256;

use openperp_types::{Address, ParamKey};

/// Two keyspaces, one for integers and one for addresses. A key absent
/// from a keyspace has no value; callers decide their own fallback.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    u256_values: HashMap<ParamKey, U256>,
    address_values: HashMap<ParamKey, Address>,
}

impl DataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_u256(&self, key: ParamKey) -> Option<U256> {
        self.u256_values.get(&key).copied()
    }

    /// The stored value, or `default` if the key was never written.
    #[must_use]
    pub fn u256_or(&self, key: ParamKey, default: U256) -> U256 {
        self.get_u256(key).unwrap_or(default)
    }

    pub fn set_u256(&mut self, key: ParamKey, value: U256) {
        self.u256_values.insert(key, value);
    }

    pub fn remove_u256(&mut self, key: ParamKey) -> Option<U256> {
        self.u256_values.remove(&key)
    }

    #[must_use]
    pub fn get_address(&self, key: ParamKey) -> Option<Address> {
        self.address_values.get(&key).copied()
    }

    pub fn set_address(&mut self, key: ParamKey, value: Address) {
        self.address_values.insert(key, value);
    }

    pub fn remove_address(&mut self, key: ParamKey) -> Option<Address> {
        self.address_values.remove(&key)
    }

    /// Entries across both keyspaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.u256_values.len() + self.address_values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.u256_values.is_empty() && self.address_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openperp_types::keys;

    #[test]
    fn set_then_get_u256() {
        let mut store = DataStore::new();
        let key = keys::max_oracle_price_age_key();
        assert_eq!(store.get_u256(key), None);

        store.set_u256(key, U256::from(600u64));
        assert_eq!(store.get_u256(key), Some(U256::from(600u64)));
    }

    #[test]
    fn u256_or_falls_back() {
        let store = DataStore::new();
        let key = keys::max_swap_path_length_key();
        assert_eq!(store.u256_or(key, U256::from(5u64)), U256::from(5u64));
    }

    #[test]
    fn keyspaces_are_disjoint() {
        let mut store = DataStore::new();
        let key = keys::fee_token_key();
        store.set_address(key, Address([7u8; 32]));
        // Same hashed key, different keyspace: no crosstalk.
        assert_eq!(store.get_u256(key), None);
        assert_eq!(store.get_address(key), Some(Address([7u8; 32])));
    }

    #[test]
    fn scoped_keys_store_independently() {
        let mut store = DataStore::new();
        let market = Address([1u8; 32]);
        let eth = Address([2u8; 32]);
        let usdc = Address([3u8; 32]);

        store.set_u256(keys::max_pool_amount_key(market, eth), U256::from(100u64));
        store.set_u256(keys::max_pool_amount_key(market, usdc), U256::from(200u64));

        assert_eq!(
            store.get_u256(keys::max_pool_amount_key(market, eth)),
            Some(U256::from(100u64))
        );
        assert_eq!(
            store.get_u256(keys::max_pool_amount_key(market, usdc)),
            Some(U256::from(200u64))
        );
    }

    #[test]
    fn overwrite_replaces() {
        let mut store = DataStore::new();
        let key = keys::max_oracle_price_age_key();
        store.set_u256(key, U256::from(1u64));
        store.set_u256(key, U256::from(2u64));
        assert_eq!(store.get_u256(key), Some(U256::from(2u64)));
        assert_eq!(store.remove_u256(key), Some(U256::from(2u64)));
        assert_eq!(store.get_u256(key), None);
    }
}
