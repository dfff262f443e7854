//! The pending-request store.
//!
//! Holds every live Order/Deposit/Withdrawal keyed by its derived
//! [`RequestKey`] and enforces the lifecycle state machine on each
//! transition. Key derivation uses an account-scoped incrementing nonce, so
//! two requests with identical content from the same account still get
//! distinct keys; a colliding key is an integrity violation, never silently
//! overwritten.

use std::collections::HashMap;

use openperp_types::{
    Address, PerpError, Request, RequestKey, RequestState, Result, derive_request_key,
};

/// Keyed storage for pending requests plus the per-account nonce counters.
#[derive(Debug, Clone, Default)]
pub struct RequestStore {
    requests: HashMap<RequestKey, Request>,
    nonces: HashMap<Address, u64>,
}

impl RequestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new request in `Pending` state and return its derived key.
    ///
    /// # Errors
    /// [`PerpError::DuplicateRequestKey`] if the derived key is already
    /// occupied. The nonce scheme makes this unreachable; observing it
    /// means request content hashing is broken upstream.
    pub fn create(&mut self, mut request: Request) -> Result<RequestKey> {
        let nonce = self.nonces.entry(request.account).or_insert(0);
        *nonce += 1;
        request.state = RequestState::Pending;
        let key = derive_request_key(request.account, *nonce, &request.canonical_bytes());

        if self.requests.contains_key(&key) {
            return Err(PerpError::DuplicateRequestKey(key));
        }

        tracing::debug!(key = %key, category = %request.category(), "request created");
        self.requests.insert(key, request);
        Ok(key)
    }

    /// Look up a request, live or terminal-but-not-yet-removed.
    pub fn get(&self, key: RequestKey) -> Result<&Request> {
        self.requests
            .get(&key)
            .ok_or(PerpError::RequestNotFound(key))
    }

    /// Look up a request that can still make progress. Terminal records
    /// report [`PerpError::RequestNotFound`], so a consumed key behaves
    /// exactly like a removed one.
    pub fn get_live(&self, key: RequestKey) -> Result<&Request> {
        match self.requests.get(&key) {
            Some(request) if !request.state.is_terminal() => Ok(request),
            _ => Err(PerpError::RequestNotFound(key)),
        }
    }

    /// Apply a lifecycle transition.
    ///
    /// # Errors
    /// - [`PerpError::RequestNotFound`] if the key is absent
    /// - [`PerpError::InvalidTransition`] if the edge is illegal — this is
    ///   an integrity error and must never be swallowed by callers
    pub fn transition(&mut self, key: RequestKey, new_state: RequestState) -> Result<()> {
        let request = self
            .requests
            .get_mut(&key)
            .ok_or(PerpError::RequestNotFound(key))?;
        if !request.state.can_transition_to(new_state) {
            return Err(PerpError::InvalidTransition {
                key,
                from: request.state,
                to: new_state,
            });
        }
        tracing::debug!(key = %key, from = %request.state, to = %new_state, "request transition");
        request.state = new_state;
        Ok(())
    }

    /// Remove a request record, reclaiming storage.
    ///
    /// # Errors
    /// - [`PerpError::RequestNotFound`] if the key is absent
    /// - [`PerpError::RequestNotTerminal`] unless the request is
    ///   `Executed` or `Cancelled`
    pub fn remove(&mut self, key: RequestKey) -> Result<Request> {
        let state = self.get(key)?.state;
        if !state.is_terminal() {
            return Err(PerpError::RequestNotTerminal { key, state });
        }
        Ok(self
            .requests
            .remove(&key)
            .expect("checked present just above"))
    }

    /// The nonce most recently consumed for `account`.
    #[must_use]
    pub fn nonce(&self, account: Address) -> u64 {
        self.nonces.get(&account).copied().unwrap_or(0)
    }

    /// Number of stored requests, live or terminal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of requests a keeper could still act on.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.requests
            .values()
            .filter(|r| !r.state.is_terminal())
            .count()
    }
}
