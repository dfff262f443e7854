//! Role-based capability storage.
//!
//! The settlement engine never consults a global table; it holds a
//! [`RoleAuthorizer`] and asks it. [`RoleStore`] is the production
//! implementation; tests may inject anything that answers `has_role`.

use std::collections::HashSet;

use openperp_types::{Address, Role};

/// The capability-check seam injected into the settlement engine.
pub trait RoleAuthorizer {
    /// Does `account` currently hold `role`?
    fn has_role(&self, account: Address, role: Role) -> bool;
}

/// Mapping (account, role) → granted.
#[derive(Debug, Clone, Default)]
pub struct RoleStore {
    grants: HashSet<(Address, Role)>,
}

impl RoleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `role` to `account`. Idempotent.
    pub fn grant_role(&mut self, account: Address, role: Role) {
        if self.grants.insert((account, role)) {
            tracing::debug!(account = %account, role = %role, "role granted");
        }
    }

    /// Revoke `role` from `account`. Revoking an absent grant is a no-op.
    pub fn revoke_role(&mut self, account: Address, role: Role) {
        if self.grants.remove(&(account, role)) {
            tracing::debug!(account = %account, role = %role, "role revoked");
        }
    }

    /// Number of grants currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl RoleAuthorizer for RoleStore {
    fn has_role(&self, account: Address, role: Role) -> bool {
        self.grants.contains(&(account, role))
    }
}

/// Grants every role to every account. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveAuthorizer;

#[cfg(any(test, feature = "test-helpers"))]
impl RoleAuthorizer for PermissiveAuthorizer {
    fn has_role(&self, _account: Address, _role: Role) -> bool {
        true
    }
}
