//! The closed set of capability names.
//!
//! Role names match the short strings granted by the deployment tooling
//! (`CONTROLLER`, `ORDER_KEEPER`, ...). Authorization checks go through the
//! `RoleAuthorizer` trait in `openperp-store`, never a global table.

use serde::{Deserialize, Serialize};

/// A capability in the role store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May write protocol parameters and perform privileged maintenance.
    Controller,
    /// May create markets.
    MarketKeeper,
    /// May execute pending orders with a price proof.
    OrderKeeper,
    /// May execute pending deposits.
    DepositKeeper,
    /// May execute pending withdrawals.
    WithdrawalKeeper,
    /// May re-price frozen orders.
    FrozenOrderKeeper,
}

impl Role {
    /// The fixed short-string name used by the role store.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Controller => "CONTROLLER",
            Self::MarketKeeper => "MARKET_KEEPER",
            Self::OrderKeeper => "ORDER_KEEPER",
            Self::DepositKeeper => "DEPOSIT_KEEPER",
            Self::WithdrawalKeeper => "WITHDRAWAL_KEEPER",
            Self::FrozenOrderKeeper => "FROZEN_ORDER_KEEPER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
