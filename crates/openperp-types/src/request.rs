//! The request model: pending user intents awaiting keeper settlement.
//!
//! A [`Request`] is a tagged union of Order / Deposit / Withdrawal, immutable
//! after creation except for its lifecycle [`RequestState`]. All monetary
//! fields are unsigned 256-bit integers so no token decimal range can
//! overflow or truncate.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  execute ok     ┌──────────┐
//!   │ PENDING ├────────────────▶│ EXECUTED │
//!   └─┬─────┬─┘                 └──────────┘
//!     │     │ recoverable            ▲
//!     │     ▼ failure                │ re-execute ok
//!     │  ┌────────┐──────────────────┘
//!     │  │ FROZEN │──────────────┐
//!     │  └────────┘  unrecoverable
//!     │ cancel /                 ▼
//!     │ unrecoverable      ┌───────────┐
//!     └───────────────────▶│ CANCELLED │
//!                          └───────────┘
//! ```
//!
//! `EXECUTED` and `CANCELLED` are terminal. `FROZEN` is terminal-but-
//! recoverable: a privileged re-price may still execute or cancel it.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::{Address, Role};

/// Which kind of order a request carries.
///
/// Market orders settle at the attested price; limit orders additionally
/// check the trigger price. Swap orders convert along the swap path without
/// touching a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    MarketIncrease,
    LimitIncrease,
    MarketDecrease,
    LimitDecrease,
    MarketSwap,
    LimitSwap,
}

impl OrderKind {
    #[must_use]
    pub fn is_market(&self) -> bool {
        matches!(
            self,
            Self::MarketIncrease | Self::MarketDecrease | Self::MarketSwap
        )
    }

    #[must_use]
    pub fn is_increase(&self) -> bool {
        matches!(self, Self::MarketIncrease | Self::LimitIncrease)
    }

    #[must_use]
    pub fn is_decrease(&self) -> bool {
        matches!(self, Self::MarketDecrease | Self::LimitDecrease)
    }

    #[must_use]
    pub fn is_swap(&self) -> bool {
        matches!(self, Self::MarketSwap | Self::LimitSwap)
    }

    fn tag(self) -> u8 {
        match self {
            Self::MarketIncrease => 0,
            Self::LimitIncrease => 1,
            Self::MarketDecrease => 2,
            Self::LimitDecrease => 3,
            Self::MarketSwap => 4,
            Self::LimitSwap => 5,
        }
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarketIncrease => write!(f, "MARKET_INCREASE"),
            Self::LimitIncrease => write!(f, "LIMIT_INCREASE"),
            Self::MarketDecrease => write!(f, "MARKET_DECREASE"),
            Self::LimitDecrease => write!(f, "LIMIT_DECREASE"),
            Self::MarketSwap => write!(f, "MARKET_SWAP"),
            Self::LimitSwap => write!(f, "LIMIT_SWAP"),
        }
    }
}

/// Which side the order's collateral backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollateralSide {
    Long,
    Short,
}

impl CollateralSide {
    #[must_use]
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long)
    }
}

impl std::fmt::Display for CollateralSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Order-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPayload {
    /// The market this order trades.
    pub market: Address,
    /// Token deposited as initial collateral.
    pub initial_collateral_token: Address,
    /// Amount of collateral escrowed at creation.
    pub initial_collateral_amount: U256,
    /// Markets to swap the collateral through before the primary effect.
    pub swap_path: Vec<Address>,
    /// Position size change, USD-denominated.
    pub size_delta_usd: U256,
    /// Limit trigger price; zero for market orders.
    pub trigger_price: U256,
    /// Worst execution price the requester accepts.
    pub acceptable_price: U256,
    pub kind: OrderKind,
    pub side: CollateralSide,
    /// Minimum output amount after swaps.
    pub min_output_amount: U256,
}

/// Deposit-specific fields: add liquidity to a market pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPayload {
    pub market: Address,
    pub initial_long_token: Address,
    pub initial_short_token: Address,
    pub long_token_amount: U256,
    pub short_token_amount: U256,
    pub long_token_swap_path: Vec<Address>,
    pub short_token_swap_path: Vec<Address>,
    /// Minimum market tokens minted for the deposit to succeed.
    pub min_market_tokens: U256,
}

/// Withdrawal-specific fields: redeem market tokens for pool tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPayload {
    pub market: Address,
    /// Market tokens to redeem.
    pub market_token_amount: U256,
    pub min_long_token_amount: U256,
    pub min_short_token_amount: U256,
}

/// The closed sum of request variants. Settlement dispatches on this with
/// an exhaustive match; there is no per-kind inheritance anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPayload {
    Order(OrderPayload),
    Deposit(DepositPayload),
    Withdrawal(WithdrawalPayload),
}

/// The category of a request, used for keeper-role lookup and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestCategory {
    Order,
    Deposit,
    Withdrawal,
}

impl RequestCategory {
    /// The keeper role permitted to execute requests of this category.
    #[must_use]
    pub fn keeper_role(&self) -> Role {
        match self {
            Self::Order => Role::OrderKeeper,
            Self::Deposit => Role::DepositKeeper,
            Self::Withdrawal => Role::WithdrawalKeeper,
        }
    }
}

impl std::fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Order => write!(f, "ORDER"),
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    /// Awaiting keeper execution or requester cancellation.
    Pending,
    /// Execution failed recoverably; a re-price with fresher data may
    /// still execute or cancel it.
    Frozen,
    /// Settled. **Irreversible.**
    Executed,
    /// Terminated, escrowed funds returned. **Irreversible.**
    Cancelled,
}

impl RequestState {
    /// Can this state transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::Pending,
                Self::Executed | Self::Cancelled | Self::Frozen
            ) | (Self::Frozen, Self::Pending | Self::Executed | Self::Cancelled)
        )
    }

    /// Terminal states accept no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Cancelled)
    }
}

impl std::fmt::Display for RequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Frozen => write!(f, "FROZEN"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A pending user intent: order, deposit, or withdrawal.
///
/// Immutable after creation except for `state`. The request store owns the
/// only mutable copy; everything handed out is a clone or shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// The account that created the request (may cancel it).
    pub account: Address,
    /// Receiver of outputs and refunds.
    pub receiver: Address,
    /// Optional contract to call back after settlement.
    pub callback_contract: Option<Address>,
    /// Receiver of the UI fee, if any.
    pub ui_fee_receiver: Address,
    /// Execution fee reserved for the keeper.
    pub execution_fee: U256,
    /// Gas limit forwarded to the callback.
    pub callback_gas_limit: U256,
    /// Block at which the request was created.
    pub created_at_block: u64,
    /// Unix timestamp at which the request was created.
    pub created_at_ts: u64,
    pub payload: RequestPayload,
    pub state: RequestState,
}

impl Request {
    #[must_use]
    pub fn category(&self) -> RequestCategory {
        match self.payload {
            RequestPayload::Order(_) => RequestCategory::Order,
            RequestPayload::Deposit(_) => RequestCategory::Deposit,
            RequestPayload::Withdrawal(_) => RequestCategory::Withdrawal,
        }
    }

    /// Every token whose price the settlement of this request needs:
    /// collateral / pool tokens plus all swap-path markets.
    #[must_use]
    pub fn referenced_tokens(&self) -> Vec<Address> {
        let mut tokens = match &self.payload {
            RequestPayload::Order(order) => {
                let mut t = vec![order.market, order.initial_collateral_token];
                t.extend(&order.swap_path);
                t
            }
            RequestPayload::Deposit(deposit) => {
                let mut t = vec![
                    deposit.market,
                    deposit.initial_long_token,
                    deposit.initial_short_token,
                ];
                t.extend(&deposit.long_token_swap_path);
                t.extend(&deposit.short_token_swap_path);
                t
            }
            RequestPayload::Withdrawal(withdrawal) => vec![withdrawal.market],
        };
        tokens.sort_unstable();
        tokens.dedup();
        tokens
    }

    /// The token and amount escrowed at creation (excluding the execution
    /// fee). Withdrawals escrow market tokens.
    #[must_use]
    pub fn escrowed(&self) -> (Address, U256) {
        match &self.payload {
            RequestPayload::Order(order) => {
                (order.initial_collateral_token, order.initial_collateral_amount)
            }
            // Deposits escrow both pool tokens; the long side is reported
            // here, the short side is tracked by the vault separately.
            RequestPayload::Deposit(deposit) => {
                (deposit.initial_long_token, deposit.long_token_amount)
            }
            RequestPayload::Withdrawal(withdrawal) => {
                (withdrawal.market, withdrawal.market_token_amount)
            }
        }
    }

    /// Canonical serialization of the immutable fields, input to
    /// [`crate::keys::derive_request_key`]. Lifecycle state is excluded:
    /// the key must not change as the request moves through its life.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(self.account.as_bytes());
        buf.extend_from_slice(self.receiver.as_bytes());
        match &self.callback_contract {
            Some(addr) => {
                buf.push(1);
                buf.extend_from_slice(addr.as_bytes());
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(self.ui_fee_receiver.as_bytes());
        buf.extend_from_slice(&self.execution_fee.to_big_endian());
        buf.extend_from_slice(&self.callback_gas_limit.to_big_endian());
        buf.extend_from_slice(&self.created_at_block.to_le_bytes());
        buf.extend_from_slice(&self.created_at_ts.to_le_bytes());
        match &self.payload {
            RequestPayload::Order(order) => {
                buf.push(0);
                buf.extend_from_slice(order.market.as_bytes());
                buf.extend_from_slice(order.initial_collateral_token.as_bytes());
                buf.extend_from_slice(&order.initial_collateral_amount.to_big_endian());
                buf.push(u8::try_from(order.swap_path.len()).unwrap_or(u8::MAX));
                for hop in &order.swap_path {
                    buf.extend_from_slice(hop.as_bytes());
                }
                buf.extend_from_slice(&order.size_delta_usd.to_big_endian());
                buf.extend_from_slice(&order.trigger_price.to_big_endian());
                buf.extend_from_slice(&order.acceptable_price.to_big_endian());
                buf.push(order.kind.tag());
                buf.push(u8::from(order.side.is_long()));
                buf.extend_from_slice(&order.min_output_amount.to_big_endian());
            }
            RequestPayload::Deposit(deposit) => {
                buf.push(1);
                buf.extend_from_slice(deposit.market.as_bytes());
                buf.extend_from_slice(deposit.initial_long_token.as_bytes());
                buf.extend_from_slice(deposit.initial_short_token.as_bytes());
                buf.extend_from_slice(&deposit.long_token_amount.to_big_endian());
                buf.extend_from_slice(&deposit.short_token_amount.to_big_endian());
                buf.push(u8::try_from(deposit.long_token_swap_path.len()).unwrap_or(u8::MAX));
                for hop in &deposit.long_token_swap_path {
                    buf.extend_from_slice(hop.as_bytes());
                }
                buf.push(u8::try_from(deposit.short_token_swap_path.len()).unwrap_or(u8::MAX));
                for hop in &deposit.short_token_swap_path {
                    buf.extend_from_slice(hop.as_bytes());
                }
                buf.extend_from_slice(&deposit.min_market_tokens.to_big_endian());
            }
            RequestPayload::Withdrawal(withdrawal) => {
                buf.push(2);
                buf.extend_from_slice(withdrawal.market.as_bytes());
                buf.extend_from_slice(&withdrawal.market_token_amount.to_big_endian());
                buf.extend_from_slice(&withdrawal.min_long_token_amount.to_big_endian());
                buf.extend_from_slice(&withdrawal.min_short_token_amount.to_big_endian());
            }
        }
        buf
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Request {
    /// A market-increase order for unit tests.
    #[must_use]
    pub fn dummy_order(account: Address, collateral_token: Address, market: Address) -> Self {
        Self {
            account,
            receiver: account,
            callback_contract: None,
            ui_fee_receiver: Address::ZERO,
            execution_fee: U256::zero(),
            callback_gas_limit: U256::zero(),
            created_at_block: 100,
            created_at_ts: 1_700_000_000,
            payload: RequestPayload::Order(OrderPayload {
                market,
                initial_collateral_token: collateral_token,
                initial_collateral_amount: U256::from(2_000_000_000_000_000_000u128),
                swap_path: vec![],
                size_delta_usd: U256::from(10_000u64) * U256::exp10(18),
                trigger_price: U256::zero(),
                acceptable_price: U256::from(5_500u64),
                kind: OrderKind::MarketIncrease,
                side: CollateralSide::Long,
                min_output_amount: U256::zero(),
            }),
            state: RequestState::Pending,
        }
    }

    /// A deposit request for unit tests.
    #[must_use]
    pub fn dummy_deposit(account: Address, market: Address, long: Address, short: Address) -> Self {
        Self {
            account,
            receiver: account,
            callback_contract: None,
            ui_fee_receiver: Address::ZERO,
            execution_fee: U256::zero(),
            callback_gas_limit: U256::zero(),
            created_at_block: 100,
            created_at_ts: 1_700_000_000,
            payload: RequestPayload::Deposit(DepositPayload {
                market,
                initial_long_token: long,
                initial_short_token: short,
                long_token_amount: U256::exp10(18),
                short_token_amount: U256::from(5_000u64) * U256::exp10(6),
                long_token_swap_path: vec![],
                short_token_swap_path: vec![],
                min_market_tokens: U256::zero(),
            }),
            state: RequestState::Pending,
        }
    }

    /// A withdrawal request for unit tests.
    #[must_use]
    pub fn dummy_withdrawal(account: Address, market: Address) -> Self {
        Self {
            account,
            receiver: account,
            callback_contract: None,
            ui_fee_receiver: Address::ZERO,
            execution_fee: U256::zero(),
            callback_gas_limit: U256::zero(),
            created_at_block: 100,
            created_at_ts: 1_700_000_000,
            payload: RequestPayload::Withdrawal(WithdrawalPayload {
                market,
                market_token_amount: U256::exp10(18),
                min_long_token_amount: U256::zero(),
                min_short_token_amount: U256::zero(),
            }),
            state: RequestState::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_order() -> Request {
        Request::dummy_order(Address([1u8; 32]), Address([2u8; 32]), Address([3u8; 32]))
    }

    #[test]
    fn transitions_from_pending() {
        assert!(RequestState::Pending.can_transition_to(RequestState::Executed));
        assert!(RequestState::Pending.can_transition_to(RequestState::Cancelled));
        assert!(RequestState::Pending.can_transition_to(RequestState::Frozen));
    }

    #[test]
    fn transitions_from_frozen() {
        assert!(RequestState::Frozen.can_transition_to(RequestState::Pending));
        assert!(RequestState::Frozen.can_transition_to(RequestState::Executed));
        assert!(RequestState::Frozen.can_transition_to(RequestState::Cancelled));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [RequestState::Executed, RequestState::Cancelled] {
            assert!(terminal.is_terminal());
            for target in [
                RequestState::Pending,
                RequestState::Frozen,
                RequestState::Executed,
                RequestState::Cancelled,
            ] {
                assert!(
                    !terminal.can_transition_to(target),
                    "{terminal} -> {target} must be illegal"
                );
            }
        }
    }

    #[test]
    fn category_follows_payload() {
        let account = Address([1u8; 32]);
        let market = Address([3u8; 32]);
        assert_eq!(make_order().category(), RequestCategory::Order);
        assert_eq!(
            Request::dummy_deposit(account, market, Address([4u8; 32]), Address([5u8; 32]))
                .category(),
            RequestCategory::Deposit
        );
        assert_eq!(
            Request::dummy_withdrawal(account, market).category(),
            RequestCategory::Withdrawal
        );
    }

    #[test]
    fn keeper_roles_per_category() {
        assert_eq!(RequestCategory::Order.keeper_role(), Role::OrderKeeper);
        assert_eq!(RequestCategory::Deposit.keeper_role(), Role::DepositKeeper);
        assert_eq!(
            RequestCategory::Withdrawal.keeper_role(),
            Role::WithdrawalKeeper
        );
    }

    #[test]
    fn referenced_tokens_include_swap_path() {
        let mut request = make_order();
        let hop = Address([9u8; 32]);
        if let RequestPayload::Order(order) = &mut request.payload {
            order.swap_path.push(hop);
        }
        let tokens = request.referenced_tokens();
        assert!(tokens.contains(&hop));
        assert!(tokens.contains(&Address([2u8; 32])));
        assert!(tokens.contains(&Address([3u8; 32])));
    }

    #[test]
    fn referenced_tokens_deduplicated() {
        let account = Address([1u8; 32]);
        let market = Address([3u8; 32]);
        // Same token on both sides of the deposit.
        let request = Request::dummy_deposit(account, market, market, market);
        assert_eq!(request.referenced_tokens(), vec![market]);
    }

    #[test]
    fn canonical_bytes_ignore_state() {
        let mut a = make_order();
        let before = a.canonical_bytes();
        a.state = RequestState::Frozen;
        assert_eq!(before, a.canonical_bytes());
    }

    #[test]
    fn canonical_bytes_differ_by_payload() {
        let a = make_order();
        let mut b = a.clone();
        if let RequestPayload::Order(order) = &mut b.payload {
            order.acceptable_price = U256::from(5_501u64);
        }
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn order_kind_predicates() {
        assert!(OrderKind::MarketIncrease.is_market());
        assert!(OrderKind::MarketIncrease.is_increase());
        assert!(OrderKind::LimitDecrease.is_decrease());
        assert!(!OrderKind::LimitDecrease.is_market());
        assert!(OrderKind::MarketSwap.is_swap());
    }

    #[test]
    fn serde_roundtrip() {
        let request = make_order();
        let json = serde_json::to_string(&request).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }
}
