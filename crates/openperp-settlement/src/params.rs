//! Creation parameters for the caller-facing operations.
//!
//! These mirror the payloads keepers and frontends submit; the engine turns
//! them into immutable [`Request`](openperp_types::Request) records after
//! validation.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use openperp_types::{Address, CollateralSide, OrderKind};

/// Parameters for `create_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderParams {
    pub receiver: Address,
    pub callback_contract: Option<Address>,
    pub ui_fee_receiver: Address,
    pub market: Address,
    pub initial_collateral_token: Address,
    pub initial_collateral_amount: U256,
    pub swap_path: Vec<Address>,
    pub size_delta_usd: U256,
    pub trigger_price: U256,
    pub acceptable_price: U256,
    pub execution_fee: U256,
    pub callback_gas_limit: U256,
    pub min_output_amount: U256,
    pub kind: OrderKind,
    pub side: CollateralSide,
}

/// Parameters for `create_deposit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDepositParams {
    pub receiver: Address,
    pub callback_contract: Option<Address>,
    pub ui_fee_receiver: Address,
    pub market: Address,
    pub initial_long_token: Address,
    pub initial_short_token: Address,
    pub long_token_amount: U256,
    pub short_token_amount: U256,
    pub long_token_swap_path: Vec<Address>,
    pub short_token_swap_path: Vec<Address>,
    pub min_market_tokens: U256,
    pub execution_fee: U256,
    pub callback_gas_limit: U256,
}

/// Parameters for `create_withdrawal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWithdrawalParams {
    pub receiver: Address,
    pub callback_contract: Option<Address>,
    pub ui_fee_receiver: Address,
    pub market: Address,
    pub market_token_amount: U256,
    pub min_long_token_amount: U256,
    pub min_short_token_amount: U256,
    pub execution_fee: U256,
    pub callback_gas_limit: U256,
}
