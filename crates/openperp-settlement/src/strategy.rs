//! Per-variant settlement logic.
//!
//! The engine validates the proof and owns every state transition; what a
//! settlement *means* for a given request variant is behind the
//! [`SettlementStrategy`] seam. The [`PriceBoundSettler`] implements the
//! structural checks (trigger and acceptable-price bounds, pool and
//! open-interest caps, minimum outputs) with straightforward bound
//! arithmetic; a production deployment plugs its full pricing model in
//! here without touching the engine.
//!
//! Outcome classification: a failure that fresher prices could clear
//! (bound violated, cap exceeded, minimum not met) is `Frozen`; a failure
//! no price can clear (empty request) is `Cancelled`.

use primitive_types::U256;

use openperp_store::DataStore;
use openperp_types::{
    DepositPayload, OrderPayload, Request, RequestPayload, Result, ValidatedPrices,
    WithdrawalPayload, keys,
};

/// What settling a request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Settled: the request is done and escrow is consumed.
    Executed {
        output_amount: U256,
        execution_price: U256,
    },
    /// Recoverable failure: freeze and await a re-price with fresher data.
    Frozen { reason: String },
    /// Unrecoverable failure: cancel and return escrow.
    Cancelled { reason: String },
}

/// The settlement seam, dispatched by request variant.
pub trait SettlementStrategy {
    /// Decide the outcome for `request` under `prices`.
    ///
    /// Must not mutate anything: the engine applies the outcome. Every
    /// price this reads has already passed attestation validation.
    fn settle(
        &self,
        request: &Request,
        prices: &ValidatedPrices,
        data: &DataStore,
    ) -> Result<SettlementOutcome>;
}

/// Bound-arithmetic settler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceBoundSettler;

impl PriceBoundSettler {
    fn settle_order(
        &self,
        order: &OrderPayload,
        prices: &ValidatedPrices,
        data: &DataStore,
    ) -> Result<SettlementOutcome> {
        if order.size_delta_usd.is_zero() && order.initial_collateral_amount.is_zero() {
            return Ok(SettlementOutcome::Cancelled {
                reason: "empty order".into(),
            });
        }

        let index = prices.require(order.market)?;

        if order.kind.is_swap() {
            return self.settle_swap(order, prices);
        }

        // A "buying" fill is charged the worst (highest) attested price,
        // a "selling" fill receives the worst (lowest).
        let buying = order.kind.is_increase() == order.side.is_long();
        let execution_price = index.pick(buying);

        if !order.kind.is_market() && !order.trigger_price.is_zero() {
            let triggered = if buying {
                execution_price <= order.trigger_price
            } else {
                execution_price >= order.trigger_price
            };
            if !triggered {
                return Ok(SettlementOutcome::Frozen {
                    reason: format!(
                        "trigger price {} not reached at {execution_price}",
                        order.trigger_price
                    ),
                });
            }
        }

        if !order.acceptable_price.is_zero() {
            let acceptable = if buying {
                execution_price <= order.acceptable_price
            } else {
                execution_price >= order.acceptable_price
            };
            if !acceptable {
                return Ok(SettlementOutcome::Frozen {
                    reason: format!(
                        "acceptable price {} violated at {execution_price}",
                        order.acceptable_price
                    ),
                });
            }
        }

        if order.kind.is_increase() {
            let current = data.u256_or(
                keys::open_interest_key(
                    order.market,
                    order.initial_collateral_token,
                    order.side.is_long(),
                ),
                U256::zero(),
            );
            let cap =
                data.get_u256(keys::max_open_interest_key(order.market, order.side.is_long()));
            if cap.is_some_and(|cap| current + order.size_delta_usd > cap) {
                return Ok(SettlementOutcome::Frozen {
                    reason: "open interest cap exceeded".into(),
                });
            }
        }

        let output_amount = order.size_delta_usd / execution_price;
        if output_amount < order.min_output_amount {
            return Ok(SettlementOutcome::Frozen {
                reason: format!(
                    "output {output_amount} below minimum {}",
                    order.min_output_amount
                ),
            });
        }

        Ok(SettlementOutcome::Executed {
            output_amount,
            execution_price,
        })
    }

    fn settle_swap(
        &self,
        order: &OrderPayload,
        prices: &ValidatedPrices,
    ) -> Result<SettlementOutcome> {
        if order.initial_collateral_amount.is_zero() {
            return Ok(SettlementOutcome::Cancelled {
                reason: "empty swap".into(),
            });
        }
        // Sell the collateral at its minimum, buy the output at the
        // market's maximum: both bounds against the trader.
        let collateral = prices.require(order.initial_collateral_token)?;
        let index = prices.require(order.market)?;
        let execution_price = index.max;
        let output_amount = order.initial_collateral_amount * collateral.min / execution_price;
        if output_amount < order.min_output_amount {
            return Ok(SettlementOutcome::Frozen {
                reason: format!(
                    "swap output {output_amount} below minimum {}",
                    order.min_output_amount
                ),
            });
        }
        Ok(SettlementOutcome::Executed {
            output_amount,
            execution_price,
        })
    }

    fn settle_deposit(
        &self,
        deposit: &DepositPayload,
        prices: &ValidatedPrices,
        data: &DataStore,
    ) -> Result<SettlementOutcome> {
        if deposit.long_token_amount.is_zero() && deposit.short_token_amount.is_zero() {
            return Ok(SettlementOutcome::Cancelled {
                reason: "empty deposit".into(),
            });
        }

        for (token, amount) in [
            (deposit.initial_long_token, deposit.long_token_amount),
            (deposit.initial_short_token, deposit.short_token_amount),
        ] {
            if amount.is_zero() {
                continue;
            }
            let current = data.u256_or(keys::pool_amount_key(deposit.market, token), U256::zero());
            let cap = data.get_u256(keys::max_pool_amount_key(deposit.market, token));
            if cap.is_some_and(|cap| current + amount > cap) {
                return Ok(SettlementOutcome::Frozen {
                    reason: format!("max pool amount exceeded for {token}"),
                });
            }
        }

        let long = prices.require(deposit.initial_long_token)?;
        let short = prices.require(deposit.initial_short_token)?;
        let market = prices.require(deposit.market)?;

        // Deposited value priced at the pool-favoring minimum; market
        // tokens minted at their maximum.
        let value = deposit.long_token_amount * long.min + deposit.short_token_amount * short.min;
        let output_amount = value / market.max;
        if output_amount < deposit.min_market_tokens {
            return Ok(SettlementOutcome::Frozen {
                reason: format!(
                    "market tokens {output_amount} below minimum {}",
                    deposit.min_market_tokens
                ),
            });
        }

        Ok(SettlementOutcome::Executed {
            output_amount,
            execution_price: market.max,
        })
    }

    fn settle_withdrawal(
        &self,
        withdrawal: &WithdrawalPayload,
        prices: &ValidatedPrices,
    ) -> Result<SettlementOutcome> {
        if withdrawal.market_token_amount.is_zero() {
            return Ok(SettlementOutcome::Cancelled {
                reason: "empty withdrawal".into(),
            });
        }

        let market = prices.require(withdrawal.market)?;
        // Redeemed value at the pool-favoring minimum.
        let output_amount = withdrawal.market_token_amount * market.min;
        let required = withdrawal.min_long_token_amount + withdrawal.min_short_token_amount;
        if output_amount < required {
            return Ok(SettlementOutcome::Frozen {
                reason: format!("redeemed value {output_amount} below minimum {required}"),
            });
        }

        Ok(SettlementOutcome::Executed {
            output_amount,
            execution_price: market.min,
        })
    }
}

impl SettlementStrategy for PriceBoundSettler {
    fn settle(
        &self,
        request: &Request,
        prices: &ValidatedPrices,
        data: &DataStore,
    ) -> Result<SettlementOutcome> {
        match &request.payload {
            RequestPayload::Order(order) => self.settle_order(order, prices, data),
            RequestPayload::Deposit(deposit) => self.settle_deposit(deposit, prices, data),
            RequestPayload::Withdrawal(withdrawal) => {
                self.settle_withdrawal(withdrawal, prices)
            }
        }
    }
}
