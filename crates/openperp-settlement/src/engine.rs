//! The settlement engine.
//!
//! One engine instance owns the request store, the parameter store, the
//! attestation validator, and the injected collaborators (authorizer,
//! vault, event sink, strategy). Every public operation is a single
//! synchronous critical section: it either applies all of its effects or
//! returns an error having applied none. Attestation failures in
//! particular leave the request `Pending` and untouched so the keeper can
//! resubmit a corrected proof.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use openperp_oracle::{AttestationContext, PriceAttestationValidator, PriceProof};
use openperp_store::{DataStore, RequestStore, RoleAuthorizer};
use openperp_types::{
    Address, BlockContext, EngineConfig, OracleConfig, PerpError, ParamKey, Request,
    RequestCategory, RequestKey, RequestPayload, RequestState, Result, Role, keys,
};

use crate::events::{Event, EventSink};
use crate::params::{CreateDepositParams, CreateOrderParams, CreateWithdrawalParams};
use crate::strategy::{SettlementOutcome, SettlementStrategy};
use crate::vault::TokenVault;

/// The outcome of an `execute` or re-price call, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub key: RequestKey,
    /// The request's state after the call.
    pub state: RequestState,
    /// Computed output amount, present on execution.
    pub output_amount: Option<U256>,
    /// Price the settlement used, present on execution.
    pub execution_price: Option<U256>,
    /// Failure classification, present on freeze or cancellation.
    pub reason: Option<String>,
}

/// Orchestrates request creation, settlement, and cancellation.
pub struct SettlementEngine<A, V, E, S> {
    requests: RequestStore,
    data: DataStore,
    validator: PriceAttestationValidator,
    authorizer: A,
    vault: V,
    events: E,
    strategy: S,
    oracle_config: OracleConfig,
    engine_config: EngineConfig,
}

impl<A, V, E, S> SettlementEngine<A, V, E, S>
where
    A: RoleAuthorizer,
    V: TokenVault,
    E: EventSink,
    S: SettlementStrategy,
{
    #[must_use]
    pub fn new(
        authorizer: A,
        vault: V,
        events: E,
        strategy: S,
        validator: PriceAttestationValidator,
        oracle_config: OracleConfig,
        engine_config: EngineConfig,
    ) -> Self {
        Self {
            requests: RequestStore::new(),
            data: DataStore::new(),
            validator,
            authorizer,
            vault,
            events,
            strategy,
            oracle_config,
            engine_config,
        }
    }

    #[must_use]
    pub fn requests(&self) -> &RequestStore {
        &self.requests
    }

    #[must_use]
    pub fn data_store(&self) -> &DataStore {
        &self.data
    }

    #[must_use]
    pub fn vault(&self) -> &V {
        &self.vault
    }

    #[must_use]
    pub fn events(&self) -> &E {
        &self.events
    }

    // =====================================================================
    // Parameter operations (controller-gated)
    // =====================================================================

    /// Write an integer protocol parameter. Requires [`Role::Controller`].
    pub fn set_u256_param(&mut self, caller: Address, key: ParamKey, value: U256) -> Result<()> {
        self.require_role(caller, Role::Controller)?;
        tracing::debug!(key = %key, value = %value, "parameter set");
        self.data.set_u256(key, value);
        Ok(())
    }

    /// Write an address protocol parameter. Requires [`Role::Controller`].
    pub fn set_address_param(
        &mut self,
        caller: Address,
        key: ParamKey,
        value: Address,
    ) -> Result<()> {
        self.require_role(caller, Role::Controller)?;
        tracing::debug!(key = %key, value = %value, "parameter set");
        self.data.set_address(key, value);
        Ok(())
    }

    // =====================================================================
    // Request creation
    // =====================================================================

    /// Create a pending order, escrowing its collateral and execution fee.
    pub fn create_order(
        &mut self,
        account: Address,
        params: CreateOrderParams,
        ctx: BlockContext,
    ) -> Result<RequestKey> {
        if params.receiver.is_zero() {
            return Err(PerpError::InvalidRequest {
                reason: "zero receiver".into(),
            });
        }
        if params.initial_collateral_amount.is_zero() {
            return Err(PerpError::InvalidRequest {
                reason: "zero collateral".into(),
            });
        }
        self.check_swap_path(&params.swap_path)?;

        let request = Request {
            account,
            receiver: params.receiver,
            callback_contract: params.callback_contract,
            ui_fee_receiver: params.ui_fee_receiver,
            execution_fee: params.execution_fee,
            callback_gas_limit: params.callback_gas_limit,
            created_at_block: ctx.number,
            created_at_ts: ctx.timestamp,
            payload: RequestPayload::Order(openperp_types::OrderPayload {
                market: params.market,
                initial_collateral_token: params.initial_collateral_token,
                initial_collateral_amount: params.initial_collateral_amount,
                swap_path: params.swap_path,
                size_delta_usd: params.size_delta_usd,
                trigger_price: params.trigger_price,
                acceptable_price: params.acceptable_price,
                kind: params.kind,
                side: params.side,
                min_output_amount: params.min_output_amount,
            }),
            state: RequestState::Pending,
        };

        let key = self.requests.create(request)?;
        self.vault.lock(
            key,
            params.initial_collateral_token,
            params.initial_collateral_amount,
        )?;
        self.lock_execution_fee(key, params.execution_fee)?;

        self.events.emit(
            Event::new("order_created")
                .field("key", key)
                .field("account", account)
                .field("market", params.market)
                .field("kind", params.kind),
        );
        tracing::info!(key = %key, account = %account, "order created");
        Ok(key)
    }

    /// Create a pending deposit, escrowing both pool tokens.
    pub fn create_deposit(
        &mut self,
        account: Address,
        params: CreateDepositParams,
        ctx: BlockContext,
    ) -> Result<RequestKey> {
        if params.receiver.is_zero() {
            return Err(PerpError::InvalidRequest {
                reason: "zero receiver".into(),
            });
        }
        if params.long_token_amount.is_zero() && params.short_token_amount.is_zero() {
            return Err(PerpError::InvalidRequest {
                reason: "deposit has no token amounts".into(),
            });
        }
        self.check_swap_path(&params.long_token_swap_path)?;
        self.check_swap_path(&params.short_token_swap_path)?;

        let request = Request {
            account,
            receiver: params.receiver,
            callback_contract: params.callback_contract,
            ui_fee_receiver: params.ui_fee_receiver,
            execution_fee: params.execution_fee,
            callback_gas_limit: params.callback_gas_limit,
            created_at_block: ctx.number,
            created_at_ts: ctx.timestamp,
            payload: RequestPayload::Deposit(openperp_types::DepositPayload {
                market: params.market,
                initial_long_token: params.initial_long_token,
                initial_short_token: params.initial_short_token,
                long_token_amount: params.long_token_amount,
                short_token_amount: params.short_token_amount,
                long_token_swap_path: params.long_token_swap_path,
                short_token_swap_path: params.short_token_swap_path,
                min_market_tokens: params.min_market_tokens,
            }),
            state: RequestState::Pending,
        };

        let key = self.requests.create(request)?;
        self.vault
            .lock(key, params.initial_long_token, params.long_token_amount)?;
        self.vault
            .lock(key, params.initial_short_token, params.short_token_amount)?;
        self.lock_execution_fee(key, params.execution_fee)?;

        self.events.emit(
            Event::new("deposit_created")
                .field("key", key)
                .field("account", account)
                .field("market", params.market),
        );
        tracing::info!(key = %key, account = %account, "deposit created");
        Ok(key)
    }

    /// Create a pending withdrawal, escrowing the market tokens.
    pub fn create_withdrawal(
        &mut self,
        account: Address,
        params: CreateWithdrawalParams,
        ctx: BlockContext,
    ) -> Result<RequestKey> {
        if params.receiver.is_zero() {
            return Err(PerpError::InvalidRequest {
                reason: "zero receiver".into(),
            });
        }
        if params.market_token_amount.is_zero() {
            return Err(PerpError::InvalidRequest {
                reason: "zero market token amount".into(),
            });
        }

        let request = Request {
            account,
            receiver: params.receiver,
            callback_contract: params.callback_contract,
            ui_fee_receiver: params.ui_fee_receiver,
            execution_fee: params.execution_fee,
            callback_gas_limit: params.callback_gas_limit,
            created_at_block: ctx.number,
            created_at_ts: ctx.timestamp,
            payload: RequestPayload::Withdrawal(openperp_types::WithdrawalPayload {
                market: params.market,
                market_token_amount: params.market_token_amount,
                min_long_token_amount: params.min_long_token_amount,
                min_short_token_amount: params.min_short_token_amount,
            }),
            state: RequestState::Pending,
        };

        let key = self.requests.create(request)?;
        self.vault
            .lock(key, params.market, params.market_token_amount)?;
        self.lock_execution_fee(key, params.execution_fee)?;

        self.events.emit(
            Event::new("withdrawal_created")
                .field("key", key)
                .field("account", account)
                .field("market", params.market),
        );
        tracing::info!(key = %key, account = %account, "withdrawal created");
        Ok(key)
    }

    // =====================================================================
    // Settlement
    // =====================================================================

    /// Execute a pending order with a price proof. Requires
    /// [`Role::OrderKeeper`].
    pub fn execute_order(
        &mut self,
        key: RequestKey,
        proof: &PriceProof,
        caller: Address,
        ctx: BlockContext,
    ) -> Result<SettlementReport> {
        self.require_role(caller, Role::OrderKeeper)?;
        self.execute_internal(key, proof, ctx, RequestCategory::Order, RequestState::Pending)
    }

    /// Execute a pending deposit. Requires [`Role::DepositKeeper`].
    pub fn execute_deposit(
        &mut self,
        key: RequestKey,
        proof: &PriceProof,
        caller: Address,
        ctx: BlockContext,
    ) -> Result<SettlementReport> {
        self.require_role(caller, Role::DepositKeeper)?;
        self.execute_internal(
            key,
            proof,
            ctx,
            RequestCategory::Deposit,
            RequestState::Pending,
        )
    }

    /// Execute a pending withdrawal. Requires [`Role::WithdrawalKeeper`].
    pub fn execute_withdrawal(
        &mut self,
        key: RequestKey,
        proof: &PriceProof,
        caller: Address,
        ctx: BlockContext,
    ) -> Result<SettlementReport> {
        self.require_role(caller, Role::WithdrawalKeeper)?;
        self.execute_internal(
            key,
            proof,
            ctx,
            RequestCategory::Withdrawal,
            RequestState::Pending,
        )
    }

    /// Re-price a frozen order with fresher data. Requires
    /// [`Role::FrozenOrderKeeper`]. Success executes the order; an
    /// unrecoverable outcome cancels it; another recoverable failure
    /// leaves it frozen.
    pub fn execute_frozen_order(
        &mut self,
        key: RequestKey,
        proof: &PriceProof,
        caller: Address,
        ctx: BlockContext,
    ) -> Result<SettlementReport> {
        self.require_role(caller, Role::FrozenOrderKeeper)?;
        self.execute_internal(key, proof, ctx, RequestCategory::Order, RequestState::Frozen)
    }

    /// Cancel a live request and return its escrow.
    ///
    /// The requester may always cancel; anyone else must wait out the
    /// cancellation delay from the request's creation block.
    pub fn cancel(
        &mut self,
        key: RequestKey,
        caller: Address,
        ctx: BlockContext,
    ) -> Result<SettlementReport> {
        let request = self.requests.get_live(key)?.clone();

        if caller != request.account {
            let delay = self
                .data
                .u256_or(
                    keys::request_cancellation_delay_key(),
                    U256::from(self.engine_config.request_cancellation_delay_blocks),
                )
                .low_u64();
            let unlock_block = request.created_at_block + delay;
            if ctx.number < unlock_block {
                return Err(PerpError::CancellationTooEarly { key, unlock_block });
            }
        }

        self.requests.transition(key, RequestState::Cancelled)?;
        self.vault.refund(key, request.receiver)?;
        self.requests.remove(key)?;

        let reason = if caller == request.account {
            "cancelled by requester"
        } else {
            "cancelled after timeout"
        };
        self.events.emit(
            Event::new(cancelled_event_name(request.category()))
                .field("key", key)
                .field("by", caller)
                .field("reason", reason),
        );
        tracing::info!(key = %key, caller = %caller, "request cancelled");
        Ok(SettlementReport {
            key,
            state: RequestState::Cancelled,
            output_amount: None,
            execution_price: None,
            reason: Some(reason.into()),
        })
    }

    // =====================================================================
    // Internals
    // =====================================================================

    fn require_role(&self, caller: Address, role: Role) -> Result<()> {
        if self.authorizer.has_role(caller, role) {
            Ok(())
        } else {
            Err(PerpError::Unauthorized {
                account: caller,
                role,
            })
        }
    }

    fn check_swap_path(&self, path: &[Address]) -> Result<()> {
        let max = self
            .data
            .u256_or(
                keys::max_swap_path_length_key(),
                U256::from(self.engine_config.max_swap_path_length),
            )
            .low_u64() as usize;
        if path.len() > max {
            return Err(PerpError::SwapPathTooLong {
                len: path.len(),
                max,
            });
        }
        Ok(())
    }

    fn lock_execution_fee(&mut self, key: RequestKey, fee: U256) -> Result<()> {
        if fee.is_zero() {
            return Ok(());
        }
        let fee_token = self.data.get_address(keys::fee_token_key()).ok_or_else(|| {
            PerpError::InvalidRequest {
                reason: "execution fee set but no fee token configured".into(),
            }
        })?;
        self.vault.lock(key, fee_token, fee)
    }

    /// The execute pipeline shared by all four keeper entry points.
    ///
    /// Authorization happens in the callers; here: lookup, decode,
    /// validate, settle, transition, emit. Nothing before the transition
    /// step mutates state, so every validation error leaves the request
    /// exactly as it was.
    #[allow(clippy::too_many_lines)]
    fn execute_internal(
        &mut self,
        key: RequestKey,
        proof: &PriceProof,
        ctx: BlockContext,
        expected_category: RequestCategory,
        expected_state: RequestState,
    ) -> Result<SettlementReport> {
        let request = self.requests.get_live(key)?.clone();
        if request.category() != expected_category {
            return Err(PerpError::InvalidRequest {
                reason: format!(
                    "{key} is a {} request, not {expected_category}",
                    request.category()
                ),
            });
        }
        if request.state != expected_state {
            return Err(PerpError::InvalidRequest {
                reason: format!("{key} is {}, expected {expected_state}", request.state),
            });
        }

        let points = proof.decode()?;
        let attestation_ctx = AttestationContext {
            block: ctx,
            signer_threshold: self.oracle_config.signer_threshold,
            max_price_age_secs: self
                .data
                .u256_or(
                    keys::max_oracle_price_age_key(),
                    U256::from(self.oracle_config.max_price_age_secs),
                )
                .low_u64(),
        };
        let validated = self
            .validator
            .validate(&points, &proof.signatures, &attestation_ctx)?;

        // The proof must cover every token this request touches before any
        // settlement logic runs.
        for token in request.referenced_tokens() {
            validated.require(token)?;
        }

        let outcome = self.strategy.settle(&request, &validated, &self.data)?;
        let category = request.category();
        match outcome {
            SettlementOutcome::Executed {
                output_amount,
                execution_price,
            } => {
                self.requests.transition(key, RequestState::Executed)?;
                self.vault.consume(key)?;
                self.requests.remove(key)?;
                self.events.emit(
                    Event::new(executed_event_name(category))
                        .field("key", key)
                        .field("output_amount", output_amount)
                        .field("execution_price", execution_price),
                );
                tracing::info!(
                    key = %key,
                    output = %output_amount,
                    price = %execution_price,
                    "request executed"
                );
                Ok(SettlementReport {
                    key,
                    state: RequestState::Executed,
                    output_amount: Some(output_amount),
                    execution_price: Some(execution_price),
                    reason: None,
                })
            }
            SettlementOutcome::Frozen { reason } => {
                // A repeat recoverable failure on the frozen path is a
                // no-op transition; escrow stays locked either way.
                if request.state != RequestState::Frozen {
                    self.requests.transition(key, RequestState::Frozen)?;
                }
                self.events.emit(
                    Event::new(frozen_event_name(category))
                        .field("key", key)
                        .field("reason", &reason),
                );
                tracing::warn!(key = %key, reason = %reason, "request frozen");
                Ok(SettlementReport {
                    key,
                    state: RequestState::Frozen,
                    output_amount: None,
                    execution_price: None,
                    reason: Some(reason),
                })
            }
            SettlementOutcome::Cancelled { reason } => {
                self.requests.transition(key, RequestState::Cancelled)?;
                self.vault.refund(key, request.receiver)?;
                self.requests.remove(key)?;
                self.events.emit(
                    Event::new(cancelled_event_name(category))
                        .field("key", key)
                        .field("reason", &reason),
                );
                tracing::warn!(key = %key, reason = %reason, "request cancelled by settlement");
                Ok(SettlementReport {
                    key,
                    state: RequestState::Cancelled,
                    output_amount: None,
                    execution_price: None,
                    reason: Some(reason),
                })
            }
        }
    }
}

fn executed_event_name(category: RequestCategory) -> &'static str {
    match category {
        RequestCategory::Order => "order_executed",
        RequestCategory::Deposit => "deposit_executed",
        RequestCategory::Withdrawal => "withdrawal_executed",
    }
}

fn frozen_event_name(category: RequestCategory) -> &'static str {
    match category {
        RequestCategory::Order => "order_frozen",
        RequestCategory::Deposit => "deposit_frozen",
        RequestCategory::Withdrawal => "withdrawal_frozen",
    }
}

fn cancelled_event_name(category: RequestCategory) -> &'static str {
    match category {
        RequestCategory::Order => "order_cancelled",
        RequestCategory::Deposit => "deposit_cancelled",
        RequestCategory::Withdrawal => "withdrawal_cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openperp_oracle::OracleSignerSet;
    use openperp_store::{PermissiveAuthorizer, RoleStore};
    use openperp_types::{CollateralSide, OrderKind};

    use crate::events::RecordingSink;
    use crate::strategy::PriceBoundSettler;
    use crate::vault::LedgerVault;

    fn addr(seed: u8) -> Address {
        Address([seed; 32])
    }

    fn ctx() -> BlockContext {
        BlockContext::new(150, 1_700_000_100)
    }

    fn order_params() -> CreateOrderParams {
        CreateOrderParams {
            receiver: addr(1),
            callback_contract: None,
            ui_fee_receiver: Address::ZERO,
            market: addr(3),
            initial_collateral_token: addr(2),
            initial_collateral_amount: U256::from(1_000u64),
            swap_path: vec![],
            size_delta_usd: U256::from(10_000u64),
            trigger_price: U256::zero(),
            acceptable_price: U256::from(5_500u64),
            execution_fee: U256::zero(),
            callback_gas_limit: U256::zero(),
            min_output_amount: U256::zero(),
            kind: OrderKind::MarketIncrease,
            side: CollateralSide::Long,
        }
    }

    fn permissive_engine()
    -> SettlementEngine<PermissiveAuthorizer, LedgerVault, RecordingSink, PriceBoundSettler> {
        SettlementEngine::new(
            PermissiveAuthorizer,
            LedgerVault::new(),
            RecordingSink::new(),
            PriceBoundSettler,
            PriceAttestationValidator::new(OracleSignerSet::new()),
            OracleConfig::default(),
            EngineConfig::default(),
        )
    }

    #[test]
    fn create_order_escrows_and_emits() {
        let mut engine = permissive_engine();
        let key = engine.create_order(addr(1), order_params(), ctx()).unwrap();

        assert!(engine.requests().get_live(key).is_ok());
        assert_eq!(engine.vault().escrowed_total(addr(2)), U256::from(1_000u64));
        assert_eq!(engine.events().named("order_created").len(), 1);
    }

    #[test]
    fn create_order_rejects_zero_collateral() {
        let mut engine = permissive_engine();
        let mut params = order_params();
        params.initial_collateral_amount = U256::zero();
        let err = engine.create_order(addr(1), params, ctx()).unwrap_err();
        assert!(matches!(err, PerpError::InvalidRequest { .. }));
    }

    #[test]
    fn create_order_rejects_long_swap_path() {
        let mut engine = permissive_engine();
        let mut params = order_params();
        params.swap_path = (0..7).map(|i| addr(100 + i)).collect();
        let err = engine.create_order(addr(1), params, ctx()).unwrap_err();
        assert!(matches!(err, PerpError::SwapPathTooLong { len: 7, max: 5 }));
    }

    #[test]
    fn swap_path_cap_reads_data_store_override() {
        let mut engine = permissive_engine();
        engine
            .set_u256_param(addr(9), keys::max_swap_path_length_key(), U256::from(1u64))
            .unwrap();

        let mut params = order_params();
        params.swap_path = vec![addr(100), addr(101)];
        let err = engine.create_order(addr(1), params, ctx()).unwrap_err();
        assert!(matches!(err, PerpError::SwapPathTooLong { len: 2, max: 1 }));
    }

    #[test]
    fn execution_fee_requires_configured_fee_token() {
        let mut engine = permissive_engine();
        let mut params = order_params();
        params.execution_fee = U256::from(10u64);
        let err = engine.create_order(addr(1), params, ctx()).unwrap_err();
        assert!(matches!(err, PerpError::InvalidRequest { .. }));

        engine
            .set_address_param(addr(9), keys::fee_token_key(), addr(50))
            .unwrap();
        let mut params = order_params();
        params.execution_fee = U256::from(10u64);
        let key = engine.create_order(addr(1), params, ctx()).unwrap();
        assert!(engine.vault().holds(key));
        assert_eq!(engine.vault().escrowed_total(addr(50)), U256::from(10u64));
    }

    #[test]
    fn parameter_writes_are_controller_gated() {
        let mut roles = RoleStore::new();
        roles.grant_role(addr(9), Role::Controller);
        let mut engine = SettlementEngine::new(
            roles,
            LedgerVault::new(),
            RecordingSink::new(),
            PriceBoundSettler,
            PriceAttestationValidator::new(OracleSignerSet::new()),
            OracleConfig::default(),
            EngineConfig::default(),
        );

        let key = keys::max_oracle_price_age_key();
        let err = engine
            .set_u256_param(addr(1), key, U256::from(60u64))
            .unwrap_err();
        assert!(matches!(
            err,
            PerpError::Unauthorized {
                role: Role::Controller,
                ..
            }
        ));

        engine.set_u256_param(addr(9), key, U256::from(60u64)).unwrap();
        assert_eq!(engine.data_store().get_u256(key), Some(U256::from(60u64)));
    }

    #[test]
    fn owner_cancel_refunds_escrow() {
        let mut engine = permissive_engine();
        let key = engine.create_order(addr(1), order_params(), ctx()).unwrap();

        let report = engine.cancel(key, addr(1), ctx()).unwrap();
        assert_eq!(report.state, RequestState::Cancelled);
        assert_eq!(engine.vault().balance(addr(1), addr(2)), U256::from(1_000u64));
        assert!(matches!(
            engine.requests().get(key).unwrap_err(),
            PerpError::RequestNotFound(_)
        ));
    }

    #[test]
    fn third_party_cancel_waits_for_delay() {
        let mut engine = permissive_engine();
        let created = ctx();
        let key = engine.create_order(addr(1), order_params(), created).unwrap();

        let stranger = addr(7);
        let err = engine.cancel(key, stranger, created).unwrap_err();
        assert!(matches!(
            err,
            PerpError::CancellationTooEarly { unlock_block, .. } if unlock_block == created.number + 300
        ));

        let later = created.advanced(300, 2);
        engine.cancel(key, stranger, later).unwrap();
        // Refund goes to the receiver, not the stranger.
        assert_eq!(engine.vault().balance(addr(1), addr(2)), U256::from(1_000u64));
    }

    #[test]
    fn cancelled_key_is_gone() {
        let mut engine = permissive_engine();
        let key = engine.create_order(addr(1), order_params(), ctx()).unwrap();
        engine.cancel(key, addr(1), ctx()).unwrap();

        let err = engine.cancel(key, addr(1), ctx()).unwrap_err();
        assert!(matches!(err, PerpError::RequestNotFound(_)));
    }
}
