//! Swap engine: settles a cross-asset trade by sending the source asset on
//! chain to a deposit address issued by the order service
//!
//! The remote order and the on-chain transfer fail independently. What the
//! caller sees is decided by the transfer; the order outcome is reported
//! afterwards on a best-effort basis.

use super::best_effort::best_effort;
use super::limits::TradeLimitsProvider;
use super::order::{OrderClient, OrderRequest, SwapOrder};
use crate::error::{EngineError, EngineResult};
use crate::money::{CryptoCurrency, FeeLevel, FiatCurrency, MoneyValue};
use crate::quotes::{CurrencyPair, OrderDirection, PricedQuote, QuotesEngine};
use crate::transaction::rules;
use crate::transaction::{
    Confirmation, OnChainEngine, PendingTransaction, TransactionEngine, TransactionResult,
    TransactionTarget,
};

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the bought asset ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapTarget {
    /// The user's custodial trading account
    Trading(CryptoCurrency),
    /// A non-custodial wallet address
    NonCustodial {
        asset: CryptoCurrency,
        receive_address: String,
    },
}

impl SwapTarget {
    pub fn asset(&self) -> CryptoCurrency {
        match self {
            SwapTarget::Trading(asset) => *asset,
            SwapTarget::NonCustodial { asset, .. } => *asset,
        }
    }

    pub fn direction(&self) -> OrderDirection {
        match self {
            SwapTarget::Trading(_) => OrderDirection::FromUserKey,
            SwapTarget::NonCustodial { .. } => OrderDirection::OnChain,
        }
    }

    fn receive_address(&self) -> Option<String> {
        match self {
            SwapTarget::Trading(_) => None,
            SwapTarget::NonCustodial {
                receive_address, ..
            } => Some(receive_address.clone()),
        }
    }

    fn label(&self) -> String {
        match self {
            SwapTarget::Trading(asset) => format!("{} Trading Account", asset),
            SwapTarget::NonCustodial {
                receive_address, ..
            } => receive_address.clone(),
        }
    }
}

pub struct SwapTransactionEngine {
    /// Engine for the source asset
    chain: Box<dyn OnChainEngine>,
    quotes: Arc<QuotesEngine>,
    orders: Arc<dyn OrderClient>,
    limits: Arc<dyn TradeLimitsProvider>,
    target: SwapTarget,
    pair: CurrencyPair,
    fiat: FiatCurrency,
    /// Quote last shown to the user; orders are placed against it
    last_quote: Option<PricedQuote>,
}

impl SwapTransactionEngine {
    pub fn new(
        chain: Box<dyn OnChainEngine>,
        target: SwapTarget,
        quotes: Arc<QuotesEngine>,
        orders: Arc<dyn OrderClient>,
        limits: Arc<dyn TradeLimitsProvider>,
        fiat: FiatCurrency,
    ) -> EngineResult<Self> {
        let pair = CurrencyPair::new(chain.source_asset(), target.asset());
        if pair.source == pair.destination {
            return Err(EngineError::Validation(format!(
                "cannot swap {} for itself",
                pair.source
            )));
        }

        Ok(Self {
            chain,
            quotes,
            orders,
            limits,
            target,
            pair,
            fiat,
            last_quote: None,
        })
    }

    fn direction(&self) -> OrderDirection {
        self.target.direction()
    }

    /// Zero transaction handed out when initialization fails
    fn fallback(&self) -> PendingTransaction {
        PendingTransaction::zero(self.pair.source, FeeLevel::None, self.fiat)
    }

    async fn try_initialize(&mut self) -> EngineResult<PendingTransaction> {
        let quote = self.quotes.first_quote(self.direction(), self.pair).await?;

        let sample = TransactionTarget::external(self.pair.source, &quote.sample_deposit_address)?;
        self.chain.start(sample);

        let pending = self.chain.initialize_transaction().await;
        let pending = self
            .chain
            .update_fee_level(pending, FeeLevel::Priority, None)
            .await?;
        let pending = self.update_limits(pending, &quote).await?;

        debug!("Swap {} initialized with quote {}", self.pair, quote.identifier);
        self.last_quote = Some(quote);
        Ok(pending)
    }

    /// Load trade limits, raising the minimum so the trade covers the
    /// destination network fee
    async fn update_limits(
        &self,
        pending: PendingTransaction,
        quote: &PricedQuote,
    ) -> EngineResult<PendingTransaction> {
        let limits = self.limits.trade_limits(self.direction(), self.pair).await?;
        debug!(
            "Trade limits for {} at {:?}: {} to {}",
            self.pair, limits.tier, limits.minimum, limits.maximum
        );
        limits.minimum.ensure_currency(self.pair.source)?;
        limits.maximum.ensure_currency(self.pair.source)?;

        let fee_floor = quote
            .network_fee
            .convert_back(&quote.rate, self.pair.source)?;
        let minimum = match limits.minimum.try_cmp(&fee_floor)? {
            Ordering::Less => fee_floor,
            _ => limits.minimum,
        };

        let mut pending = pending;
        pending.minimum_limit = Some(minimum);
        pending.maximum_limit = Some(limits.maximum);
        pending.maximum_personal_limit = limits.maximum_personal;
        Ok(pending)
    }

    /// Run the limit rules unless the chain engine already recorded a more
    /// specific failure
    fn apply_limit_rules(&self, pending: PendingTransaction) -> EngineResult<PendingTransaction> {
        let mut pending = pending;
        if rules::defers_to_default_rules(&pending.validation_state) {
            let verdict = rules::validate_limits(&pending)?;
            pending.validation_state = rules::tighten(pending.validation_state, verdict);
        }
        Ok(pending)
    }

    async fn current_quote(&self) -> EngineResult<PricedQuote> {
        match self.quotes.first_quote(self.direction(), self.pair).await {
            Ok(quote) => Ok(quote),
            Err(e) => match &self.last_quote {
                Some(quote) => {
                    warn!("Quote refresh for {} failed, using last quote: {}", self.pair, e);
                    Ok(quote.clone())
                }
                None => Err(e),
            },
        }
    }

    /// Everything after the order exists: re-target at the order's deposit
    /// address and send
    async fn settle(
        &mut self,
        order: &SwapOrder,
        pending: PendingTransaction,
        second_password: Option<&str>,
    ) -> EngineResult<TransactionResult> {
        let deposit_address = order.deposit_address.as_deref().ok_or_else(|| {
            EngineError::IllegalState(format!(
                "order {} has no deposit address",
                order.identifier
            ))
        })?;

        let deposit = TransactionTarget::external(self.pair.source, deposit_address)?
            .with_label(format!("Swap order {}", order.identifier));
        let pending = self.chain.restart(deposit, pending).await?;
        self.chain.execute(pending, second_password).await
    }
}

#[async_trait]
impl TransactionEngine for SwapTransactionEngine {
    fn source_asset(&self) -> CryptoCurrency {
        self.pair.source
    }

    async fn initialize_transaction(&mut self) -> PendingTransaction {
        match self.try_initialize().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Initializing swap {} failed, using empty one: {}", self.pair, e);
                self.fallback()
            }
        }
    }

    async fn update(
        &mut self,
        amount: MoneyValue,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        amount.ensure_currency(self.pair.source)?;

        let mut pending = self.chain.update(amount, pending).await?;
        self.quotes
            .update_amount(self.direction(), self.pair, pending.amount);
        pending.confirmations.clear();
        Ok(pending)
    }

    async fn update_fee_level(
        &mut self,
        pending: PendingTransaction,
        level: FeeLevel,
        custom_fee: Option<MoneyValue>,
    ) -> EngineResult<PendingTransaction> {
        if level != FeeLevel::Priority {
            return Err(EngineError::Validation(format!(
                "swaps only use the priority fee level, not {}",
                level
            )));
        }
        self.chain.update_fee_level(pending, level, custom_fee).await
    }

    async fn validate_amount(
        &self,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        let pending = self.chain.validate_amount(pending).await?;
        self.apply_limit_rules(pending)
    }

    async fn do_validate_all(
        &self,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        let pending = self.chain.do_validate_all(pending).await?;
        self.apply_limit_rules(pending)
    }

    async fn build_confirmations(
        &mut self,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        let quote = self.current_quote().await?;
        let receive = pending
            .amount
            .convert(&quote.rate)?
            .saturating_sub(&quote.network_fee)?;

        let mut pending = pending;
        pending.confirmations = vec![
            Confirmation::Source(self.chain.source_address()),
            Confirmation::ExchangeRate {
                source: self.pair.source,
                rate: quote.rate,
            },
            Confirmation::Amount(pending.amount),
            Confirmation::ReceiveAmount(receive),
            Confirmation::NetworkFee {
                fee_level: pending.fee_level,
                fee: pending.fees,
            },
            Confirmation::Destination(self.target.label()),
            Confirmation::QuoteExpiry(quote.expires_at),
        ];
        self.last_quote = Some(quote);
        Ok(pending)
    }

    async fn execute(
        &mut self,
        pending: PendingTransaction,
        second_password: Option<&str>,
    ) -> EngineResult<TransactionResult> {
        let quote = self
            .last_quote
            .as_ref()
            .ok_or_else(|| EngineError::IllegalState("swap was never priced".to_string()))?;
        if quote.is_expired(Utc::now()) {
            return Err(EngineError::Validation(format!(
                "quote {} expired at {}, confirm again",
                quote.identifier, quote.expires_at
            )));
        }
        let quote_id = quote.identifier.clone();

        let request = OrderRequest {
            direction: self.direction(),
            pair: self.pair,
            amount: pending.amount,
            quote_id,
            destination_address: self.target.receive_address(),
            refund_address: Some(self.chain.source_address()),
        };

        let order = self.orders.create_order(request).await?;
        info!(
            "Created swap order {} for {} {}",
            order.identifier, pending.amount, self.pair
        );

        let outcome = self.settle(&order, pending, second_password).await;
        if let Err(e) = &outcome {
            warn!("Swap order {} failed to settle: {}", order.identifier, e);
        }

        best_effort(
            &format!("Reporting outcome of swap order {}", order.identifier),
            self.orders
                .update_order(order.identifier.clone(), outcome.is_ok()),
        )
        .await;

        outcome
    }
}
