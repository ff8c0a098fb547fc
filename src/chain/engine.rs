//! On-chain engine for native Ether transfers

use super::{ChainClient, KeyPairProvider};
use crate::config::ChainConfig;
use crate::error::{EngineError, EngineResult};
use crate::money::{CryptoCurrency, FeeLevel, FiatCurrency, MoneyError, MoneyValue};
use crate::transaction::rules;
use crate::transaction::{
    Confirmation, OnChainEngine, PendingTransaction, TransactionEngine, TransactionResult,
    TransactionTarget, ValidationState,
};
use crate::tx::{GasEstimator, NonceManager, TransactionCandidate, TransactionSender};

use async_trait::async_trait;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything an on-chain engine for one asset needs. Shared by every engine
/// the factory hands out for that asset.
#[derive(Clone)]
pub struct ChainContext {
    pub asset: CryptoCurrency,
    pub client: Arc<dyn ChainClient>,
    pub keys: Arc<dyn KeyPairProvider>,
    pub nonces: Arc<NonceManager>,
    pub gas: GasEstimator,
    /// Account funds are spent from
    pub source: Address,
    pub source_label: String,
    pub fiat: FiatCurrency,
    pub send_timeout: Duration,
}

impl ChainContext {
    pub fn from_config(
        config: &ChainConfig,
        client: Arc<dyn ChainClient>,
        keys: Arc<dyn KeyPairProvider>,
        fiat: FiatCurrency,
        send_timeout: Duration,
    ) -> EngineResult<Self> {
        let source: Address = config.source_address.parse().map_err(|_| {
            EngineError::Config(format!(
                "Invalid source address for {}: {}",
                config.asset, config.source_address
            ))
        })?;

        Ok(Self {
            asset: config.asset,
            client,
            keys,
            nonces: Arc::new(NonceManager::new()),
            gas: GasEstimator::from_config(config),
            source,
            source_label: format!("{} account", config.asset),
            fiat,
            send_timeout,
        })
    }
}

/// Transaction engine that settles plain value transfers on an
/// Ethereum-family ledger
pub struct EthereumOnChainEngine {
    ctx: ChainContext,
    sender: TransactionSender,
    target: Option<TransactionTarget>,
}

impl EthereumOnChainEngine {
    pub fn new(ctx: ChainContext) -> EngineResult<Self> {
        if ctx.asset != CryptoCurrency::Ethereum {
            return Err(EngineError::UnsupportedAsset(format!(
                "{} has no on-chain engine",
                ctx.asset
            )));
        }

        let sender =
            TransactionSender::new(ctx.client.clone(), ctx.nonces.clone(), ctx.send_timeout);
        Ok(Self {
            ctx,
            sender,
            target: None,
        })
    }

    pub fn target(&self) -> Option<&TransactionTarget> {
        self.target.as_ref()
    }

    fn to_wei(&self, value: &MoneyValue) -> EngineResult<U256> {
        value.ensure_currency(self.ctx.asset)?;
        Ok(U256::from(value.minor()))
    }

    fn from_wei(&self, wei: U256) -> EngineResult<MoneyValue> {
        let minor = u128::try_from(wei).map_err(|_| MoneyError::Overflow(self.ctx.asset.into()))?;
        Ok(MoneyValue::from_minor(minor, self.ctx.asset))
    }

    /// Gas price and total fee for a fee level. Only asks the node when the
    /// level depends on the network price.
    async fn resolve_fee(
        &self,
        level: FeeLevel,
        custom: Option<&MoneyValue>,
    ) -> EngineResult<(U256, U256)> {
        let network_price = match level {
            FeeLevel::Regular | FeeLevel::Priority => self.ctx.client.gas_price().await?,
            FeeLevel::None | FeeLevel::Custom => U256::zero(),
        };
        let custom = custom.map(|c| self.to_wei(c)).transpose()?;

        let gas_price = self.ctx.gas.gas_price_for(level, network_price, custom)?;
        let fee = GasEstimator::calculate_cost(self.ctx.gas.gas_limit(), gas_price);
        Ok((gas_price, fee))
    }

    fn confirmations_for(
        &self,
        pending: &PendingTransaction,
        target: &TransactionTarget,
    ) -> EngineResult<Vec<Confirmation>> {
        Ok(vec![
            Confirmation::Source(self.ctx.source_label.clone()),
            Confirmation::Destination(target.label().to_string()),
            Confirmation::Amount(pending.amount),
            Confirmation::NetworkFee {
                fee_level: pending.fee_level,
                fee: pending.fees,
            },
            Confirmation::Total(pending.amount.checked_add(&pending.fees)?),
        ])
    }

    fn fee_unavailable(pending: &PendingTransaction) -> bool {
        match pending.fee_level {
            FeeLevel::None => true,
            FeeLevel::Custom => pending.custom_fee_amount.is_none(),
            FeeLevel::Regular | FeeLevel::Priority => false,
        }
    }
}

#[async_trait]
impl TransactionEngine for EthereumOnChainEngine {
    fn source_asset(&self) -> CryptoCurrency {
        self.ctx.asset
    }

    async fn initialize_transaction(&mut self) -> PendingTransaction {
        let asset = self.ctx.asset;
        let start = PendingTransaction::zero(asset, FeeLevel::Regular, self.ctx.fiat);

        match self.update(MoneyValue::zero(asset), start).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Initializing {} transaction failed, using empty one: {}", asset, e);
                PendingTransaction::zero(asset, FeeLevel::None, self.ctx.fiat)
            }
        }
    }

    async fn update(
        &mut self,
        amount: MoneyValue,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        amount.ensure_currency(self.ctx.asset)?;

        let (balance, (_, fee)) = futures::try_join!(
            self.ctx.client.balance(self.ctx.source),
            self.resolve_fee(pending.fee_level, pending.custom_fee_amount.as_ref())
        )?;
        let balance = self.from_wei(balance)?;
        let fees = self.from_wei(fee)?;

        let mut pending = pending;
        if pending.amount != amount {
            pending.validation_state = ValidationState::Uninitialized;
        }
        pending.amount = amount;
        pending.fees = fees;
        pending.available = balance.saturating_sub(&fees)?;
        pending.confirmations = match &self.target {
            Some(target) => self.confirmations_for(&pending, target)?,
            None => Vec::new(),
        };

        debug!(
            "Updated {} transaction: amount {}, available {}, fees {}",
            self.ctx.asset, pending.amount, pending.available, pending.fees
        );
        Ok(pending)
    }

    async fn update_fee_level(
        &mut self,
        pending: PendingTransaction,
        level: FeeLevel,
        custom_fee: Option<MoneyValue>,
    ) -> EngineResult<PendingTransaction> {
        let mut pending = pending;
        pending.custom_fee_amount = match level {
            FeeLevel::Custom => {
                let fee = custom_fee.ok_or_else(|| {
                    EngineError::Validation("custom fee level requires a fee rate".to_string())
                })?;
                fee.ensure_currency(self.ctx.asset)?;
                Some(fee)
            }
            _ => None,
        };
        pending.fee_level = level;
        pending.validation_state = ValidationState::Uninitialized;

        let amount = pending.amount;
        self.update(amount, pending).await
    }

    async fn validate_amount(
        &self,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        let mut pending = pending;
        pending.validation_state = rules::validate_balance(&pending)?;
        Ok(pending)
    }

    async fn do_validate_all(
        &self,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        let mut pending = self.validate_amount(pending).await?;
        if !pending.validation_state.can_execute() {
            return Ok(pending);
        }

        let verdict = if self.target.is_none() {
            ValidationState::InvalidAddress
        } else if Self::fee_unavailable(&pending) {
            ValidationState::FeeUnavailable
        } else if pending.confirmations.is_empty() {
            ValidationState::ConfirmationsMissing
        } else {
            ValidationState::CanExecute
        };
        pending.validation_state = rules::tighten(pending.validation_state, verdict);
        Ok(pending)
    }

    async fn build_confirmations(
        &mut self,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| EngineError::IllegalState("engine has no target".to_string()))?;

        let mut pending = pending;
        pending.confirmations = self.confirmations_for(&pending, target)?;
        Ok(pending)
    }

    async fn execute(
        &mut self,
        pending: PendingTransaction,
        second_password: Option<&str>,
    ) -> EngineResult<TransactionResult> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| EngineError::IllegalState("engine has no target".to_string()))?;
        if Self::fee_unavailable(&pending) {
            return Err(EngineError::Validation(format!(
                "no fee available at the {} fee level",
                pending.fee_level
            )));
        }

        let key_pair = self.ctx.keys.key_pair(second_password).await?;
        let (gas_price, _) = self
            .resolve_fee(pending.fee_level, pending.custom_fee_amount.as_ref())
            .await?;

        let candidate = TransactionCandidate {
            from: self.ctx.source,
            to: target.address().to_string(),
            value: self.to_wei(&pending.amount)?,
            gas_price,
            gas_limit: self.ctx.gas.gas_limit(),
        };

        let published = self.sender.send(candidate, &key_pair).await?;
        info!(
            "Sent {} to {}: {:?}",
            pending.amount,
            target.address(),
            published.tx_hash()
        );

        Ok(TransactionResult::Hashed {
            tx_hash: format!("{:?}", published.tx_hash()),
            amount: pending.amount,
        })
    }
}

#[async_trait]
impl OnChainEngine for EthereumOnChainEngine {
    fn source_address(&self) -> String {
        to_checksum(&self.ctx.source, None)
    }

    fn start(&mut self, target: TransactionTarget) {
        debug!("{} engine targeting {}", self.ctx.asset, target.address());
        self.target = Some(target);
    }

    async fn restart(
        &mut self,
        target: TransactionTarget,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction> {
        if target.asset() != self.ctx.asset {
            return Err(EngineError::Validation(format!(
                "cannot send {} to a {} address",
                self.ctx.asset,
                target.asset()
            )));
        }

        self.start(target);
        let mut pending = pending;
        pending.validation_state = ValidationState::Uninitialized;
        let amount = pending.amount;
        self.update(amount, pending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        eth, test_address, test_key_pair, FakeChainClient, StaticKeys, OTHER_ADDRESS,
    };

    fn context(client: Arc<FakeChainClient>, keys: StaticKeys) -> ChainContext {
        ChainContext {
            asset: CryptoCurrency::Ethereum,
            client,
            keys: Arc::new(keys),
            nonces: Arc::new(NonceManager::new()),
            // Gas limit 1 and node price 1: regular costs 1 wei, priority 2
            gas: GasEstimator::new(1, 0, 200, 500),
            source: test_address(),
            source_label: "My Ether Wallet".to_string(),
            fiat: FiatCurrency::Usd,
            send_timeout: Duration::from_secs(5),
        }
    }

    fn engine(balance: u64) -> (EthereumOnChainEngine, Arc<FakeChainClient>) {
        let client = Arc::new(FakeChainClient::new(balance, 1));
        let engine =
            EthereumOnChainEngine::new(context(client.clone(), StaticKeys::new(test_key_pair())))
                .unwrap();
        (engine, client)
    }

    fn target() -> TransactionTarget {
        TransactionTarget::external(CryptoCurrency::Ethereum, OTHER_ADDRESS).unwrap()
    }

    #[tokio::test]
    async fn test_priority_fee_balance_scenario() {
        let (mut engine, _) = engine(100);
        let pending = engine.initialize_transaction().await;
        let pending = engine
            .update_fee_level(pending, FeeLevel::Priority, None)
            .await
            .unwrap();
        assert_eq!(pending.fees, eth(2));
        assert_eq!(pending.available, eth(98));

        let pending = engine.update(eth(99), pending).await.unwrap();
        let pending = engine.validate_amount(pending).await.unwrap();
        assert_eq!(pending.validation_state, ValidationState::InsufficientFunds);

        let pending = engine.update(eth(50), pending).await.unwrap();
        assert_eq!(pending.validation_state, ValidationState::Uninitialized);
        let pending = engine.validate_amount(pending).await.unwrap();
        assert_eq!(pending.validation_state, ValidationState::CanExecute);

        let pending = engine.update(eth(98), pending).await.unwrap();
        let pending = engine.validate_amount(pending).await.unwrap();
        assert_eq!(pending.validation_state, ValidationState::CanExecute);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let (mut engine, _) = engine(1_000);
        engine.start(target());
        let pending = engine.initialize_transaction().await;

        let once = engine.update(eth(40), pending).await.unwrap();
        let twice = engine.update(eth(40), once.clone()).await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.confirmations.len(), 5);
    }

    #[tokio::test]
    async fn test_initialize_falls_back_when_fee_unavailable() {
        let (mut engine, client) = engine(100);
        client.drop_gas_price();

        let pending = engine.initialize_transaction().await;
        assert_eq!(
            pending,
            PendingTransaction::zero(CryptoCurrency::Ethereum, FeeLevel::None, FiatCurrency::Usd)
        );
    }

    #[tokio::test]
    async fn test_validate_all_preconditions() {
        let (mut engine, _) = engine(100);
        let pending = engine.initialize_transaction().await;
        let pending = engine.update(eth(10), pending).await.unwrap();

        let checked = engine.do_validate_all(pending.clone()).await.unwrap();
        assert_eq!(checked.validation_state, ValidationState::InvalidAddress);

        engine.start(target());
        let mut bare = pending.clone();
        bare.confirmations.clear();
        let checked = engine.do_validate_all(bare).await.unwrap();
        assert_eq!(checked.validation_state, ValidationState::ConfirmationsMissing);

        let confirmed = engine.build_confirmations(pending).await.unwrap();
        let checked = engine.do_validate_all(confirmed).await.unwrap();
        assert_eq!(checked.validation_state, ValidationState::CanExecute);
    }

    #[tokio::test]
    async fn test_confirmation_lines() {
        let (mut engine, _) = engine(100);
        engine.start(target());
        let pending = engine.initialize_transaction().await;
        let pending = engine.update(eth(10), pending).await.unwrap();

        assert_eq!(
            pending.confirmations,
            vec![
                Confirmation::Source("My Ether Wallet".to_string()),
                Confirmation::Destination(OTHER_ADDRESS.to_string()),
                Confirmation::Amount(eth(10)),
                Confirmation::NetworkFee {
                    fee_level: FeeLevel::Regular,
                    fee: eth(1),
                },
                Confirmation::Total(eth(11)),
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_fee_level_needs_rate() {
        let (mut engine, _) = engine(100);
        let pending = engine.initialize_transaction().await;

        let err = engine
            .update_fee_level(pending.clone(), FeeLevel::Custom, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let pending = engine
            .update_fee_level(pending, FeeLevel::Custom, Some(eth(3)))
            .await
            .unwrap();
        assert_eq!(pending.fees, eth(3));
    }

    #[tokio::test]
    async fn test_execute_publishes_transfer() {
        let (mut engine, client) = engine(100_000);
        engine.start(target());
        let pending = engine.initialize_transaction().await;
        let pending = engine.update(eth(50), pending).await.unwrap();

        let result = engine.execute(pending, None).await.unwrap();

        let TransactionResult::Hashed { tx_hash, amount } = result;
        assert!(tx_hash.starts_with("0x"));
        assert_eq!(amount, eth(50));
        assert_eq!(client.pushes().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_requires_second_password() {
        let client = Arc::new(FakeChainClient::new(100_000, 1));
        let keys = StaticKeys::new(test_key_pair()).with_second_password("hunter2");
        let mut engine = EthereumOnChainEngine::new(context(client.clone(), keys)).unwrap();
        engine.start(target());
        let pending = engine.initialize_transaction().await;
        let pending = engine.update(eth(50), pending).await.unwrap();

        let err = engine.execute(pending.clone(), None).await.unwrap_err();
        assert!(err.requires_reauthentication());
        assert!(client.pushes().is_empty());

        engine.execute(pending, Some("hunter2")).await.unwrap();
        assert_eq!(client.pushes().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_rejects_other_asset() {
        let (mut engine, _) = engine(100);
        let pending = engine.initialize_transaction().await;
        let btc_target = TransactionTarget::external(
            CryptoCurrency::Bitcoin,
            "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
        )
        .unwrap();

        assert!(engine.restart(btc_target, pending).await.is_err());
        assert!(engine.target().is_none());
    }

    #[tokio::test]
    async fn test_execute_refuses_without_fee() {
        let (mut engine, client) = engine(100_000);
        client.drop_gas_price();
        engine.start(target());
        let pending = engine.initialize_transaction().await;
        assert_eq!(pending.fee_level, FeeLevel::None);

        let pending = engine.update(eth(50), pending).await.unwrap();
        assert_eq!(pending.fees, eth(0));

        let err = engine.execute(pending, None).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(client.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_restart_clears_validation_state() {
        let (mut engine, _) = engine(100);
        engine.start(target());
        let pending = engine.initialize_transaction().await;
        let pending = engine.update(eth(100), pending).await.unwrap();
        let pending = engine.validate_amount(pending).await.unwrap();
        assert_eq!(pending.validation_state, ValidationState::InsufficientFunds);

        let pending = engine.restart(target(), pending).await.unwrap();
        assert_eq!(pending.validation_state, ValidationState::Uninitialized);
        assert_eq!(pending.amount, eth(100));
    }
}
