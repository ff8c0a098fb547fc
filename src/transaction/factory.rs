//! Resolves a user intent to the engine that settles it

use super::engine::{OnChainEngine, TransactionEngine};
use super::pending::TransactionTarget;
use crate::chain::{ChainContext, EthereumOnChainEngine};
use crate::error::{EngineError, EngineResult};
use crate::money::{CryptoCurrency, FiatCurrency};
use crate::quotes::QuotesEngine;
use crate::swap::{OrderClient, SwapTarget, SwapTransactionEngine, TradeLimitsProvider};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionIntent {
    /// Send `asset` to an external address
    Send { asset: CryptoCurrency, to: String },
    /// Sell `source` for the target's asset
    Swap {
        source: CryptoCurrency,
        target: SwapTarget,
    },
}

/// Builds a fresh engine per flow from shared per-asset contexts and the
/// shared swap services
pub struct EngineFactory {
    chains: HashMap<CryptoCurrency, ChainContext>,
    quotes: Arc<QuotesEngine>,
    orders: Arc<dyn OrderClient>,
    limits: Arc<dyn TradeLimitsProvider>,
    fiat: FiatCurrency,
}

impl EngineFactory {
    pub fn new(
        quotes: Arc<QuotesEngine>,
        orders: Arc<dyn OrderClient>,
        limits: Arc<dyn TradeLimitsProvider>,
        fiat: FiatCurrency,
    ) -> Self {
        Self {
            chains: HashMap::new(),
            quotes,
            orders,
            limits,
            fiat,
        }
    }

    pub fn with_chain(mut self, ctx: ChainContext) -> Self {
        self.chains.insert(ctx.asset, ctx);
        self
    }

    pub fn supported_assets(&self) -> Vec<CryptoCurrency> {
        self.chains.keys().copied().collect()
    }

    fn chain_engine(&self, asset: CryptoCurrency) -> EngineResult<EthereumOnChainEngine> {
        let ctx = self
            .chains
            .get(&asset)
            .ok_or_else(|| EngineError::UnsupportedAsset(asset.to_string()))?;
        EthereumOnChainEngine::new(ctx.clone())
    }

    pub fn engine_for(&self, intent: &TransactionIntent) -> EngineResult<Box<dyn TransactionEngine>> {
        debug!("Resolving engine for {:?}", intent);

        match intent {
            TransactionIntent::Send { asset, to } => {
                let target = TransactionTarget::external(*asset, to)?;
                let mut engine = self.chain_engine(*asset)?;
                engine.start(target);
                Ok(Box::new(engine))
            }
            TransactionIntent::Swap { source, target } => {
                if let SwapTarget::NonCustodial {
                    asset,
                    receive_address,
                } = target
                {
                    TransactionTarget::external(*asset, receive_address)?;
                }

                let chain = self.chain_engine(*source)?;
                let engine = SwapTransactionEngine::new(
                    Box::new(chain),
                    target.clone(),
                    self.quotes.clone(),
                    self.orders.clone(),
                    self.limits.clone(),
                    self.fiat,
                )?;
                Ok(Box::new(engine))
            }
        }
    }
}
