//! Chain provider with multi-RPC support and automatic failover

use super::ChainClient;
use crate::config::ChainConfig;
use crate::error::{EngineError, EngineResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, H256, U256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Multi-provider wrapper with automatic failover
pub struct ChainProvider {
    /// Chain configuration
    config: ChainConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<(String, Provider<Http>)>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider
    pub fn new(config: ChainConfig) -> EngineResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push((url.clone(), provider));
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(EngineError::Config(format!(
                "No valid RPC providers for chain {}",
                config.chain_id
            )));
        }

        info!(
            "Chain provider for {} ready with {} endpoint(s)",
            config.asset,
            http_providers.len()
        );

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    fn active_index(&self) -> usize {
        self.current_provider.load(Ordering::Relaxed) % self.http_providers.len()
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        &self.http_providers[self.active_index()].1
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!(
            "Chain {} failover to provider {}",
            self.config.chain_id, next
        );
    }
}

#[async_trait]
impl ChainClient for ChainProvider {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn endpoint(&self) -> String {
        self.http_providers[self.active_index()].0.clone()
    }

    async fn nonce(&self, account: Address) -> EngineResult<u64> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_transaction_count(account, None).await {
                Ok(nonce) => return nonce_to_u64(&self.endpoint(), nonce),
                Err(e) => {
                    warn!(
                        "Failed to get nonce from chain {}: {}",
                        self.config.chain_id, e
                    );
                    self.failover();
                }
            }
        }

        Err(EngineError::network(
            self.endpoint(),
            "All providers failed to return a nonce",
        ))
    }

    async fn balance(&self, account: Address) -> EngineResult<U256> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_balance(account, None).await {
                Ok(balance) => return Ok(balance),
                Err(e) => {
                    warn!(
                        "Failed to get balance from chain {}: {}",
                        self.config.chain_id, e
                    );
                    self.failover();
                }
            }
        }

        Err(EngineError::network(
            self.endpoint(),
            "All providers failed to return a balance",
        ))
    }

    async fn gas_price(&self) -> EngineResult<U256> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_gas_price().await {
                Ok(price) => return Ok(price),
                Err(e) => {
                    warn!(
                        "Failed to get gas price from chain {}: {}",
                        self.config.chain_id, e
                    );
                    self.failover();
                }
            }
        }

        Err(EngineError::network(
            self.endpoint(),
            "All providers failed to return a gas price",
        ))
    }

    /// Submission goes to the active endpoint only; its error is surfaced as is
    async fn push(&self, raw: Bytes) -> EngineResult<H256> {
        let pending = self
            .http()
            .send_raw_transaction(raw)
            .await
            .map_err(|e| EngineError::network(self.endpoint(), e))?;
        Ok(pending.tx_hash())
    }
}

/// Nodes report nonces as U256
fn nonce_to_u64(endpoint: &str, nonce: U256) -> EngineResult<u64> {
    u64::try_from(nonce)
        .map_err(|_| EngineError::network(endpoint, format!("nonce out of range: {}", nonce)))
}
