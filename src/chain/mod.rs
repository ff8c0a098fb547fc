//! Chain module - ledger access and the Ethereum-family on-chain engine
//!
//! This module provides:
//! - The `ChainClient` collaborator contract (nonce, balance, gas price, submission)
//! - A multi-RPC provider with automatic failover for reads
//! - Key material providers
//! - `EthereumOnChainEngine`, the on-chain realization of the engine contract

pub mod engine;
pub mod keys;
pub mod provider;

pub use engine::{ChainContext, EthereumOnChainEngine};
pub use keys::{EnvKeyPairProvider, KeyPair, KeyPairProvider};
pub use provider::ChainProvider;

use crate::error::EngineResult;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// Read and submission access to one ledger
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Endpoint currently in use, for error reporting
    fn endpoint(&self) -> String;

    /// Next sequencing number for `account`
    async fn nonce(&self, account: Address) -> EngineResult<u64>;

    async fn balance(&self, account: Address) -> EngineResult<U256>;

    /// Current network gas price in wei
    async fn gas_price(&self) -> EngineResult<U256>;

    /// Submit an encoded transaction and return the hash the endpoint reports
    async fn push(&self, raw: Bytes) -> EngineResult<H256>;
}
