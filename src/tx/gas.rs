//! Fee resolution: maps a fee level onto a concrete gas price

use crate::config::ChainConfig;
use crate::error::{EngineError, EngineResult};
use crate::money::FeeLevel;

use ethers::types::U256;
use tracing::debug;

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Gas estimator for plain value transfers
#[derive(Debug, Clone)]
pub struct GasEstimator {
    /// Gas limit applied to every transfer
    gas_limit: U256,
    /// Buffer percentage added to the node's gas price (e.g., 10 = 10% buffer)
    gas_price_buffer_percent: u64,
    /// Priority price as a percentage of the regular price (e.g., 150)
    priority_percent: u64,
    /// Hard ceiling for resolved prices
    max_gas_price: U256,
}

impl GasEstimator {
    pub fn new(
        gas_limit: u64,
        gas_price_buffer_percent: u64,
        priority_percent: u64,
        max_gas_price_gwei: u64,
    ) -> Self {
        Self {
            gas_limit: U256::from(gas_limit),
            gas_price_buffer_percent,
            priority_percent,
            max_gas_price: U256::from(max_gas_price_gwei) * U256::from(WEI_PER_GWEI),
        }
    }

    pub fn from_config(config: &ChainConfig) -> Self {
        Self::new(
            config.gas_limit,
            config.gas_price_buffer_percent,
            config.priority_percent,
            config.max_gas_price_gwei,
        )
    }

    pub fn gas_limit(&self) -> U256 {
        self.gas_limit
    }

    /// Resolve a fee level to a gas price given the node's current price
    pub fn gas_price_for(
        &self,
        level: FeeLevel,
        network_price: U256,
        custom: Option<U256>,
    ) -> EngineResult<U256> {
        let buffer =
            network_price.saturating_mul(U256::from(self.gas_price_buffer_percent)) / 100;
        let regular = network_price.saturating_add(buffer);

        let price = match level {
            FeeLevel::None => U256::zero(),
            FeeLevel::Regular => std::cmp::min(regular, self.max_gas_price),
            FeeLevel::Priority => std::cmp::min(
                regular.saturating_mul(U256::from(self.priority_percent)) / 100,
                self.max_gas_price,
            ),
            FeeLevel::Custom => custom.ok_or_else(|| {
                EngineError::Validation("custom fee level requires an explicit fee".to_string())
            })?,
        };

        debug!("Gas price for {} fee level: {}", level, price);
        Ok(price)
    }

    /// Calculate total cost in wei
    pub fn calculate_cost(gas_limit: U256, gas_price: U256) -> U256 {
        gas_limit.saturating_mul(gas_price)
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(21_000, 10, 150, 500)
    }
}
