//! Trade limits for a swap

use crate::error::EngineResult;
use crate::money::MoneyValue;
use crate::quotes::{CurrencyPair, OrderDirection};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verification tier of the account, which sets the personal ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycTier {
    Tier0,
    Tier1,
    Tier2,
}

/// Limits for one pair and direction, in the source currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeLimits {
    pub minimum: MoneyValue,
    pub maximum: MoneyValue,
    /// Remaining allowance for the account's tier
    pub maximum_personal: Option<MoneyValue>,
    pub tier: KycTier,
}

#[async_trait]
pub trait TradeLimitsProvider: Send + Sync {
    async fn trade_limits(
        &self,
        direction: OrderDirection,
        pair: CurrencyPair,
    ) -> EngineResult<TradeLimits>;
}
