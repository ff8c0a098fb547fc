//! Priced quotes for cross-asset swaps

mod engine;

pub use engine::{QuoteStream, QuotesEngine};

use crate::error::EngineResult;
use crate::money::{CryptoCurrency, MoneyValue};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the funds of a swap come from and go to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDirection {
    /// Non-custodial source to non-custodial destination
    OnChain,
    /// Non-custodial source to a trading account
    FromUserKey,
    /// Trading account to a non-custodial destination
    ToUserKey,
    /// Trading account to trading account
    Internal,
}

impl OrderDirection {
    /// Wire name, as used in query strings
    pub fn code(&self) -> &'static str {
        match self {
            OrderDirection::OnChain => "ON_CHAIN",
            OrderDirection::FromUserKey => "FROM_USER_KEY",
            OrderDirection::ToUserKey => "TO_USER_KEY",
            OrderDirection::Internal => "INTERNAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub source: CryptoCurrency,
    pub destination: CryptoCurrency,
}

impl CurrencyPair {
    pub fn new(source: CryptoCurrency, destination: CryptoCurrency) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.destination)
    }
}

/// Immutable quote snapshot; replaced, never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedQuote {
    pub identifier: String,
    pub direction: OrderDirection,
    pub pair: CurrencyPair,
    /// Destination minor units bought by one major unit of the source
    pub rate: MoneyValue,
    /// Fee charged on the destination side
    pub network_fee: MoneyValue,
    /// Address to route source funds to until an order names the real one
    pub sample_deposit_address: String,
    pub expires_at: DateTime<Utc>,
}

impl PricedQuote {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Remote quote source. `amount` lets the service price the actual trade size.
#[async_trait]
pub trait QuotesFeed: Send + Sync {
    async fn fetch_quote(
        &self,
        direction: OrderDirection,
        pair: CurrencyPair,
        amount: Option<MoneyValue>,
    ) -> EngineResult<PricedQuote>;
}
