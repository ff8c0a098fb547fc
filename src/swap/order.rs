//! Order lifecycle collaborator

use crate::error::EngineResult;
use crate::money::MoneyValue;
use crate::quotes::{CurrencyPair, OrderDirection};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    PendingDeposit,
    PendingExecution,
    Finished,
    Failed,
    Expired,
    Refunded,
    #[serde(other)]
    Unknown,
}

/// The order service's record of a swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOrder {
    pub identifier: String,
    /// Where the source funds must be sent. Authoritative over the quote's
    /// sample address.
    pub deposit_address: Option<String>,
    pub state: OrderState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub direction: OrderDirection,
    pub pair: CurrencyPair,
    pub amount: MoneyValue,
    pub quote_id: String,
    /// Where the destination funds go; `None` for trading accounts
    pub destination_address: Option<String>,
    pub refund_address: Option<String>,
}

/// Create and settle remote swap orders. Both calls are assumed idempotent
/// server-side.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderClient: Send + Sync {
    async fn create_order(&self, request: OrderRequest) -> EngineResult<SwapOrder>;

    async fn update_order(&self, identifier: String, success: bool) -> EngineResult<()>;
}
