//! Swap orders over HTTP

use super::client::ApiClient;
use crate::error::EngineResult;
use crate::quotes::OrderDirection;
use crate::swap::{OrderClient, OrderRequest, OrderState, SwapOrder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody {
    direction: OrderDirection,
    pair: String,
    quote_id: String,
    /// Source amount in minor units
    volume: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refund_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    id: String,
    state: OrderState,
    #[serde(default)]
    kind: OrderKind,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderKind {
    deposit_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum OrderAction {
    DepositSent,
    Fail,
}

#[derive(Debug, Serialize)]
struct UpdateOrderBody {
    action: OrderAction,
}

pub struct HttpOrderClient {
    api: Arc<ApiClient>,
}

impl HttpOrderClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OrderClient for HttpOrderClient {
    async fn create_order(&self, request: OrderRequest) -> EngineResult<SwapOrder> {
        let body = CreateOrderBody {
            direction: request.direction,
            pair: request.pair.to_string(),
            quote_id: request.quote_id,
            volume: request.amount.minor().to_string(),
            destination_address: request.destination_address,
            refund_address: request.refund_address,
        };

        let response: OrderResponse = self.api.post("custodial/trades", &body).await?;
        info!("Order {} created in state {:?}", response.id, response.state);

        Ok(SwapOrder {
            identifier: response.id,
            deposit_address: response.kind.deposit_address,
            state: response.state,
        })
    }

    async fn update_order(&self, identifier: String, success: bool) -> EngineResult<()> {
        let action = if success {
            OrderAction::DepositSent
        } else {
            OrderAction::Fail
        };
        self.api
            .post_ack(
                &format!("custodial/trades/{}", identifier),
                &UpdateOrderBody { action },
            )
            .await
    }
}
