//! Quotes over HTTP

use super::client::ApiClient;
use super::parse_minor;
use crate::error::EngineResult;
use crate::money::MoneyValue;
use crate::quotes::{CurrencyPair, OrderDirection, PricedQuote, QuotesFeed};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const QUOTE_PATH: &str = "custodial/quote";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteBody {
    pair: String,
    direction: OrderDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    id: String,
    /// Destination minor units per one source major unit
    price: String,
    network_fee: String,
    sample_deposit_address: String,
    expires_at: DateTime<Utc>,
}

pub struct HttpQuotesFeed {
    api: Arc<ApiClient>,
}

impl HttpQuotesFeed {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl QuotesFeed for HttpQuotesFeed {
    async fn fetch_quote(
        &self,
        direction: OrderDirection,
        pair: CurrencyPair,
        amount: Option<MoneyValue>,
    ) -> EngineResult<PricedQuote> {
        let body = QuoteBody {
            pair: pair.to_string(),
            direction,
            volume: amount.map(|a| a.minor().to_string()),
        };
        let response: QuoteResponse = self.api.post(QUOTE_PATH, &body).await?;

        let endpoint = self.api.url(QUOTE_PATH);
        Ok(PricedQuote {
            identifier: response.id,
            direction,
            pair,
            rate: parse_minor(&endpoint, "price", &response.price, pair.destination)?,
            network_fee: parse_minor(
                &endpoint,
                "networkFee",
                &response.network_fee,
                pair.destination,
            )?,
            sample_deposit_address: response.sample_deposit_address,
            expires_at: response.expires_at,
        })
    }
}
