//! Trade limits over HTTP

use super::client::ApiClient;
use super::parse_minor;
use crate::error::EngineResult;
use crate::quotes::{CurrencyPair, OrderDirection};
use crate::swap::{KycTier, TradeLimits, TradeLimitsProvider};

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const LIMITS_PATH: &str = "trades/limits";

/// Amounts are minor units of the source currency
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LimitsResponse {
    min_order: String,
    max_order: String,
    max_possible_order: Option<String>,
    tier: KycTier,
}

pub struct HttpTradeLimits {
    api: Arc<ApiClient>,
}

impl HttpTradeLimits {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl TradeLimitsProvider for HttpTradeLimits {
    async fn trade_limits(
        &self,
        direction: OrderDirection,
        pair: CurrencyPair,
    ) -> EngineResult<TradeLimits> {
        let query = [
            ("currency", pair.source.code().to_string()),
            ("product", "SWAP".to_string()),
            ("orderDirection", direction.code().to_string()),
        ];

        let response: LimitsResponse = self.api.get(LIMITS_PATH, &query).await?;

        let endpoint = self.api.url(LIMITS_PATH);
        let maximum_personal = response
            .max_possible_order
            .as_deref()
            .map(|v| parse_minor(&endpoint, "maxPossibleOrder", v, pair.source))
            .transpose()?;

        Ok(TradeLimits {
            minimum: parse_minor(&endpoint, "minOrder", &response.min_order, pair.source)?,
            maximum: parse_minor(&endpoint, "maxOrder", &response.max_order, pair.source)?,
            maximum_personal,
            tier: response.tier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::CryptoCurrency;
    use crate::testing::eth;
    use mockito::Matcher;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fetch_limits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/trades/limits")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("currency".into(), "ETH".into()),
                Matcher::UrlEncoded("product".into(), "SWAP".into()),
                Matcher::UrlEncoded("orderDirection".into(), "ON_CHAIN".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"minOrder": "1000", "maxOrder": "900000", "maxPossibleOrder": "5000", "tier": "TIER1"}"#,
            )
            .create_async()
            .await;

        let provider = HttpTradeLimits::new(Arc::new(
            ApiClient::new(server.url(), None, Duration::from_secs(5)).unwrap(),
        ));
        let limits = provider
            .trade_limits(
                OrderDirection::OnChain,
                CurrencyPair::new(CryptoCurrency::Ethereum, CryptoCurrency::Bitcoin),
            )
            .await
            .unwrap();

        assert_eq!(limits.minimum, eth(1_000));
        assert_eq!(limits.maximum, eth(900_000));
        assert_eq!(limits.maximum_personal, Some(eth(5_000)));
        assert_eq!(limits.tier, KycTier::Tier1);
        mock.assert_async().await;
    }
}
