//! JSON-over-HTTP client for the exchange service

use crate::config::ExchangeConfig;
use crate::error::{EngineError, EngineResult};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Exchange API client shared by the order, quote and limits collaborators
pub struct ApiClient {
    http_client: HttpClient,
    api_token: Option<String>,
    base_url: String,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> EngineResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_token: api_token.filter(|t| !t.is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ExchangeConfig) -> EngineResult<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Create default headers with authorization
    fn create_headers(&self) -> EngineResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.api_token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| EngineError::Config(format!("Failed to create auth header: {}", e)))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(headers)
    }

    fn request_error(url: &str, e: reqwest::Error) -> EngineError {
        if e.is_timeout() {
            EngineError::Timeout {
                operation: url.to_string(),
            }
        } else {
            EngineError::network(url, format!("Request failed: {}", e))
        }
    }

    /// Turn a non-2xx response into a network error carrying status and body
    async fn check(url: &str, response: reqwest::Response) -> EngineResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body_text = response.text().await.unwrap_or_default();
        warn!("{} returned {}: {}", url, status, body_text);
        Err(EngineError::network(url, format!("{}: {}", status, body_text)))
    }

    async fn decode<R: DeserializeOwned>(url: &str, response: reqwest::Response) -> EngineResult<R> {
        response
            .json::<R>()
            .await
            .map_err(|e| EngineError::network(url, format!("Invalid response body: {}", e)))
    }

    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> EngineResult<R> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .headers(self.create_headers()?)
            .query(query)
            .send()
            .await
            .map_err(|e| Self::request_error(&url, e))?;

        let response = Self::check(&url, response).await?;
        Self::decode(&url, response).await
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> EngineResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send_post(path, body).await?;
        Self::decode(&self.url(path), response).await
    }

    /// POST whose response body is ignored
    pub async fn post_ack<B>(&self, path: &str, body: &B) -> EngineResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.send_post(path, body).await.map(|_| ())
    }

    async fn send_post<B>(&self, path: &str, body: &B) -> EngineResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.create_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| Self::request_error(&url, e))?;

        Self::check(&url, response).await
    }
}
