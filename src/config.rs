//! Configuration management for the swap-settlement engine
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::money::{CryptoCurrency, FiatCurrency};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    pub chains: HashMap<String, ChainConfig>,
    pub wallet: WalletConfig,
    pub exchange: ExchangeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Fiat currency shown alongside crypto amounts
    #[serde(default = "default_fiat")]
    pub fiat_currency: FiatCurrency,
    /// Quote refresh period
    #[serde(default = "default_quote_refresh_ms")]
    pub quote_refresh_ms: u64,
    /// Upper bound on a single transaction submission
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub asset: CryptoCurrency,
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    /// Account funds are spent from
    pub source_address: String,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_gas_price_buffer_percent")]
    pub gas_price_buffer_percent: u64,
    #[serde(default = "default_priority_percent")]
    pub priority_percent: u64,
    pub max_gas_price_gwei: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Environment variable holding the hex private key
    pub private_key_env: String,
    /// Hex keccak-256 of the second password, if one is set
    pub second_password_hash: Option<String>,
}

/// Remote exchange service hosting orders, quotes and limits
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_fiat() -> FiatCurrency {
    FiatCurrency::Usd
}

fn default_quote_refresh_ms() -> u64 {
    5_000
}

fn default_send_timeout_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_gas_limit() -> u64 {
    21_000
}

fn default_gas_price_buffer_percent() -> u64 {
    10
}

fn default_priority_percent() -> u64 {
    150
}

impl EngineConfig {
    pub fn quote_refresh(&self) -> Duration {
        Duration::from_millis(self.quote_refresh_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl ExchangeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Settings {
    /// Load settings from the file named by `SWAP_ENGINE_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("SWAP_ENGINE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        Self::parse(&config_str)
    }

    /// Parse and validate a TOML document
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in &self.chains {
            if !chain.enabled {
                continue;
            }
            if chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain {} has no RPC URLs configured", name);
            }
            if chain.source_address.is_empty() {
                anyhow::bail!("Chain {} has no source address", name);
            }
            if chain.gas_limit == 0 {
                anyhow::bail!("Chain {} has a zero gas limit", name);
            }
        }

        if self.exchange.base_url.is_empty() {
            anyhow::bail!("Exchange base URL is empty");
        }
        if self.engine.quote_refresh_ms == 0 {
            anyhow::bail!("Quote refresh interval must be positive");
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled).collect()
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
