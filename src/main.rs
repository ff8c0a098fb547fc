//! swap-settlement - run one send or swap flow from an intent file
//!
//! Loads settings, builds the engines for every enabled chain and drives a
//! single flow: set the amount, confirm, execute.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use swap_settlement::chain::{ChainContext, ChainProvider, EnvKeyPairProvider, KeyPairProvider};
use swap_settlement::config::Settings;
use swap_settlement::money::{CryptoCurrency, FeeLevel, MoneyValue};
use swap_settlement::quotes::QuotesEngine;
use swap_settlement::remote::{ApiClient, HttpOrderClient, HttpQuotesFeed, HttpTradeLimits};
use swap_settlement::swap::SwapTarget;
use swap_settlement::transaction::{EngineFactory, FlowEvent, TransactionFlow, TransactionIntent};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum IntentKind {
    Send,
    Swap,
}

/// What to do, read from the TOML file given on the command line
#[derive(Debug, Deserialize)]
struct IntentFile {
    kind: IntentKind,
    source: CryptoCurrency,
    /// Decimal amount in major units of `source`
    amount: String,
    /// Destination address for sends
    to: Option<String>,
    /// Asset bought by a swap
    target_asset: Option<CryptoCurrency>,
    /// Non-custodial receive address; trading account when absent
    receive_address: Option<String>,
    fee_level: Option<FeeLevel>,
    /// Environment variable holding the second password
    second_password_env: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

impl IntentFile {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read intent file: {:?}", path))?;
        toml::from_str(&raw).with_context(|| "Failed to parse intent file")
    }

    fn intent(&self) -> Result<TransactionIntent> {
        match self.kind {
            IntentKind::Send => {
                let to = self.to.clone().context("Send intent needs `to`")?;
                Ok(TransactionIntent::Send {
                    asset: self.source,
                    to,
                })
            }
            IntentKind::Swap => {
                let asset = self.target_asset.context("Swap intent needs `target_asset`")?;
                let target = match &self.receive_address {
                    Some(address) => SwapTarget::NonCustodial {
                        asset,
                        receive_address: address.clone(),
                    },
                    None => SwapTarget::Trading(asset),
                };
                Ok(TransactionIntent::Swap {
                    source: self.source,
                    target,
                })
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting swap-settlement v{}", env!("CARGO_PKG_VERSION"));

    let intent_path = env::args()
        .nth(1)
        .context("usage: swap-settlement <intent.toml>")?;
    let intent_file = IntentFile::load(Path::new(&intent_path))?;
    let intent = intent_file.intent()?;

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} chains",
        settings.enabled_chains().len()
    );

    let factory = build_factory(&settings)?;
    let engine = factory.engine_for(&intent)?;

    let (mut flow, events) = TransactionFlow::start(engine).await;
    tokio::spawn(log_events(events));

    // Nothing irreversible has happened yet, so a signal can still stop us
    tokio::select! {
        prepared = prepare(&mut flow, &intent_file) => prepared?,
        _ = shutdown_signal() => {
            warn!("Shutdown signal received before execution, stopping");
            return Ok(());
        }
    }

    if intent_file.dry_run {
        info!("Dry run, not executing");
        return Ok(());
    }

    let second_password = intent_file
        .second_password_env
        .as_deref()
        .and_then(|var| env::var(var).ok());
    let result = flow.execute(second_password.as_deref()).await?;

    info!("Done: {:?}", result);
    Ok(())
}

fn build_factory(settings: &Settings) -> Result<EngineFactory> {
    let api = Arc::new(ApiClient::from_config(&settings.exchange)?);
    let quotes = Arc::new(QuotesEngine::new(
        Arc::new(HttpQuotesFeed::new(api.clone())),
        settings.engine.quote_refresh(),
    ));
    let keys: Arc<dyn KeyPairProvider> = Arc::new(EnvKeyPairProvider::new(
        settings.wallet.private_key_env.clone(),
        settings.wallet.second_password_hash.clone(),
    ));

    let mut factory = EngineFactory::new(
        quotes,
        Arc::new(HttpOrderClient::new(api.clone())),
        Arc::new(HttpTradeLimits::new(api)),
        settings.engine.fiat_currency,
    );

    for (name, chain) in settings.enabled_chains() {
        let provider = ChainProvider::new(chain.clone())?;
        let ctx = ChainContext::from_config(
            chain,
            Arc::new(provider),
            keys.clone(),
            settings.engine.fiat_currency,
            settings.engine.send_timeout(),
        )?;
        factory = factory.with_chain(ctx);
        info!("Chain {} ready for {}", name, chain.asset);
    }

    info!("Engines available for {:?}", factory.supported_assets());
    Ok(factory)
}

/// Apply the amount and fee level, then confirm
async fn prepare(flow: &mut TransactionFlow, intent_file: &IntentFile) -> Result<()> {
    if let Some(level) = intent_file.fee_level {
        flow.update_fee_level(level, None).await?;
    }

    let amount = MoneyValue::parse_major(&intent_file.amount, intent_file.source)?;
    flow.update_amount(amount).await?;

    let pending = flow.confirm().await?;
    for line in &pending.confirmations {
        info!("{}", line);
    }

    if !pending.validation_state.can_execute() {
        bail!(
            "Transaction cannot be executed: {:?}",
            pending.validation_state
        );
    }
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<FlowEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => debug!("Flow event: {:?}", event),
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} flow events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,swap_settlement=debug,hyper=warn,reqwest=warn")
    });

    if env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
