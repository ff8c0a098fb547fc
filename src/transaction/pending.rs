//! The work-in-progress record threaded through every engine call

use crate::error::{BuildError, EngineResult};
use crate::money::{ChainFamily, CryptoCurrency, FeeLevel, FiatCurrency, MoneyValue};

use chrono::{DateTime, Utc};
use ethers::types::Address;
use std::fmt;

/// Result of the latest validation pass. Anything other than `CanExecute`
/// holds until the amount or the target changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationState {
    Uninitialized,
    CanExecute,
    InvalidAmount,
    InsufficientFunds,
    BelowMinimumLimit,
    AboveMaximumLimit,
    OverMaximumPersonalLimit,
    InvalidAddress,
    FeeUnavailable,
    ConfirmationsMissing,
    /// Rule violation specific to one asset family
    AssetRule(String),
}

impl ValidationState {
    pub fn can_execute(&self) -> bool {
        matches!(self, ValidationState::CanExecute)
    }
}

/// A single line of the summary shown before execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Source(String),
    Destination(String),
    Amount(MoneyValue),
    NetworkFee { fee_level: FeeLevel, fee: MoneyValue },
    Total(MoneyValue),
    ExchangeRate { source: CryptoCurrency, rate: MoneyValue },
    ReceiveAmount(MoneyValue),
    QuoteExpiry(DateTime<Utc>),
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::Source(label) => write!(f, "From: {}", label),
            Confirmation::Destination(label) => write!(f, "To: {}", label),
            Confirmation::Amount(amount) => write!(f, "Amount: {}", amount),
            Confirmation::NetworkFee { fee_level, fee } => {
                write!(f, "Network fee ({}): {}", fee_level, fee)
            }
            Confirmation::Total(total) => write!(f, "Total: {}", total),
            Confirmation::ExchangeRate { source, rate } => {
                write!(f, "Exchange rate: 1 {} = {}", source, rate)
            }
            Confirmation::ReceiveAmount(amount) => write!(f, "You receive: {}", amount),
            Confirmation::QuoteExpiry(at) => write!(f, "Quote expires: {}", at.to_rfc3339()),
        }
    }
}

/// The mutable aggregate passed through every stage of a flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub amount: MoneyValue,
    pub available: MoneyValue,
    pub fees: MoneyValue,
    pub fee_level: FeeLevel,
    /// Per-unit fee rate used when `fee_level` is `Custom`
    pub custom_fee_amount: Option<MoneyValue>,
    pub selected_fiat_currency: FiatCurrency,
    pub validation_state: ValidationState,
    pub confirmations: Vec<Confirmation>,
    pub minimum_limit: Option<MoneyValue>,
    pub maximum_limit: Option<MoneyValue>,
    pub maximum_personal_limit: Option<MoneyValue>,
}

impl PendingTransaction {
    pub fn new(
        amount: MoneyValue,
        available: MoneyValue,
        fees: MoneyValue,
        fee_level: FeeLevel,
        selected_fiat_currency: FiatCurrency,
    ) -> Self {
        Self {
            amount,
            available,
            fees,
            fee_level,
            custom_fee_amount: None,
            selected_fiat_currency,
            validation_state: ValidationState::Uninitialized,
            confirmations: Vec::new(),
            minimum_limit: None,
            maximum_limit: None,
            maximum_personal_limit: None,
        }
    }

    /// Zero-valued transaction in `asset`, used both as a starting point and as
    /// the fallback when initialization fails
    pub fn zero(asset: CryptoCurrency, fee_level: FeeLevel, fiat: FiatCurrency) -> Self {
        Self::new(
            MoneyValue::zero(asset),
            MoneyValue::zero(asset),
            MoneyValue::zero(asset),
            fee_level,
            fiat,
        )
    }
}

/// Outcome of a successful execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionResult {
    Hashed { tx_hash: String, amount: MoneyValue },
}

/// Where a transaction sends its funds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionTarget {
    asset: CryptoCurrency,
    address: String,
    label: String,
}

impl TransactionTarget {
    /// Target an address outside the wallet, checking its format for `asset`
    pub fn external(asset: CryptoCurrency, address: &str) -> EngineResult<Self> {
        let address = address.trim();
        if !is_valid_address(asset, address) {
            return Err(BuildError::InvalidDestination(format!(
                "{} is not a valid {} address",
                address, asset
            ))
            .into());
        }
        Ok(Self {
            asset,
            address: address.to_string(),
            label: address.to_string(),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn asset(&self) -> CryptoCurrency {
        self.asset
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

fn is_valid_address(asset: CryptoCurrency, address: &str) -> bool {
    match asset.family() {
        ChainFamily::Ethereum => {
            address.len() == 42 && address.starts_with("0x") && address.parse::<Address>().is_ok()
        }
        ChainFamily::Bitcoin => {
            (26..=90).contains(&address.len()) && address.chars().all(|c| c.is_ascii_alphanumeric())
        }
        ChainFamily::Stellar => {
            address.len() == 56
                && address.starts_with('G')
                && address
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        }
    }
}
