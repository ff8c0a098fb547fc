//! Currency-aware money values and the fee level model
//!
//! All amounts are held as integer minor units (wei, satoshi, stroop, cents).
//! Arithmetic never mixes currencies and never goes through floating point.

mod fee;
mod value;

pub use fee::FeeLevel;
pub use value::MoneyValue;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised by money arithmetic and parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },

    #[error("Arithmetic overflow in {0}")]
    Overflow(Currency),

    #[error("Arithmetic underflow in {0}")]
    Underflow(Currency),

    #[error("Cannot parse {input:?} as {currency}")]
    Parse { input: String, currency: Currency },

    #[error("Unknown currency code {0:?}")]
    UnknownCurrency(String),
}

/// Ledger family an asset settles on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    Bitcoin,
    Ethereum,
    Stellar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoCurrency {
    #[serde(rename = "BTC")]
    Bitcoin,
    #[serde(rename = "ETH")]
    Ethereum,
    #[serde(rename = "XLM")]
    Stellar,
    #[serde(rename = "PAX")]
    Pax,
    #[serde(rename = "USDT")]
    Tether,
}

impl CryptoCurrency {
    pub fn code(&self) -> &'static str {
        match self {
            CryptoCurrency::Bitcoin => "BTC",
            CryptoCurrency::Ethereum => "ETH",
            CryptoCurrency::Stellar => "XLM",
            CryptoCurrency::Pax => "PAX",
            CryptoCurrency::Tether => "USDT",
        }
    }

    /// Number of minor units in one major unit, as a power of ten
    pub fn precision(&self) -> u32 {
        match self {
            CryptoCurrency::Bitcoin => 8,
            CryptoCurrency::Ethereum | CryptoCurrency::Pax => 18,
            CryptoCurrency::Stellar => 7,
            CryptoCurrency::Tether => 6,
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            CryptoCurrency::Bitcoin => ChainFamily::Bitcoin,
            CryptoCurrency::Ethereum | CryptoCurrency::Pax | CryptoCurrency::Tether => {
                ChainFamily::Ethereum
            }
            CryptoCurrency::Stellar => ChainFamily::Stellar,
        }
    }
}

impl FromStr for CryptoCurrency {
    type Err = MoneyError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.to_ascii_uppercase().as_str() {
            "BTC" => Ok(CryptoCurrency::Bitcoin),
            "ETH" => Ok(CryptoCurrency::Ethereum),
            "XLM" => Ok(CryptoCurrency::Stellar),
            "PAX" => Ok(CryptoCurrency::Pax),
            "USDT" => Ok(CryptoCurrency::Tether),
            _ => Err(MoneyError::UnknownCurrency(code.to_string())),
        }
    }
}

impl fmt::Display for CryptoCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiatCurrency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
}

impl FiatCurrency {
    pub fn code(&self) -> &'static str {
        match self {
            FiatCurrency::Usd => "USD",
            FiatCurrency::Eur => "EUR",
            FiatCurrency::Gbp => "GBP",
        }
    }
}

impl FromStr for FiatCurrency {
    type Err = MoneyError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Ok(FiatCurrency::Usd),
            "EUR" => Ok(FiatCurrency::Eur),
            "GBP" => Ok(FiatCurrency::Gbp),
            _ => Err(MoneyError::UnknownCurrency(code.to_string())),
        }
    }
}

impl fmt::Display for FiatCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Either side of a money value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Crypto(CryptoCurrency),
    Fiat(FiatCurrency),
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Crypto(c) => c.code(),
            Currency::Fiat(f) => f.code(),
        }
    }

    pub fn precision(&self) -> u32 {
        match self {
            Currency::Crypto(c) => c.precision(),
            Currency::Fiat(_) => 2,
        }
    }
}

impl From<CryptoCurrency> for Currency {
    fn from(currency: CryptoCurrency) -> Self {
        Currency::Crypto(currency)
    }
}

impl From<FiatCurrency> for Currency {
    fn from(currency: FiatCurrency) -> Self {
        Currency::Fiat(currency)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
