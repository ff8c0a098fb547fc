//! Fixed-point money values

use super::{Currency, MoneyError};

use ethers::types::U256;
use std::cmp::Ordering;
use std::fmt;

/// An amount in integer minor units tagged with its currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoneyValue {
    minor: u128,
    currency: Currency,
}

impl MoneyValue {
    pub fn zero(currency: impl Into<Currency>) -> Self {
        Self::from_minor(0, currency)
    }

    pub fn from_minor(minor: u128, currency: impl Into<Currency>) -> Self {
        Self {
            minor,
            currency: currency.into(),
        }
    }

    /// Parse a decimal string in major units, e.g. `"0.25"` ETH
    pub fn parse_major(input: &str, currency: impl Into<Currency>) -> Result<Self, MoneyError> {
        let currency = currency.into();
        let precision = currency.precision() as usize;
        let parse_error = || MoneyError::Parse {
            input: input.to_string(),
            currency,
        };

        let trimmed = input.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(parse_error());
        }
        if fraction.len() > precision
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(parse_error());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| parse_error())?
        };
        let padded = format!("{:0<width$}", fraction, width = precision);
        let fraction: u128 = if padded.is_empty() {
            0
        } else {
            padded.parse().map_err(|_| parse_error())?
        };

        let minor = whole
            .checked_mul(10u128.pow(precision as u32))
            .and_then(|w| w.checked_add(fraction))
            .ok_or(MoneyError::Overflow(currency))?;

        Ok(Self { minor, currency })
    }

    pub fn minor(&self) -> u128 {
        self.minor
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    pub fn ensure_currency(&self, currency: impl Into<Currency>) -> Result<(), MoneyError> {
        let currency = currency.into();
        if self.currency == currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: currency,
            })
        }
    }

    pub fn checked_add(&self, other: &MoneyValue) -> Result<Self, MoneyError> {
        self.ensure_currency(other.currency)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or(MoneyError::Overflow(self.currency))?;
        Ok(Self::from_minor(minor, self.currency))
    }

    pub fn checked_sub(&self, other: &MoneyValue) -> Result<Self, MoneyError> {
        self.ensure_currency(other.currency)?;
        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or(MoneyError::Underflow(self.currency))?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// Subtract, clamping at zero. Still rejects mixed currencies.
    pub fn saturating_sub(&self, other: &MoneyValue) -> Result<Self, MoneyError> {
        self.ensure_currency(other.currency)?;
        Ok(Self::from_minor(
            self.minor.saturating_sub(other.minor),
            self.currency,
        ))
    }

    pub fn try_cmp(&self, other: &MoneyValue) -> Result<Ordering, MoneyError> {
        self.ensure_currency(other.currency)?;
        Ok(self.minor.cmp(&other.minor))
    }

    pub fn is_greater_than(&self, other: &MoneyValue) -> Result<bool, MoneyError> {
        Ok(self.try_cmp(other)? == Ordering::Greater)
    }

    pub fn is_less_than(&self, other: &MoneyValue) -> Result<bool, MoneyError> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }

    /// Convert into the rate's currency. `rate` is the number of target minor
    /// units bought by one major unit of `self`. Rounds down.
    pub fn convert(&self, rate: &MoneyValue) -> Result<MoneyValue, MoneyError> {
        let scale = U256::exp10(self.currency.precision() as usize);
        let converted = U256::from(self.minor) * U256::from(rate.minor) / scale;
        let minor = u128::try_from(converted).map_err(|_| MoneyError::Overflow(rate.currency))?;
        Ok(MoneyValue::from_minor(minor, rate.currency))
    }

    /// Inverse of [`convert`](Self::convert): express `self` (in the rate's
    /// currency) as an amount of `source`. Rounds up so a converted minimum is
    /// never undershot.
    pub fn convert_back(
        &self,
        rate: &MoneyValue,
        source: impl Into<Currency>,
    ) -> Result<MoneyValue, MoneyError> {
        let source = source.into();
        self.ensure_currency(rate.currency)?;
        if rate.is_zero() {
            return Err(MoneyError::Overflow(source));
        }
        let scale = U256::exp10(source.precision() as usize);
        let numerator = U256::from(self.minor) * scale;
        let denominator = U256::from(rate.minor);
        let (quotient, remainder) = numerator.div_mod(denominator);
        let rounded = if remainder.is_zero() {
            quotient
        } else {
            quotient + U256::one()
        };
        let minor = u128::try_from(rounded).map_err(|_| MoneyError::Overflow(source))?;
        Ok(MoneyValue::from_minor(minor, source))
    }
}

impl fmt::Display for MoneyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.currency.precision();
        let scale = 10u128.pow(precision);
        let whole = self.minor / scale;
        let fraction = self.minor % scale;

        if fraction == 0 {
            return write!(f, "{} {}", whole, self.currency);
        }

        let fraction = format!("{:0>width$}", fraction, width = precision as usize);
        write!(
            f,
            "{}.{} {}",
            whole,
            fraction.trim_end_matches('0'),
            self.currency
        )
    }
}
