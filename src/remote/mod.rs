//! HTTP implementations of the order, quote and limits collaborators

mod client;
mod limits;
mod orders;
mod quotes;

pub use client::ApiClient;
pub use limits::HttpTradeLimits;
pub use orders::HttpOrderClient;
pub use quotes::HttpQuotesFeed;

use crate::error::{EngineError, EngineResult};
use crate::money::{Currency, MoneyValue};

/// Read a minor-unit integer string from a response field
fn parse_minor(
    endpoint: &str,
    field: &str,
    value: &str,
    currency: impl Into<Currency>,
) -> EngineResult<MoneyValue> {
    let minor = value.trim().parse::<u128>().map_err(|_| {
        EngineError::network(endpoint, format!("invalid {} in response: {:?}", field, value))
    })?;
    Ok(MoneyValue::from_minor(minor, currency))
}
