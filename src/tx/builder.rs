//! Cost stage: apply nonce and fee to a candidate

use super::candidate::{CostedCandidate, TransactionCandidate};
use super::nonce::NonceManager;
use crate::error::BuildError;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest, U256};
use std::sync::Arc;
use tracing::debug;

pub struct TransactionBuilder {
    chain_id: u64,
    nonces: Arc<NonceManager>,
}

impl TransactionBuilder {
    pub fn new(chain_id: u64, nonces: Arc<NonceManager>) -> Self {
        Self { chain_id, nonces }
    }

    /// Cost `candidate` against a freshly fetched `nonce` and the source balance
    pub fn build(
        &self,
        candidate: TransactionCandidate,
        nonce: u64,
        balance: U256,
    ) -> Result<CostedCandidate, BuildError> {
        let to = parse_destination(&candidate.to)?;

        if candidate.value.is_zero() {
            return Err(BuildError::InvalidCandidate("zero value transfer".to_string()));
        }
        if candidate.gas_limit.is_zero() {
            return Err(BuildError::InvalidCandidate("zero gas limit".to_string()));
        }

        self.nonces.ensure_fresh(candidate.from, nonce)?;

        let fee = candidate.fee();
        let total = candidate
            .value
            .checked_add(fee)
            .ok_or_else(|| BuildError::InvalidCandidate("value plus fee overflows".to_string()))?;

        if total > balance {
            return Err(BuildError::InsufficientFunds {
                have: balance.to_string(),
                need: total.to_string(),
            });
        }

        let tx = TransactionRequest::new()
            .from(candidate.from)
            .to(to)
            .value(candidate.value)
            .nonce(nonce)
            .gas(candidate.gas_limit)
            .gas_price(candidate.gas_price)
            .chain_id(self.chain_id);

        debug!(
            "Costed transfer from {:?}: nonce {}, fee {}, total {}",
            candidate.from, nonce, fee, total
        );

        Ok(CostedCandidate::new(
            TypedTransaction::Legacy(tx),
            candidate.from,
            nonce,
            fee,
            total,
        ))
    }
}

fn parse_destination(raw: &str) -> Result<Address, BuildError> {
    let raw = raw.trim();
    if raw.len() != 42 || !raw.starts_with("0x") {
        return Err(BuildError::InvalidDestination(raw.to_string()));
    }
    let address: Address = raw
        .parse()
        .map_err(|_| BuildError::InvalidDestination(raw.to_string()))?;
    if address.is_zero() {
        return Err(BuildError::InvalidDestination("zero address".to_string()));
    }
    Ok(address)
}
