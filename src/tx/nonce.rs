//! Nonce tracking for the cost stage
//!
//! Handles:
//! - Local record of the last nonce published per source account
//! - Rejection of a fetched nonce that has already been used
//! - Pending transaction hashes per nonce

use crate::error::BuildError;

use dashmap::DashMap;
use ethers::types::{Address, H256};
use tracing::{debug, warn};

/// Per-account nonce state
#[derive(Debug, Default)]
struct AccountNonceState {
    /// Highest nonce published from this account
    last_used: Option<u64>,
    /// Published but not yet confirmed: nonce -> tx hash
    pending: Vec<(u64, H256)>,
}

/// Tracks nonces across source accounts
#[derive(Debug, Default)]
pub struct NonceManager {
    accounts: DashMap<Address, AccountNonceState>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `nonce` if this account already published with it or a later one
    pub fn ensure_fresh(&self, account: Address, nonce: u64) -> Result<(), BuildError> {
        let Some(state) = self.accounts.get(&account) else {
            return Ok(());
        };

        match state.last_used {
            Some(last) if nonce <= last => {
                warn!(
                    "Stale nonce {} for {:?}: last published was {}",
                    nonce, account, last
                );
                Err(BuildError::StaleNonce {
                    account: format!("{:?}", account),
                    given: nonce,
                    expected: last + 1,
                })
            }
            _ => Ok(()),
        }
    }

    /// Record a nonce the submission endpoint accepted
    pub fn mark_published(&self, account: Address, nonce: u64, tx_hash: H256) {
        let mut state = self.accounts.entry(account).or_default();
        state.last_used = Some(state.last_used.map_or(nonce, |last| last.max(nonce)));
        state.pending.push((nonce, tx_hash));
        debug!("Nonce {} for {:?} published as {:?}", nonce, account, tx_hash);
    }

    /// Drop pending entries below the chain's current nonce. Returns how
    /// many are still unconfirmed.
    pub fn sync(&self, account: Address, on_chain_nonce: u64) -> usize {
        match self.accounts.get_mut(&account) {
            Some(mut state) => {
                state.pending.retain(|(nonce, _)| *nonce >= on_chain_nonce);
                state.pending.len()
            }
            None => 0,
        }
    }

    pub fn last_used(&self, account: Address) -> Option<u64> {
        self.accounts.get(&account).and_then(|s| s.last_used)
    }
}
