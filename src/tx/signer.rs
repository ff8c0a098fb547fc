//! Sign stage: produce a signature over a costed candidate

use super::candidate::{CostedCandidate, SignedCandidate};
use crate::chain::KeyPair;
use crate::error::BuildError;

use tracing::debug;

#[derive(Debug, Default)]
pub struct TransactionSigner;

impl TransactionSigner {
    pub fn new() -> Self {
        Self
    }

    /// Sign with `key_pair`, which must control the candidate's source account
    pub fn sign(
        &self,
        costed: CostedCandidate,
        key_pair: &KeyPair,
    ) -> Result<SignedCandidate, BuildError> {
        if key_pair.address() != costed.from() {
            return Err(BuildError::Signing(format!(
                "key pair for {:?} cannot sign for {:?}",
                key_pair.address(),
                costed.from()
            )));
        }

        let signature = key_pair
            .wallet()
            .sign_transaction_sync(costed.transaction())
            .map_err(|e| BuildError::Signing(e.to_string()))?;

        debug!("Signed nonce {} for {:?}", costed.nonce(), costed.from());
        Ok(SignedCandidate::from_parts(costed, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{NonceManager, TransactionBuilder, TransactionCandidate};
    use crate::testing::{other_key_pair, test_address, test_key_pair, OTHER_ADDRESS};
    use ethers::types::U256;
    use std::sync::Arc;

    fn costed() -> CostedCandidate {
        let builder = TransactionBuilder::new(1, Arc::new(NonceManager::new()));
        let candidate = TransactionCandidate {
            from: test_address(),
            to: OTHER_ADDRESS.to_string(),
            value: U256::from(1_000),
            gas_price: U256::from(1),
            gas_limit: U256::from(21_000),
        };
        builder.build(candidate, 0, U256::from(1_000_000)).unwrap()
    }

    #[test]
    fn test_signs_with_source_key() {
        let signed = TransactionSigner::new()
            .sign(costed(), &test_key_pair())
            .unwrap();
        let recovered = signed
            .signature()
            .recover(signed.costed().transaction().sighash())
            .unwrap();
        assert_eq!(recovered, test_address());
    }

    #[test]
    fn test_rejects_foreign_key() {
        let err = TransactionSigner::new()
            .sign(costed(), &other_key_pair())
            .unwrap_err();
        assert!(matches!(err, BuildError::Signing(_)));
    }
}
