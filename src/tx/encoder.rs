//! Encode stage: serialize a signed candidate into the RLP wire format

use super::candidate::{FinalisedTransaction, SignedCandidate};
use crate::error::BuildError;

use ethers::types::H256;
use sha3::{Digest, Keccak256};
use tracing::debug;

#[derive(Debug, Default)]
pub struct TransactionEncoder;

impl TransactionEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode after checking the signature recovers to the source account
    pub fn encode(&self, signed: SignedCandidate) -> Result<FinalisedTransaction, BuildError> {
        let costed = signed.costed();
        let tx = costed.transaction();

        let recovered = signed
            .signature()
            .recover(tx.sighash())
            .map_err(|e| BuildError::Encoding(format!("signature does not verify: {}", e)))?;

        if recovered != costed.from() {
            return Err(BuildError::Encoding(format!(
                "signature recovers to {:?}, expected {:?}",
                recovered,
                costed.from()
            )));
        }

        let raw = tx.rlp_signed(signed.signature());
        let tx_hash = H256::from_slice(&Keccak256::digest(raw.as_ref()));

        debug!("Encoded {} bytes as {:?}", raw.len(), tx_hash);
        Ok(FinalisedTransaction::new(
            raw,
            tx_hash,
            costed.from(),
            costed.nonce(),
        ))
    }
}
