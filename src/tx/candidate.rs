//! Transaction representations for each stage of the build pipeline
//!
//! Each stage consumes the previous representation and is the only place the
//! next one is made, so a stage cannot be skipped or reordered.

use crate::error::BuildError;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Signature, H256, U256};

/// Unsigned, uncosted description of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCandidate {
    pub from: Address,
    /// Destination as supplied by the caller; checked by the cost stage
    pub to: String,
    pub value: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
}

impl TransactionCandidate {
    pub fn fee(&self) -> U256 {
        self.gas_limit.saturating_mul(self.gas_price)
    }
}

/// Candidate with nonce and fee applied
#[derive(Debug, Clone, PartialEq)]
pub struct CostedCandidate {
    tx: TypedTransaction,
    from: Address,
    nonce: u64,
    fee: U256,
    total: U256,
}

impl CostedCandidate {
    pub(super) fn new(tx: TypedTransaction, from: Address, nonce: u64, fee: U256, total: U256) -> Self {
        Self {
            tx,
            from,
            nonce,
            fee,
            total,
        }
    }

    pub fn transaction(&self) -> &TypedTransaction {
        &self.tx
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn fee(&self) -> U256 {
        self.fee
    }

    /// Value plus fee
    pub fn total(&self) -> U256 {
        self.total
    }
}

/// Costed candidate plus a signature over it
#[derive(Debug, Clone, PartialEq)]
pub struct SignedCandidate {
    costed: CostedCandidate,
    signature: Signature,
}

impl SignedCandidate {
    /// Pair a costed candidate with a signature produced elsewhere (e.g. an
    /// external signer). The encoder re-verifies it.
    pub fn from_parts(costed: CostedCandidate, signature: Signature) -> Self {
        Self { costed, signature }
    }

    pub fn costed(&self) -> &CostedCandidate {
        &self.costed
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// Wire-encoded signed transaction, ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalisedTransaction {
    raw: Bytes,
    tx_hash: H256,
    from: Address,
    nonce: u64,
}

impl FinalisedTransaction {
    pub(super) fn new(raw: Bytes, tx_hash: H256, from: Address, nonce: u64) -> Self {
        Self {
            raw,
            tx_hash,
            from,
            nonce,
        }
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Locally computed transaction hash
    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

/// A finalised transaction the submission endpoint accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedTransaction {
    finalised: FinalisedTransaction,
}

impl PublishedTransaction {
    /// Match the endpoint's hash against the locally computed one
    pub fn correlate(
        finalised: FinalisedTransaction,
        response_hash: H256,
    ) -> Result<Self, BuildError> {
        if finalised.tx_hash != response_hash {
            return Err(BuildError::HashMismatch {
                local: format!("{:?}", finalised.tx_hash),
                remote: format!("{:?}", response_hash),
            });
        }
        Ok(Self { finalised })
    }

    pub fn tx_hash(&self) -> H256 {
        self.finalised.tx_hash
    }

    pub fn finalised(&self) -> &FinalisedTransaction {
        &self.finalised
    }
}
