//! Error types for the transaction and swap-settlement engine

use crate::money::MoneyError;
use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Network error from {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("No engine available for asset {0}")]
    UnsupportedAsset(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures raised by the cost, sign and encode stages of the build pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: String, need: String },

    #[error("Invalid destination address: {0}")]
    InvalidDestination(String),

    #[error("Stale nonce {given} for {account}: next usable nonce is {expected}")]
    StaleNonce {
        account: String,
        given: u64,
        expected: u64,
    },

    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Endpoint returned hash {remote}, expected {local}")]
    HashMismatch { local: String, remote: String },
}

/// Coarse error category surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Amount, limit or state violation; correct the input and try again
    Validation,
    /// Cost, sign or encode stage failure; re-run initialization
    Build,
    /// Remote endpoint failure; the whole execute may be retried
    Network,
    /// Missing or wrong unlock secret; re-authenticate
    Credential,
}

impl EngineError {
    pub fn network(endpoint: impl Into<String>, message: impl ToString) -> Self {
        EngineError::Network {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_)
            | EngineError::Money(_)
            | EngineError::UnsupportedAsset(_)
            | EngineError::Config(_) => ErrorKind::Validation,
            EngineError::Build(_) | EngineError::IllegalState(_) => ErrorKind::Build,
            EngineError::Network { .. } | EngineError::Timeout { .. } => ErrorKind::Network,
            EngineError::Credential(_) => ErrorKind::Credential,
        }
    }

    /// Check if the caller may retry the whole operation
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    /// Check if the user has to unlock the wallet again
    pub fn requires_reauthentication(&self) -> bool {
        self.kind() == ErrorKind::Credential
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let network = EngineError::network("https://rpc.example", "connection reset");
        assert_eq!(network.kind(), ErrorKind::Network);
        assert!(network.is_retryable());
        assert_eq!(
            network.to_string(),
            "Network error from https://rpc.example: connection reset"
        );

        let stale = EngineError::from(BuildError::StaleNonce {
            account: "0xabc".to_string(),
            given: 3,
            expected: 4,
        });
        assert_eq!(stale.kind(), ErrorKind::Build);
        assert!(!stale.is_retryable());

        let locked = EngineError::Credential("second password required".to_string());
        assert!(locked.requires_reauthentication());
    }
}
