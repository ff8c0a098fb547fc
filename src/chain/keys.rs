//! Signing key material
//!
//! Private keys and second passwords are never logged. `KeyPair` has a
//! redacting `Debug` impl for that reason.

use crate::error::{EngineError, EngineResult};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use sha3::{Digest, Keccak256};
use std::fmt;

/// Signing key pair for one source account
#[derive(Clone)]
pub struct KeyPair {
    wallet: LocalWallet,
}

impl KeyPair {
    pub fn from_private_key(hex_key: &str) -> EngineResult<Self> {
        let trimmed = hex_key.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let wallet = trimmed
            .parse::<LocalWallet>()
            .map_err(|_| EngineError::Credential("invalid private key".to_string()))?;
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub(crate) fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Supplies the signing key pair for a source account
#[async_trait]
pub trait KeyPairProvider: Send + Sync {
    /// Unlock the key pair. Fails with a credential error if a second password
    /// is required and missing or wrong.
    async fn key_pair(&self, second_password: Option<&str>) -> EngineResult<KeyPair>;
}

/// Reads the private key from an environment variable, optionally gated by a
/// second password checked against its keccak-256 hash
pub struct EnvKeyPairProvider {
    private_key_env: String,
    second_password_hash: Option<String>,
}

impl EnvKeyPairProvider {
    pub fn new(private_key_env: impl Into<String>, second_password_hash: Option<String>) -> Self {
        Self {
            private_key_env: private_key_env.into(),
            second_password_hash: second_password_hash
                .map(|h| h.trim_start_matches("0x").to_ascii_lowercase())
                .filter(|h| !h.is_empty()),
        }
    }

    fn check_second_password(&self, second_password: Option<&str>) -> EngineResult<()> {
        let Some(expected) = &self.second_password_hash else {
            return Ok(());
        };

        let password = second_password
            .ok_or_else(|| EngineError::Credential("second password required".to_string()))?;

        if hash_second_password(password) != *expected {
            return Err(EngineError::Credential(
                "incorrect second password".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyPairProvider for EnvKeyPairProvider {
    async fn key_pair(&self, second_password: Option<&str>) -> EngineResult<KeyPair> {
        self.check_second_password(second_password)?;

        let key = std::env::var(&self.private_key_env).map_err(|_| {
            EngineError::Credential(format!(
                "No wallet configured. Set {}",
                self.private_key_env
            ))
        })?;
        KeyPair::from_private_key(&key)
    }
}

/// Lowercase hex keccak-256 of a second password
pub fn hash_second_password(password: &str) -> String {
    hex::encode(Keccak256::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TEST_ADDRESS, TEST_PRIVATE_KEY};

    #[test]
    fn test_key_pair_from_private_key() {
        let key_pair = KeyPair::from_private_key(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(key_pair.address(), TEST_ADDRESS.parse::<Address>().unwrap());
        assert!(!format!("{:?}", key_pair).contains(TEST_PRIVATE_KEY));

        assert!(matches!(
            KeyPair::from_private_key("zz"),
            Err(EngineError::Credential(_))
        ));
    }

    #[tokio::test]
    async fn test_second_password_gate() {
        std::env::set_var("SWAP_TEST_KEY_GATE", TEST_PRIVATE_KEY);
        let provider = EnvKeyPairProvider::new(
            "SWAP_TEST_KEY_GATE",
            Some(hash_second_password("hunter2")),
        );

        let missing = provider.key_pair(None).await.unwrap_err();
        assert!(missing.requires_reauthentication());

        let wrong = provider.key_pair(Some("hunter3")).await.unwrap_err();
        assert!(wrong.requires_reauthentication());

        let unlocked = provider.key_pair(Some("hunter2")).await.unwrap();
        assert_eq!(unlocked.address(), TEST_ADDRESS.parse::<Address>().unwrap());
    }

    #[tokio::test]
    async fn test_missing_env_is_credential_error() {
        let provider = EnvKeyPairProvider::new("SWAP_TEST_KEY_UNSET", None);
        let err = provider.key_pair(None).await.unwrap_err();
        assert!(err.requires_reauthentication());
    }
}
