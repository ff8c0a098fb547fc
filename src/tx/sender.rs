//! Transaction sender: runs a candidate through every pipeline stage

use super::builder::TransactionBuilder;
use super::candidate::{FinalisedTransaction, PublishedTransaction, TransactionCandidate};
use super::encoder::TransactionEncoder;
use super::nonce::NonceManager;
use super::signer::TransactionSigner;
use crate::chain::{ChainClient, KeyPair};
use crate::error::{EngineError, EngineResult};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// Cost, sign, encode and publish, strictly in that order. No stage is retried
/// here; retry policy belongs to the caller.
pub struct TransactionSender {
    /// Ledger access and submission endpoint
    client: Arc<dyn ChainClient>,
    /// Nonce manager
    nonce_manager: Arc<NonceManager>,
    builder: TransactionBuilder,
    signer: TransactionSigner,
    encoder: TransactionEncoder,
    /// Upper bound on a single submission call
    send_timeout: Duration,
}

impl TransactionSender {
    pub fn new(
        client: Arc<dyn ChainClient>,
        nonce_manager: Arc<NonceManager>,
        send_timeout: Duration,
    ) -> Self {
        let builder = TransactionBuilder::new(client.chain_id(), nonce_manager.clone());
        Self {
            client,
            nonce_manager,
            builder,
            signer: TransactionSigner::new(),
            encoder: TransactionEncoder::new(),
            send_timeout,
        }
    }

    /// Finalise and publish a transfer
    pub async fn send(
        &self,
        candidate: TransactionCandidate,
        key_pair: &KeyPair,
    ) -> EngineResult<PublishedTransaction> {
        let finalised = self.finalise(candidate, key_pair).await?;
        self.publish(finalised).await
    }

    /// Fetch a fresh nonce and the balance, then cost, sign and encode
    pub async fn finalise(
        &self,
        candidate: TransactionCandidate,
        key_pair: &KeyPair,
    ) -> EngineResult<FinalisedTransaction> {
        let from = candidate.from;
        let (nonce, balance) =
            futures::try_join!(self.client.nonce(from), self.client.balance(from))?;
        let unconfirmed = self.nonce_manager.sync(from, nonce);
        debug!(
            "Fetched nonce {} and balance {} for {:?} ({} unconfirmed)",
            nonce, balance, from, unconfirmed
        );

        let costed = self.builder.build(candidate, nonce, balance)?;
        let signed = self.signer.sign(costed, key_pair)?;
        let finalised = self.encoder.encode(signed)?;
        Ok(finalised)
    }

    /// Submit to the chain endpoint and correlate its hash with ours
    pub async fn publish(
        &self,
        finalised: FinalisedTransaction,
    ) -> EngineResult<PublishedTransaction> {
        let response_hash = timeout(self.send_timeout, self.client.push(finalised.raw().clone()))
            .await
            .map_err(|_| EngineError::Timeout {
                operation: format!("publish to {}", self.client.endpoint()),
            })??;

        // The endpoint accepted the nonce whatever hash it reports
        self.nonce_manager
            .mark_published(finalised.from(), finalised.nonce(), response_hash);

        let published = PublishedTransaction::correlate(finalised, response_hash)?;
        info!(
            "Transaction published on chain {}: {:?}",
            self.client.chain_id(),
            published.tx_hash()
        );

        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::testing::{test_address, test_key_pair, FakeChainClient, OTHER_ADDRESS};
    use ethers::types::{H256, U256};
    use sha3::{Digest, Keccak256};

    fn candidate() -> TransactionCandidate {
        TransactionCandidate {
            from: test_address(),
            to: OTHER_ADDRESS.to_string(),
            value: U256::from(1_000),
            gas_price: U256::from(1),
            gas_limit: U256::from(21_000),
        }
    }

    fn sender(client: Arc<FakeChainClient>) -> (TransactionSender, Arc<NonceManager>) {
        let nonces = Arc::new(NonceManager::new());
        let sender = TransactionSender::new(client, nonces.clone(), Duration::from_secs(5));
        (sender, nonces)
    }

    #[tokio::test]
    async fn test_send_publishes_and_records_nonce() {
        let client = Arc::new(FakeChainClient::new(1_000_000, 1));
        client.set_nonce(3);
        let (sender, nonces) = sender(client.clone());

        let published = sender.send(candidate(), &test_key_pair()).await.unwrap();

        let pushes = client.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(
            published.tx_hash(),
            H256::from_slice(&Keccak256::digest(pushes[0].as_ref()))
        );
        assert_eq!(published.finalised().nonce(), 3);
        assert_eq!(nonces.last_used(test_address()), Some(3));
    }

    #[tokio::test]
    async fn test_reused_nonce_fails_cost_stage() {
        let client = Arc::new(FakeChainClient::new(1_000_000, 1));
        let (sender, _) = sender(client.clone());

        sender.send(candidate(), &test_key_pair()).await.unwrap();
        // The node still reports nonce 0
        let err = sender.send(candidate(), &test_key_pair()).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Build(BuildError::StaleNonce { given: 0, expected: 1, .. })
        ));
        assert_eq!(client.pushes().len(), 1);
    }

    #[tokio::test]
    async fn test_push_error_is_surfaced_verbatim() {
        let client = Arc::new(FakeChainClient::new(1_000_000, 1));
        client.fail_pushes("replacement transaction underpriced");
        let (sender, nonces) = sender(client.clone());

        let err = sender.send(candidate(), &test_key_pair()).await.unwrap_err();

        match err {
            EngineError::Network { message, .. } => {
                assert_eq!(message, "replacement transaction underpriced")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(nonces.last_used(test_address()), None);
    }

    #[tokio::test]
    async fn test_hash_mismatch_still_consumes_nonce() {
        let client = Arc::new(FakeChainClient::new(1_000_000, 1));
        client.misreport_hash();
        let (sender, nonces) = sender(client.clone());

        let err = sender.send(candidate(), &test_key_pair()).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Build(BuildError::HashMismatch { .. })
        ));
        assert_eq!(nonces.last_used(test_address()), Some(0));
    }

    #[tokio::test]
    async fn test_insufficient_balance_never_reaches_endpoint() {
        let client = Arc::new(FakeChainClient::new(21_999, 1));
        let (sender, _) = sender(client.clone());

        let err = sender.send(candidate(), &test_key_pair()).await.unwrap_err();

        assert!(matches!(
            err,
            EngineError::Build(BuildError::InsufficientFunds { .. })
        ));
        assert!(client.pushes().is_empty());
    }
}
