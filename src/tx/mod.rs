//! Transaction build pipeline: cost, sign, encode, publish

mod builder;
mod candidate;
mod encoder;
mod gas;
mod nonce;
mod sender;
mod signer;

pub use builder::TransactionBuilder;
pub use candidate::{
    CostedCandidate, FinalisedTransaction, PublishedTransaction, SignedCandidate,
    TransactionCandidate,
};
pub use encoder::TransactionEncoder;
pub use gas::GasEstimator;
pub use nonce::NonceManager;
pub use sender::TransactionSender;
pub use signer::TransactionSigner;
