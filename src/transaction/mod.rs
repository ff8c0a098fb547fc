//! Asset-agnostic transaction model: the pending transaction, the engine
//! contract every asset implements, and the flow session that drives one

mod engine;
mod factory;
mod pending;
pub mod rules;
mod session;

pub use engine::{OnChainEngine, TransactionEngine};
pub use factory::{EngineFactory, TransactionIntent};
pub use pending::{
    Confirmation, PendingTransaction, TransactionResult, TransactionTarget, ValidationState,
};
pub use session::{FlowEvent, TransactionFlow};
