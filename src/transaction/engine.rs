//! The capability contract every asset engine implements

use super::pending::{PendingTransaction, TransactionResult, TransactionTarget};
use crate::error::EngineResult;
use crate::money::{CryptoCurrency, FeeLevel, MoneyValue};

use async_trait::async_trait;

/// Asset-agnostic transaction engine.
///
/// The pending transaction is passed in by value and handed back, so the
/// caller's flow keeps exclusive ownership between calls.
#[async_trait]
pub trait TransactionEngine: Send + Sync {
    /// Asset the engine spends from
    fn source_asset(&self) -> CryptoCurrency;

    /// Produce the starting transaction. Never fails: internal errors are
    /// logged and replaced by a zero-valued fallback.
    async fn initialize_transaction(&mut self) -> PendingTransaction;

    /// Recompute `available`, `fees` and confirmations for a new amount.
    /// Idempotent for a given amount.
    async fn update(
        &mut self,
        amount: MoneyValue,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction>;

    /// Switch fee tier. `custom_fee` is required for `FeeLevel::Custom`.
    async fn update_fee_level(
        &mut self,
        pending: PendingTransaction,
        level: FeeLevel,
        custom_fee: Option<MoneyValue>,
    ) -> EngineResult<PendingTransaction>;

    /// Check the amount against balance and limits, setting `validation_state`
    async fn validate_amount(&self, pending: PendingTransaction)
        -> EngineResult<PendingTransaction>;

    /// Amount checks plus every other precondition of `execute`
    async fn do_validate_all(&self, pending: PendingTransaction)
        -> EngineResult<PendingTransaction>;

    /// Rebuild the confirmation lines shown before execution. Engines may
    /// record what was shown so `execute` acts on it.
    async fn build_confirmations(
        &mut self,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction>;

    /// Perform the irreversible action
    async fn execute(
        &mut self,
        pending: PendingTransaction,
        second_password: Option<&str>,
    ) -> EngineResult<TransactionResult>;
}

/// An engine that settles on a ledger and can be pointed at a new target
#[async_trait]
pub trait OnChainEngine: TransactionEngine {
    /// Address funds are spent from
    fn source_address(&self) -> String;

    fn start(&mut self, target: TransactionTarget);

    /// Point at a new target and recompute the pending transaction for it
    async fn restart(
        &mut self,
        target: TransactionTarget,
        pending: PendingTransaction,
    ) -> EngineResult<PendingTransaction>;
}
