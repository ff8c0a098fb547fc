//! One user's transaction flow, from initialization to execution

use super::engine::TransactionEngine;
use super::pending::{PendingTransaction, TransactionResult};
use crate::error::{EngineError, EngineResult};
use crate::money::{FeeLevel, MoneyValue};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 32;

/// Notifications published by a flow. Receivers are dropped with the flow.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    Initialized(PendingTransaction),
    Updated(PendingTransaction),
    Confirmed(PendingTransaction),
    Executed(TransactionResult),
    Failed {
        operation: &'static str,
        error: String,
    },
}

/// Owns the engine and the pending transaction for a single flow. Every
/// mutating call takes `&mut self`, so one flow never runs two executes at
/// once.
pub struct TransactionFlow {
    id: Uuid,
    engine: Box<dyn TransactionEngine>,
    pending: PendingTransaction,
    /// `confirm` passed and nothing changed since
    confirmed: bool,
    events: broadcast::Sender<FlowEvent>,
}

impl TransactionFlow {
    /// Initialize `engine` and open the flow. The returned receiver sees the
    /// `Initialized` event.
    pub async fn start(
        mut engine: Box<dyn TransactionEngine>,
    ) -> (Self, broadcast::Receiver<FlowEvent>) {
        let id = Uuid::new_v4();
        let (events, receiver) = broadcast::channel(EVENT_CAPACITY);

        let pending = engine.initialize_transaction().await;
        info!(
            session = %id,
            "Flow started for {} with {} available",
            engine.source_asset(),
            pending.available
        );

        let flow = Self {
            id,
            engine,
            pending,
            confirmed: false,
            events,
        };
        flow.emit(FlowEvent::Initialized(flow.pending.clone()));
        (flow, receiver)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pending(&self) -> &PendingTransaction {
        &self.pending
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: FlowEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn fail<T>(&self, operation: &'static str, error: EngineError) -> EngineResult<T> {
        warn!(session = %self.id, "{} failed: {}", operation, error);
        self.emit(FlowEvent::Failed {
            operation,
            error: error.to_string(),
        });
        Err(error)
    }

    /// Set the amount and re-validate it
    pub async fn update_amount(&mut self, amount: MoneyValue) -> EngineResult<&PendingTransaction> {
        let result = match self.engine.update(amount, self.pending.clone()).await {
            Ok(updated) => self.engine.validate_amount(updated).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(pending) => {
                debug!(
                    session = %self.id,
                    "Amount {} is {:?}", pending.amount, pending.validation_state
                );
                self.pending = pending;
                self.confirmed = false;
                self.emit(FlowEvent::Updated(self.pending.clone()));
                Ok(&self.pending)
            }
            Err(e) => self.fail("update amount", e),
        }
    }

    pub async fn update_fee_level(
        &mut self,
        level: FeeLevel,
        custom_fee: Option<MoneyValue>,
    ) -> EngineResult<&PendingTransaction> {
        let result = match self
            .engine
            .update_fee_level(self.pending.clone(), level, custom_fee)
            .await
        {
            Ok(updated) => self.engine.validate_amount(updated).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(pending) => {
                self.pending = pending;
                self.confirmed = false;
                self.emit(FlowEvent::Updated(self.pending.clone()));
                Ok(&self.pending)
            }
            Err(e) => self.fail("update fee level", e),
        }
    }

    /// Build the confirmation lines and run every execute precondition
    pub async fn confirm(&mut self) -> EngineResult<&PendingTransaction> {
        let result = match self.engine.build_confirmations(self.pending.clone()).await {
            Ok(confirmed) => self.engine.do_validate_all(confirmed).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(pending) => {
                self.confirmed = pending.validation_state.can_execute();
                self.pending = pending;
                self.emit(FlowEvent::Confirmed(self.pending.clone()));
                Ok(&self.pending)
            }
            Err(e) => self.fail("confirm", e),
        }
    }

    /// Execute the confirmed transaction. Refused unless `confirm` left it
    /// executable and nothing changed since.
    pub async fn execute(
        &mut self,
        second_password: Option<&str>,
    ) -> EngineResult<TransactionResult> {
        if !self.confirmed {
            return self.fail(
                "execute",
                EngineError::Validation("transaction has not been confirmed".to_string()),
            );
        }
        if !self.pending.validation_state.can_execute() {
            let state = self.pending.validation_state.clone();
            return self.fail(
                "execute",
                EngineError::Validation(format!("transaction is not executable: {:?}", state)),
            );
        }

        match self
            .engine
            .execute(self.pending.clone(), second_password)
            .await
        {
            Ok(result) => {
                self.confirmed = false;
                info!(session = %self.id, "Flow executed: {:?}", result);
                self.emit(FlowEvent::Executed(result.clone()));
                Ok(result)
            }
            Err(e) => self.fail("execute", e),
        }
    }
}
