//! Cross-asset swaps settled through a remote order service

pub mod best_effort;
mod engine;
pub mod limits;
pub mod order;

pub use best_effort::best_effort;
pub use engine::{SwapTarget, SwapTransactionEngine};
pub use limits::{KycTier, TradeLimits, TradeLimitsProvider};
pub use order::{OrderClient, OrderRequest, OrderState, SwapOrder};
