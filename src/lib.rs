//! Transaction construction and swap settlement
//!
//! Turns a user intent ("send X of A" or "swap A for B") into a costed,
//! signed and published transaction, coordinating with a remote order service
//! for swaps.

pub mod chain;
pub mod config;
pub mod error;
pub mod money;
pub mod quotes;
pub mod remote;
pub mod swap;
pub mod transaction;
pub mod tx;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{EngineError, EngineResult, ErrorKind};
