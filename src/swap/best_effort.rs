//! Calls whose failure must not reach the caller

use crate::error::EngineResult;

use std::future::Future;
use tracing::{debug, warn};

/// Await `call`, logging and discarding any error. Returns whether it
/// succeeded.
pub async fn best_effort<T, F>(operation: &str, call: F) -> bool
where
    F: Future<Output = EngineResult<T>>,
{
    match call.await {
        Ok(_) => {
            debug!("{} succeeded", operation);
            true
        }
        Err(e) => {
            warn!("{} failed, ignoring: {}", operation, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[tokio::test]
    async fn test_swallows_errors() {
        assert!(best_effort("ok call", async { Ok::<_, EngineError>(1) }).await);
        assert!(
            !best_effort("failing call", async {
                Err::<(), _>(EngineError::network("orders", "503"))
            })
            .await
        );
    }
}
