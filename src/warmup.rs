use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    cache::{CacheKind, SampleCache},
    company::CompanyStore,
    connection::ConnectionProvider,
    placement::PlacementStore,
    student::StudentStore,
};

/// Warm-up sample sizes: enough to draw first charts, small enough to stay
/// off the foreground path.
pub const STUDENT_PRELOAD: i64 = 100;
pub const COMPANY_PRELOAD: i64 = 50;
pub const PLACEMENT_PRELOAD: i64 = 50;

/// Handle to the background preload task.
#[derive(Debug)]
pub struct WarmupHandle {
    join: JoinHandle<()>,
}

impl WarmupHandle {
    /// Cancel the preload if it is still running.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Cancel the preload and observe its termination. Cancellation and
    /// preload failures are logged, never propagated.
    pub async fn shutdown(self) {
        self.abort();
        if let Err(err) = self.join.await {
            if !err.is_cancelled() {
                warn!(error = %err, "warm-up task ended abnormally");
            }
        }
    }
}

/// Spawn the background preload: capped samples of all three collections
/// into the cache. Failures stop the preload and log a warning; foreground
/// reads fall back to fetching on miss.
pub fn spawn(provider: Arc<ConnectionProvider>, cache: Arc<SampleCache>) -> WarmupHandle {
    let join = tokio::spawn(async move {
        match preload(&provider, &cache).await {
            Ok(()) => debug!("warm-up completed"),
            Err(err) => warn!(error = %err, "warm-up failed"),
        }
    });
    WarmupHandle { join }
}

async fn preload(provider: &ConnectionProvider, cache: &SampleCache) -> crate::error::Result<()> {
    let students = StudentStore::open(provider).await?;
    cache
        .get_or_fetch(CacheKind::Students, STUDENT_PRELOAD, || {
            students.sample(STUDENT_PRELOAD)
        })
        .await?;

    let companies = CompanyStore::open(provider).await?;
    cache
        .get_or_fetch(CacheKind::Companies, COMPANY_PRELOAD, || {
            companies.sample(COMPANY_PRELOAD)
        })
        .await?;

    let placements = PlacementStore::open(provider).await?;
    cache
        .get_or_fetch(CacheKind::Placements, PLACEMENT_PRELOAD, || {
            placements.sample(PLACEMENT_PRELOAD)
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_after_immediate_abort_is_clean() {
        let provider = Arc::new(ConnectionProvider::new(
            "mongodb://127.0.0.1:1".to_string(),
            "mongodb://127.0.0.1:1".to_string(),
        ));
        let cache = Arc::new(SampleCache::new());

        let handle = spawn(provider, cache.clone());
        handle.shutdown().await;

        // Nothing can have been fetched from an unreachable endpoint.
        assert!(cache.get(CacheKind::Students, STUDENT_PRELOAD).is_none());
    }
}
