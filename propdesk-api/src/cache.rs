//! Read-through cache of dashboard summaries
//!
//! Keyed by company id. Entries expire after `CACHE_TTL_SECS`; writes to
//! units, contracts, payments and maintenance drop the company's entry.

use moka::future::Cache;
use propdesk_shared::analytics::DashboardSummary;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Upper bound on cached companies
const MAX_ENTRIES: u64 = 10_000;

/// Summaries are keyed by company and generation. `invalidate` moves the
/// company to a new generation, so a load that started earlier can only
/// populate a key nobody reads any more.
#[derive(Debug, Clone)]
pub struct DashboardCache {
    inner: Cache<(Uuid, u64), Arc<DashboardSummary>>,
    generations: Cache<Uuid, u64>,
    next_generation: Arc<AtomicU64>,
}

impl DashboardCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
            // Unbounded: an evicted generation would fall back to 0 and could
            // revive a stale summary
            generations: Cache::builder().build(),
            next_generation: Arc::new(AtomicU64::new(1)),
        }
    }

    async fn key(&self, company_id: Uuid) -> (Uuid, u64) {
        (company_id, self.generations.get(&company_id).await.unwrap_or(0))
    }

    pub async fn get(&self, company_id: &Uuid) -> Option<Arc<DashboardSummary>> {
        let key = self.key(*company_id).await;
        self.inner.get(&key).await
    }

    /// Returns the cached summary or computes and stores it.
    ///
    /// Concurrent misses for the same company share one computation. Errors
    /// are not cached; every waiter of a failed load receives the same error.
    pub async fn get_or_try_insert_with<E, F, Fut>(
        &self,
        company_id: Uuid,
        f: F,
    ) -> Result<Arc<DashboardSummary>, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DashboardSummary, E>>,
        E: Send + Sync + 'static,
    {
        let key = self.key(company_id).await;
        self.inner
            .try_get_with(key, async move {
                tracing::debug!(%company_id, generation = key.1, "Dashboard cache miss");
                f().await.map(Arc::new)
            })
            .await
    }

    pub async fn invalidate(&self, company_id: &Uuid) {
        let previous = self.key(*company_id).await;
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        self.generations.insert(*company_id, generation).await;
        self.inner.invalidate(&previous).await;
    }
}
