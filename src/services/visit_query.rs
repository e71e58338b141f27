//! Visit query service
//!
//! normalize → fingerprint → generation token → cache lookup → store.
//! Storage errors propagate and are never cached. Cache errors are logged
//! and the request falls through to the store.

use std::future::Future;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::cache::GenerationCache;
use crate::errors::Result;
use crate::query::{NormalizedQuery, PredicateBuilder, QueryKind, VisitQuery, fingerprint};
use crate::services::hydrator::{QueryOutput, hydrate};
use crate::storage::VisitStore;

pub struct VisitQueryService {
    store: Arc<dyn VisitStore>,
    cache: Arc<GenerationCache>,
}

impl VisitQueryService {
    pub fn new(store: Arc<dyn VisitStore>, cache: Arc<GenerationCache>) -> Self {
        Self { store, cache }
    }

    pub async fn query(&self, request: &VisitQuery) -> Result<QueryOutput> {
        let normalized = PredicateBuilder::normalize(request)?;
        self.cached(&normalized, QueryKind::Rows, || async {
            let rows = self.store.select(&normalized).await?;
            Ok(hydrate(rows))
        })
        .await
    }

    pub async fn count(&self, request: &VisitQuery) -> Result<u64> {
        let normalized = PredicateBuilder::normalize(request)?.for_count();
        self.cached(&normalized, QueryKind::Count, || async {
            self.store.count(&normalized).await
        })
        .await
    }

    async fn cached<T, F, Fut>(&self, normalized: &NormalizedQuery, kind: QueryKind, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(key) = self.cache_key(normalized, kind).await else {
            return load().await;
        };

        match self.cache.get::<T>(&key).await {
            Ok(Some(hit)) => {
                debug!("Visit cache hit: {}", key);
                return Ok(hit);
            }
            Ok(None) => debug!("Visit cache miss: {}", key),
            Err(e) => warn!("Visit cache read failed, querying store directly: {}", e),
        }

        let value = load().await?;

        if let Err(e) = self.cache.put(&key, &value).await {
            warn!("Visit cache write failed for {}: {}", key, e);
        }
        Ok(value)
    }

    /// 拿不到 token 时返回 None，本次请求不走缓存
    async fn cache_key(&self, normalized: &NormalizedQuery, kind: QueryKind) -> Option<String> {
        let fingerprint = match fingerprint(normalized, kind) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!("Cannot fingerprint visit query: {}", e);
                return None;
            }
        };

        match self.cache.token().await {
            Ok(token) => Some(GenerationCache::compose_key(&fingerprint, &token)),
            Err(e) => {
                warn!(
                    "Generation token unavailable ({}), bypassing cache: {}",
                    self.cache.backend_name(),
                    e
                );
                None
            }
        }
    }
}
