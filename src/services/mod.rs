//! Service layer
//!
//! `VisitService` is the single entry point: cached reads through
//! `VisitQueryService`, writes through `VisitMutator` with the counter and
//! generation hooks attached.

pub mod hooks;
pub mod hydrator;
pub mod visit_mutation;
pub mod visit_query;

use std::sync::Arc;

use tracing::info;

use crate::affiliates::AffiliateDirectory;
use crate::cache::{GenerationCache, create_cache_backend};
use crate::config::StaticConfig;
use crate::errors::Result;
use crate::query::VisitQuery;
use crate::storage::{NewVisit, SeaOrmVisitStore, Visit, VisitChanges, VisitStore};

pub use hooks::{AffiliateCounterHook, GenerationAdvanceHook, PostCommitHook, VisitMutation};
pub use hydrator::{ColumnValue, QueryOutput, hydrate};
pub use visit_mutation::{MAX_TAG_LEN, VisitMutator};
pub use visit_query::VisitQueryService;

pub struct VisitService {
    store: Arc<dyn VisitStore>,
    queries: VisitQueryService,
    mutator: VisitMutator,
}

impl VisitService {
    /// 组装服务，挂上计数维护与缓存失效两个提交后钩子
    pub fn new(
        store: Arc<dyn VisitStore>,
        cache: Arc<GenerationCache>,
        directory: Arc<dyn AffiliateDirectory>,
        config: &StaticConfig,
    ) -> Self {
        let mutator = VisitMutator::new(store.clone(), directory.clone(), &config.tracking)
            .with_hook(Arc::new(AffiliateCounterHook::new(directory)))
            .with_hook(Arc::new(GenerationAdvanceHook::new(cache.clone())));

        Self {
            queries: VisitQueryService::new(store.clone(), cache),
            store,
            mutator,
        }
    }

    /// 按配置连接数据库、执行迁移并创建缓存后端
    pub async fn from_config(config: &StaticConfig) -> Result<Self> {
        let store = SeaOrmVisitStore::new(&config.database).await?;
        let directory = Arc::new(store.affiliate_directory());
        let backend = create_cache_backend(&config.cache).await?;
        let cache = Arc::new(GenerationCache::from_config(backend, &config.cache));

        info!(
            "VisitService ready: store={}, cache={}, group={}",
            store.backend_name(),
            cache.backend_name(),
            cache.group()
        );
        Ok(Self::new(Arc::new(store), cache, directory, config))
    }

    /// 完整 visit 列表（忽略请求中的 fields）
    pub async fn list_visits(&self, request: &VisitQuery) -> Result<Vec<Visit>> {
        let request = request.clone().fields("*");
        let output = self.queries.query(&request).await?;
        Ok(output.into_visits().unwrap_or_default())
    }

    pub async fn query_visits(&self, request: &VisitQuery) -> Result<QueryOutput> {
        self.queries.query(request).await
    }

    pub async fn count_visits(&self, request: &VisitQuery) -> Result<u64> {
        self.queries.count(request).await
    }

    pub async fn add_visit(&self, visit: NewVisit) -> Result<i64> {
        self.mutator.add_visit(visit).await
    }

    pub async fn update_visit(&self, visit_id: i64, changes: VisitChanges) -> Result<i64> {
        self.mutator.update_visit(visit_id, changes).await
    }

    /// 直接读存储，不经过缓存
    pub async fn get_visit(&self, visit_id: i64) -> Result<Option<Visit>> {
        self.store.get(visit_id).await
    }
}
