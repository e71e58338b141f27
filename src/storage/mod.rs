use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::query::NormalizedQuery;

pub mod backend;
pub mod models;

pub use backend::{SeaOrmAffiliateDirectory, SeaOrmVisitStore};
pub use models::{NewVisit, RowSet, Visit, VisitChanges};

/// visits 表的持久化访问
///
/// 实现者负责自己的瞬时错误重试；返回的错误一律视为存储错误向上传播。
#[async_trait]
pub trait VisitStore: Send + Sync {
    fn backend_name(&self) -> &str;

    /// 按规范化查询取行（投影、排序、分页都由查询决定）
    async fn select(&self, query: &NormalizedQuery) -> Result<RowSet>;

    /// 忽略分页的匹配行数
    async fn count(&self, query: &NormalizedQuery) -> Result<u64>;

    async fn get(&self, visit_id: i64) -> Result<Option<Visit>>;

    /// 写入已规范化的访问，返回新主键
    async fn insert(&self, visit: &NewVisit) -> Result<i64>;

    async fn update(&self, visit_id: i64, changes: &VisitChanges) -> Result<()>;
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &DatabaseConfig) -> Result<Arc<SeaOrmVisitStore>> {
        let store = SeaOrmVisitStore::new(config).await?;
        Ok(Arc::new(store))
    }
}
