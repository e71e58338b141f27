//! Affiliate directory
//!
//! The visit core only needs three things from whoever owns affiliates:
//! an existence check for reassignment and atomic counter adjustment.

use async_trait::async_trait;

use crate::errors::Result;

pub mod memory;

pub use crate::storage::backend::SeaOrmAffiliateDirectory;
pub use memory::MemoryAffiliateDirectory;

#[async_trait]
pub trait AffiliateDirectory: Send + Sync {
    async fn exists(&self, affiliate_id: i64) -> Result<bool>;

    /// visits + 1；affiliate 不存在时不做任何事
    async fn increment_visits(&self, affiliate_id: i64) -> Result<()>;

    /// visits - 1，不会低于 0
    async fn decrement_visits(&self, affiliate_id: i64) -> Result<()>;

    /// None 表示 affiliate 不存在
    async fn visit_count(&self, affiliate_id: i64) -> Result<Option<i64>>;
}
