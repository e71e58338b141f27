use std::time::Duration;

use async_trait::async_trait;

use crate::cache::traits::CacheBackend;
use crate::errors::Result;

/// 不缓存任何内容，每次查询都直达存储
pub struct NullCacheBackend;

#[async_trait]
impl CacheBackend for NullCacheBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn get(&self, _group: &str, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(
        &self,
        _group: &str,
        _key: &str,
        _value: String,
        _ttl: Option<Duration>,
    ) -> Result<()> {
        Ok(())
    }

    async fn add(
        &self,
        _group: &str,
        _key: &str,
        _value: String,
        _ttl: Option<Duration>,
    ) -> Result<bool> {
        Ok(true)
    }
}
