use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::cache::traits::CacheBackend;
use crate::config::CacheConfig;
use crate::errors::Result;

#[derive(Clone)]
struct CachedValue {
    payload: String,
    ttl: Option<Duration>,
}

/// 每个条目按写入时给定的 TTL 过期；覆盖写入时重新计时
struct PerEntryExpiry;

impl Expiry<String, CachedValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

pub struct MokaCacheBackend {
    inner: Cache<String, CachedValue>,
}

impl MokaCacheBackend {
    pub fn new(config: &CacheConfig) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.memory.max_capacity)
            .expire_after(PerEntryExpiry)
            .build();

        debug!(
            "MokaCacheBackend initialized with max capacity: {}",
            config.memory.max_capacity
        );
        Self { inner }
    }

    fn make_key(group: &str, key: &str) -> String {
        format!("{}:{}", group, key)
    }
}

#[async_trait]
impl CacheBackend for MokaCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, group: &str, key: &str) -> Result<Option<String>> {
        let value = self.inner.get(&Self::make_key(group, key)).await;
        trace!("moka get {}:{} hit={}", group, key, value.is_some());
        Ok(value.map(|v| v.payload))
    }

    async fn set(
        &self,
        group: &str,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.inner
            .insert(
                Self::make_key(group, key),
                CachedValue {
                    payload: value,
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn add(
        &self,
        group: &str,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let entry = self
            .inner
            .entry(Self::make_key(group, key))
            .or_insert(CachedValue {
                payload: value,
                ttl,
            })
            .await;
        Ok(entry.is_fresh())
    }
}
