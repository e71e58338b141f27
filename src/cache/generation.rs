//! Generation token cache
//!
//! Every cached query result is stored under `fingerprint:token`, where the
//! token is the group's current generation. Advancing the token makes every
//! older entry unreachable at once; they simply age out through their TTL.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::cache::traits::CacheBackend;
use crate::config::CacheConfig;
use crate::errors::{Result, VisitError};

/// 进程内单调递增序号，同一微秒内生成的 token 也不会重复
static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn new_token() -> String {
    format!(
        "{}.{}",
        Utc::now().timestamp_micros(),
        TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    )
}

pub struct GenerationCache {
    backend: Arc<dyn CacheBackend>,
    group: String,
    ttl: Duration,
}

impl GenerationCache {
    pub const TOKEN_KEY: &'static str = "last_changed";

    pub fn new(backend: Arc<dyn CacheBackend>, group: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend,
            group: group.into(),
            ttl,
        }
    }

    pub fn from_config(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self::new(
            backend,
            config.group.clone(),
            Duration::from_secs(config.default_ttl),
        )
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// 当前 generation token，不存在时创建
    ///
    /// 并发首次读取时只有一个 add 能成功，失败方回读胜出者的值。
    pub async fn token(&self) -> Result<String> {
        if let Some(token) = self.backend.get(&self.group, Self::TOKEN_KEY).await? {
            return Ok(token);
        }

        let candidate = new_token();
        if self
            .backend
            .add(&self.group, Self::TOKEN_KEY, candidate.clone(), None)
            .await?
        {
            debug!("Generation token for '{}' created: {}", self.group, candidate);
            return Ok(candidate);
        }

        Ok(self
            .backend
            .get(&self.group, Self::TOKEN_KEY)
            .await?
            .unwrap_or(candidate))
    }

    /// 推进 generation，旧 token 下的所有条目随即失效
    pub async fn advance(&self) -> Result<String> {
        let token = new_token();
        self.backend
            .set(&self.group, Self::TOKEN_KEY, token.clone(), None)
            .await?;
        debug!("Generation token for '{}' advanced: {}", self.group, token);
        Ok(token)
    }

    pub fn compose_key(fingerprint: &str, token: &str) -> String {
        format!("{}:{}", fingerprint, token)
    }

    /// 反序列化失败的条目按未命中处理
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(payload) = self.backend.get(&self.group, key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding undecodable cache entry '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    pub async fn put<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)
            .map_err(|e| VisitError::cache_degraded(format!("Cannot encode cache entry: {}", e)))?;
        self.backend
            .set(&self.group, key, payload, Some(self.ttl))
            .await
    }
}
