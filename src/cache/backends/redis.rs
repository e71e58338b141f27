use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::cache::traits::CacheBackend;
use crate::config::CacheConfig;
use crate::errors::{Result, VisitError};

/// Redis 后端，多个实例共享同一个 generation token
pub struct RedisCacheBackend {
    client: redis::Client,
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisCacheBackend {
    /// 建立连接并 PING 一次
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        let redis_config = &config.redis;
        let client = redis::Client::open(redis_config.url.as_str()).map_err(|e| {
            VisitError::cache_degraded(format!("Invalid Redis URL '{}': {}", redis_config.url, e))
        })?;

        let backend = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: redis_config.key_prefix.clone(),
        };

        let mut conn = backend.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(
            "RedisCacheBackend connected ({}), prefix: '{}'",
            pong, backend.key_prefix
        );
        Ok(backend)
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        {
            let guard = self.connection.read().await;
            if let Some(ref conn) = *guard {
                return Ok(conn.clone());
            }
        }

        let mut guard = self.connection.write().await;
        // 双重检查
        if let Some(ref conn) = *guard {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        *guard = Some(conn.clone());
        debug!("Redis connection established and cached");
        Ok(conn)
    }

    /// 出错后丢弃缓存的连接，下次调用重新建立
    async fn reset_connection(&self) {
        *self.connection.write().await = None;
        debug!("Redis connection reset due to error");
    }

    async fn on_error<T>(&self, op: &str, key: &str, err: redis::RedisError) -> Result<T> {
        warn!("Redis {} failed for '{}': {}", op, key, err);
        self.reset_connection().await;
        Err(err.into())
    }

    fn make_key(&self, group: &str, key: &str) -> String {
        format!("{}{}:{}", self.key_prefix, group, key)
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, group: &str, key: &str) -> Result<Option<String>> {
        let redis_key = self.make_key(group, key);
        let mut conn = self.get_connection().await?;

        match conn.get::<_, Option<String>>(&redis_key).await {
            Ok(value) => {
                trace!("Redis get {} hit={}", redis_key, value.is_some());
                Ok(value)
            }
            Err(e) => self.on_error("GET", &redis_key, e).await,
        }
    }

    async fn set(
        &self,
        group: &str,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let redis_key = self.make_key(group, key);
        let mut conn = self.get_connection().await?;

        let result = match ttl {
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(&redis_key, value, ttl.as_secs().max(1))
                    .await
            }
            None => conn.set::<_, _, ()>(&redis_key, value).await,
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => self.on_error("SET", &redis_key, e).await,
        }
    }

    async fn add(
        &self,
        group: &str,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let redis_key = self.make_key(group, key);
        let mut conn = self.get_connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(&redis_key).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl.as_secs().max(1));
        }

        // NX 未写入时返回 nil
        match cmd.query_async::<Option<String>>(&mut conn).await {
            Ok(reply) => Ok(reply.is_some()),
            Err(e) => self.on_error("SET NX", &redis_key, e).await,
        }
    }
}
