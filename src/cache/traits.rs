use std::time::Duration;

use async_trait::async_trait;

use crate::errors::Result;

/// 缓存后端
///
/// key 按 group 隔离；值统一为序列化后的字符串，任何后端都能存。
/// 错误只表示后端不可用，调用方据此降级，不会因此让查询失败。
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, group: &str, key: &str) -> Result<Option<String>>;

    /// 覆盖写入；`ttl` 为 None 表示不过期
    async fn set(&self, group: &str, key: &str, value: String, ttl: Option<Duration>)
    -> Result<()>;

    /// 仅在 key 不存在时写入，返回是否写入成功
    async fn add(&self, group: &str, key: &str, value: String, ttl: Option<Duration>)
    -> Result<bool>;
}
