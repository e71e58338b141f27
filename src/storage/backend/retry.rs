//! 瞬时数据库错误的重试
//!
//! 只有存储层使用；查询服务和写入流程本身从不重试。

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 死锁、锁等待、连接获取失败等可以安全重放的错误
pub fn is_retryable_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => is_transient(runtime_err),
        _ => false,
    }
}

/// 非幂等写入只重放语句尚未执行的错误
///
/// 获取连接失败，或 SQLite 在执行前返回的 BUSY / LOCKED。
/// `DbErr::Conn` 和服务端返回的死锁都可能发生在语句已生效之后，不重放。
pub fn is_retryable_write_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => is_sqlite_busy(runtime_err),
        _ => false,
    }
}

fn database_code(err: &sea_orm::error::RuntimeErr) -> Option<String> {
    use sea_orm::error::RuntimeErr;
    use std::ops::Deref;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => sqlx_err
            .deref()
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code.into_owned()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn is_sqlite_busy(err: &sea_orm::error::RuntimeErr) -> bool {
    match database_code(err) {
        Some(code) => matches!(code.as_str(), "5" | "6"),
        None => err.to_string().to_lowercase().contains("database is locked"),
    }
}

fn is_transient(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            if let Some(code) = database_code(err) {
                return matches!(
                    code.as_str(),
                    // MySQL: deadlock / lock wait timeout
                    "1213" | "1205"
                    // PostgreSQL: serialization failure / deadlock
                    | "40001" | "40P01"
                    // SQLite: BUSY / LOCKED
                    | "5" | "6"
                );
            }
            is_transient_message(&sqlx_err.to_string().to_lowercase())
        }
        RuntimeErr::Internal(msg) => is_transient_message(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn is_transient_message(message: &str) -> bool {
    [
        "deadlock",
        "lock wait timeout",
        "database is locked",
        "serialization failure",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl From<&DatabaseConfig> for RetryPolicy {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

/// 指数退避重试
///
/// 不可重试的错误立即返回；重试耗尽后返回最后一次的错误。
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    retry_when(operation_name, policy, is_retryable_error, operation).await
}

/// 非幂等写入（插入、计数增减）的重试，只重放 [`is_retryable_write_error`] 认可的错误
pub async fn with_write_retry<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    retry_when(operation_name, policy, is_retryable_write_error, operation).await
}

async fn retry_when<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    retryable: fn(&DbErr) -> bool,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(e) if retryable(&e) && attempt < policy.max_retries => {
                attempt += 1;
                let delay = backoff_delay(attempt, policy.base_delay_ms, policy.max_delay_ms);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {} ms",
                    operation_name,
                    attempt,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// base * 2^(attempt-1)，封顶 max，再加 0~25% 抖动
fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    use rand::RngExt;
    let capped = base_ms
        .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
        .min(max_ms);
    let jitter = rand::rng().random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}
