//! SeaORM storage backend
//!
//! Visit persistence on SQLite, MySQL/MariaDB or PostgreSQL. Reads take a
//! `NormalizedQuery` and render its predicates per backend; counter updates
//! on the affiliates table are single atomic statements.

mod affiliates;
pub mod condition;
mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{Result, VisitError};
use crate::query::NormalizedQuery;
use crate::storage::VisitStore;
use crate::storage::models::{NewVisit, RowSet, Visit, VisitChanges};

pub use affiliates::SeaOrmAffiliateDirectory;
pub use condition::render_condition;
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{changes_to_active_model, new_visit_to_active_model};
pub use retry::RetryPolicy;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(VisitError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

#[derive(Clone)]
pub struct SeaOrmVisitStore {
    db: DatabaseConnection,
    backend_name: String,
    retry: RetryPolicy,
}

impl SeaOrmVisitStore {
    /// 连接数据库并执行迁移
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(VisitError::database_config("database_url 未设置"));
        }

        let backend_name = infer_backend_from_url(&config.database_url)?;
        let db = if backend_name == "sqlite" {
            connect_sqlite(&config.database_url).await?
        } else {
            connect_generic(config, &backend_name).await?
        };

        run_migrations(&db).await?;

        info!("{} visit store initialized", backend_name.to_uppercase());
        Ok(Self {
            db,
            backend_name,
            retry: RetryPolicy::from(config),
        })
    }

    /// 复用已有连接（不执行迁移）
    pub fn from_connection(db: DatabaseConnection, retry: RetryPolicy) -> Self {
        let backend_name = match db.get_database_backend() {
            sea_orm::DbBackend::MySql => "mysql",
            sea_orm::DbBackend::Postgres => "postgres",
            _ => "sqlite",
        }
        .to_string();
        Self {
            db,
            backend_name,
            retry,
        }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 共享同一连接池的 affiliate 目录
    pub fn affiliate_directory(&self) -> SeaOrmAffiliateDirectory {
        SeaOrmAffiliateDirectory::new(self.db.clone(), self.retry)
    }
}

#[async_trait]
impl VisitStore for SeaOrmVisitStore {
    fn backend_name(&self) -> &str {
        &self.backend_name
    }

    async fn select(&self, query: &NormalizedQuery) -> Result<RowSet> {
        self.select_rows(query).await
    }

    async fn count(&self, query: &NormalizedQuery) -> Result<u64> {
        self.count_rows(query).await
    }

    async fn get(&self, visit_id: i64) -> Result<Option<Visit>> {
        self.find_visit(visit_id).await
    }

    async fn insert(&self, visit: &NewVisit) -> Result<i64> {
        self.insert_visit(visit).await
    }

    async fn update(&self, visit_id: i64, changes: &VisitChanges) -> Result<()> {
        self.update_visit(visit_id, changes).await
    }
}
