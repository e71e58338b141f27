use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let conn = manager.get_connection();

        match backend {
            DatabaseBackend::Postgres => {
                // PostgreSQL: pg_trgm + GIN 索引支持 LIKE '%keyword%' 搜索（referrer / url / ip）
                conn.execute_unprepared("CREATE EXTENSION IF NOT EXISTS pg_trgm")
                    .await?;

                conn.execute_unprepared(
                    "CREATE INDEX IF NOT EXISTS idx_visits_referrer_trgm ON visits USING GIN (referrer gin_trgm_ops)",
                )
                .await?;

                conn.execute_unprepared(
                    "CREATE INDEX IF NOT EXISTS idx_visits_url_trgm ON visits USING GIN (url gin_trgm_ops)",
                )
                .await?;

                conn.execute_unprepared(
                    "CREATE INDEX IF NOT EXISTS idx_visits_ip_trgm ON visits USING GIN (ip gin_trgm_ops)",
                )
                .await?;
            }
            _ => {
                // MySQL / SQLite: B-Tree 索引对 '%keyword%' 无效，不做处理
            }
        }

        // 所有数据库：(affiliate_id, date) 复合索引，用于单 affiliate 的时间序列查询
        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_visits_affiliate_date ON visits (affiliate_id, date)",
        )
        .await
        .ok(); // MySQL 不支持 IF NOT EXISTS，忽略错误

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_visits_affiliate_date")
            .await
            .ok();

        if backend == DatabaseBackend::Postgres {
            conn.execute_unprepared("DROP INDEX IF EXISTS idx_visits_ip_trgm")
                .await?;
            conn.execute_unprepared("DROP INDEX IF EXISTS idx_visits_url_trgm")
                .await?;
            conn.execute_unprepared("DROP INDEX IF EXISTS idx_visits_referrer_trgm")
                .await?;
            // 不删除 pg_trgm 扩展，可能被其他表使用
        }

        Ok(())
    }
}
