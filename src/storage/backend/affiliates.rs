//! affiliates 表上的计数维护
//!
//! 计数只通过单条 UPDATE 原子增减，从不在内存里读改写。

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, ExprTrait, QueryFilter,
    QuerySelect,
};

use super::retry::{self, RetryPolicy};
use crate::affiliates::AffiliateDirectory;
use crate::errors::{Result, VisitError};

use migration::entities::{AffiliateEntity, affiliate};

#[derive(Clone)]
pub struct SeaOrmAffiliateDirectory {
    db: DatabaseConnection,
    retry: RetryPolicy,
}

impl SeaOrmAffiliateDirectory {
    pub fn new(db: DatabaseConnection, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    /// 登记 affiliate（已存在时不做任何修改）
    pub async fn register(&self, affiliate_id: i64) -> Result<()> {
        let db = &self.db;
        let model = affiliate::ActiveModel {
            affiliate_id: Set(affiliate_id),
            visits: Set(0),
            date_registered: Set(Utc::now()),
        };

        retry::with_retry(&format!("register_affiliate({})", affiliate_id), self.retry, || {
            let model = model.clone();
            async move {
                AffiliateEntity::insert(model)
                    .on_conflict(
                        OnConflict::column(affiliate::Column::AffiliateId)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(db)
                    .await
            }
        })
        .await
        .map_err(|e| VisitError::database_operation(format!("登记 affiliate 失败: {}", e)))?;
        Ok(())
    }

    async fn adjust(&self, affiliate_id: i64, delta: i64) -> Result<()> {
        let db = &self.db;
        let operation = if delta > 0 {
            "increment_affiliate_visits"
        } else {
            "decrement_affiliate_visits"
        };

        retry::with_write_retry(operation, self.retry, || async {
            let update = AffiliateEntity::update_many()
                .filter(affiliate::Column::AffiliateId.eq(affiliate_id));
            let update = if delta > 0 {
                update.col_expr(
                    affiliate::Column::Visits,
                    Expr::col(affiliate::Column::Visits).add(delta),
                )
            } else {
                // 计数不会低于 0
                update
                    .col_expr(
                        affiliate::Column::Visits,
                        Expr::col(affiliate::Column::Visits).sub(-delta),
                    )
                    .filter(affiliate::Column::Visits.gte(-delta))
            };
            update.exec(db).await
        })
        .await
        .map_err(|e| VisitError::database_operation(format!("{} 失败: {}", operation, e)))?;
        Ok(())
    }
}

#[async_trait]
impl AffiliateDirectory for SeaOrmAffiliateDirectory {
    async fn exists(&self, affiliate_id: i64) -> Result<bool> {
        Ok(self.visit_count(affiliate_id).await?.is_some())
    }

    async fn increment_visits(&self, affiliate_id: i64) -> Result<()> {
        self.adjust(affiliate_id, 1).await
    }

    async fn decrement_visits(&self, affiliate_id: i64) -> Result<()> {
        self.adjust(affiliate_id, -1).await
    }

    async fn visit_count(&self, affiliate_id: i64) -> Result<Option<i64>> {
        let db = &self.db;
        retry::with_retry("affiliate_visit_count", self.retry, || async {
            AffiliateEntity::find()
                .select_only()
                .column(affiliate::Column::Visits)
                .filter(affiliate::Column::AffiliateId.eq(affiliate_id))
                .into_tuple::<i64>()
                .one(db)
                .await
        })
        .await
        .map_err(|e| VisitError::database_operation(format!("查询 affiliate 失败: {}", e)))
    }
}
