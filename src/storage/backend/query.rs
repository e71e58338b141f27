//! Read operations for SeaOrmVisitStore

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use tracing::{debug, error};

use super::condition::{entity_column, render_condition};
use super::{SeaOrmVisitStore, retry};
use crate::errors::{Result, VisitError};
use crate::query::{NormalizedQuery, Projection, SortOrder, VisitColumn};
use crate::storage::models::{RowSet, Visit};

use migration::entities::{VisitEntity, visit};

/// 无上限但带 offset 时使用的 LIMIT（MySQL / SQLite 不接受单独的 OFFSET）
const UNBOUNDED_LIMIT: u64 = 999_999_999_999;

impl SeaOrmVisitStore {
    /// WHERE 条件，不含排序与分页
    fn filtered(&self, query: &NormalizedQuery) -> Select<VisitEntity> {
        let predicates = query.predicates();
        let select = VisitEntity::find();
        if predicates.is_empty() {
            select
        } else {
            select.filter(render_condition(
                &predicates,
                self.db.get_database_backend(),
            ))
        }
    }

    fn ordered_page(&self, query: &NormalizedQuery) -> Select<VisitEntity> {
        let order = match query.order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };

        let mut select = self
            .filtered(query)
            .order_by(entity_column(query.order_by), order.clone());
        // 非唯一排序列用主键兜底，保证分页稳定
        if query.order_by != VisitColumn::VisitId {
            select = select.order_by(visit::Column::VisitId, order);
        }

        match (query.limit, query.offset) {
            (Some(limit), offset) => select.limit(limit).offset(offset),
            (None, 0) => select,
            (None, offset) => select.limit(UNBOUNDED_LIMIT).offset(offset),
        }
    }

    pub async fn select_rows(&self, query: &NormalizedQuery) -> Result<RowSet> {
        let db = &self.db;
        let select = self.ordered_page(query);

        let rows = match query.projection {
            Projection::All => RowSet::Visits(
                retry::with_retry("select_visits", self.retry, || {
                    let select = select.clone();
                    async move { select.all(db).await }
                })
                .await
                .map_err(|e| read_error("查询 visits 失败", e))?,
            ),
            Projection::Ids => RowSet::Ids(
                self.select_column::<i64>(select, visit::Column::VisitId)
                    .await?,
            ),
            Projection::Column(column) if column.is_integer() => RowSet::Integers(
                self.select_column::<i64>(select, entity_column(column))
                    .await?,
            ),
            Projection::Column(VisitColumn::Date) => RowSet::Timestamps(
                self.select_column::<DateTime<Utc>>(select, visit::Column::Date)
                    .await?,
            ),
            Projection::Column(column) => RowSet::Texts(
                self.select_column::<String>(select, entity_column(column))
                    .await?,
            ),
        };

        debug!(
            "{} select returned {} rows",
            self.backend_name,
            rows.len()
        );
        Ok(rows)
    }

    async fn select_column<T>(
        &self,
        select: Select<VisitEntity>,
        column: visit::Column,
    ) -> Result<Vec<T>>
    where
        T: sea_orm::TryGetableMany + Send + Sync,
    {
        let db = &self.db;
        retry::with_retry("select_visit_column", self.retry, || {
            let select = select.clone();
            async move {
                select
                    .select_only()
                    .column(column)
                    .into_tuple::<T>()
                    .all(db)
                    .await
            }
        })
        .await
        .map_err(|e| read_error("查询 visit 列失败", e))
    }

    pub async fn count_rows(&self, query: &NormalizedQuery) -> Result<u64> {
        let db = &self.db;
        let select = self.filtered(query);

        retry::with_retry("count_visits", self.retry, || {
            let select = select.clone();
            async move { select.count(db).await }
        })
        .await
        .map_err(|e| read_error("统计 visits 失败", e))
    }

    pub async fn find_visit(&self, visit_id: i64) -> Result<Option<Visit>> {
        let db = &self.db;

        let model = retry::with_retry("get_visit", self.retry, || async {
            VisitEntity::find()
                .filter(visit::Column::VisitId.eq(visit_id))
                .one(db)
                .await
        })
        .await
        .map_err(|e| read_error("查询 visit 失败", e))?;

        Ok(model.map(Visit::from))
    }
}

fn read_error(context: &str, err: sea_orm::DbErr) -> VisitError {
    error!("{}（重试后仍失败）: {}", context, err);
    VisitError::database_operation(format!("{}: {}", context, err))
}
