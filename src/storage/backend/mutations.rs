//! Write operations for SeaOrmVisitStore

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::debug;

use super::converters::{changes_to_active_model, new_visit_to_active_model};
use super::{SeaOrmVisitStore, retry};
use crate::errors::{Result, VisitError};
use crate::storage::models::{NewVisit, VisitChanges};

use migration::entities::{VisitEntity, visit};

impl SeaOrmVisitStore {
    pub async fn insert_visit(&self, new_visit: &NewVisit) -> Result<i64> {
        let db = &self.db;
        let model = new_visit_to_active_model(new_visit);

        let result = retry::with_write_retry("insert_visit", self.retry, || {
            let model = model.clone();
            async move { VisitEntity::insert(model).exec(db).await }
        })
        .await
        .map_err(|e| VisitError::database_operation(format!("写入 visit 失败: {}", e)))?;

        debug!(
            "Inserted visit {} for affiliate {}",
            result.last_insert_id, new_visit.affiliate_id
        );
        Ok(result.last_insert_id)
    }

    pub async fn update_visit(&self, visit_id: i64, changes: &VisitChanges) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let db = &self.db;
        let model = changes_to_active_model(changes);

        retry::with_retry(&format!("update_visit({})", visit_id), self.retry, || {
            let model = model.clone();
            async move {
                VisitEntity::update_many()
                    .set(model)
                    .filter(visit::Column::VisitId.eq(visit_id))
                    .exec(db)
                    .await
            }
        })
        .await
        .map_err(|e| VisitError::database_operation(format!("更新 visit {} 失败: {}", visit_id, e)))?;

        Ok(())
    }
}
