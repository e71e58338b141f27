use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub affiliate_id: i64,
    /// Denormalized visit counter, maintained by atomic UPDATEs
    pub visits: i64,
    pub date_registered: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
