pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20240601_000001_visits_table;
mod m20240601_000002_affiliates_table;
mod m20240601_000003_visit_search_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_visits_table::Migration),
            Box::new(m20240601_000002_affiliates_table::Migration),
            Box::new(m20240601_000003_visit_search_index::Migration),
        ]
    }
}
