use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Affiliates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Affiliates::AffiliateId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::Visits)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::DateRegistered)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Affiliates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Affiliates {
    #[sea_orm(iden = "affiliates")]
    Table,
    AffiliateId,
    Visits,
    DateRegistered,
}
