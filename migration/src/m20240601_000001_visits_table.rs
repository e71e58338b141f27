//! visits 表迁移
//!
//! 每一行是一次被追踪的入站点击，归属到某个 affiliate。
//! `referral_id = 0` 表示尚未转化。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Visits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Visits::VisitId)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Visits::AffiliateId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Visits::ReferralId)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Visits::Url).text().not_null())
                    .col(ColumnDef::new(Visits::Referrer).text().not_null())
                    .col(
                        ColumnDef::new(Visits::Campaign)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Visits::Context)
                            .string_len(50)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Visits::Ip)
                            .string_len(45)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Visits::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // affiliate 维度查询与计数
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_visits_affiliate_id")
                    .table(Visits::Table)
                    .col(Visits::AffiliateId)
                    .to_owned(),
            )
            .await?;

        // converted / unconverted 过滤
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_visits_referral_id")
                    .table(Visits::Table)
                    .col(Visits::ReferralId)
                    .to_owned(),
            )
            .await?;

        // 日期范围查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_visits_date")
                    .table(Visits::Table)
                    .col(Visits::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_visits_date").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_visits_referral_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_visits_affiliate_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Visits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Visits {
    #[sea_orm(iden = "visits")]
    Table,
    VisitId,
    AffiliateId,
    ReferralId,
    Url,
    Referrer,
    Campaign,
    Context,
    Ip,
    Date,
}
