//! Create news table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(News::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(News::Id).string_len(64).not_null().primary_key())
                    .col(ColumnDef::new(News::CountryId).string_len(64).not_null())
                    .col(ColumnDef::new(News::ElectionId).string_len(64))
                    .col(ColumnDef::new(News::Title).string_len(512).not_null())
                    .col(ColumnDef::new(News::Content).text().not_null())
                    .col(ColumnDef::new(News::Image).string_len(2000))
                    .col(
                        ColumnDef::new(News::Priority)
                            .string_len(32)
                            .not_null()
                            .default("general"),
                    )
                    .col(
                        ColumnDef::new(News::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_news_election")
                            .from(News::Table, News::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_news_country_id")
                    .table(News::Table)
                    .col(News::CountryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(News::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum News {
    Table,
    Id,
    CountryId,
    ElectionId,
    Title,
    Content,
    Image,
    Priority,
    CreatedAt,
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
}
