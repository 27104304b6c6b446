//! Create election and candidate tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Election::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Election::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Election::CountryId).string_len(64).not_null())
                    .col(ColumnDef::new(Election::Type).string_len(64).not_null())
                    .col(ColumnDef::new(Election::Date).date().not_null())
                    .col(
                        ColumnDef::new(Election::Status)
                            .string_len(32)
                            .not_null()
                            .default("upcoming"),
                    )
                    .col(ColumnDef::new(Election::Description).text().not_null())
                    .col(
                        ColumnDef::new(Election::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_election_country_id")
                    .table(Election::Table)
                    .col(Election::CountryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Candidate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candidate::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Candidate::ElectionId).string_len(64).not_null())
                    .col(ColumnDef::new(Candidate::Name).string_len(500).not_null())
                    .col(ColumnDef::new(Candidate::Party).string_len(500).not_null())
                    .col(ColumnDef::new(Candidate::Image).string_len(2000))
                    .col(ColumnDef::new(Candidate::Bio).text())
                    .col(ColumnDef::new(Candidate::Color).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Candidate::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_candidate_election")
                            .from(Candidate::Table, Candidate::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: election_id (for listing candidates of an election)
        manager
            .create_index(
                Index::create()
                    .name("idx_candidate_election_id")
                    .table(Candidate::Table)
                    .col(Candidate::ElectionId)
                    .to_owned(),
            )
            .await?;

        // Unique index: (id, election_id) - target of the vote's composite foreign key
        manager
            .create_index(
                Index::create()
                    .name("idx_candidate_id_election")
                    .table(Candidate::Table)
                    .col(Candidate::Id)
                    .col(Candidate::ElectionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candidate::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Election::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
    CountryId,
    Type,
    Date,
    Status,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum Candidate {
    Table,
    Id,
    ElectionId,
    Name,
    Party,
    Image,
    Bio,
    Color,
    CreatedAt,
}
