//! Create vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vote::Id).string_len(64).not_null().primary_key())
                    .col(ColumnDef::new(Vote::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Vote::ElectionId).string_len(64).not_null())
                    .col(ColumnDef::new(Vote::CandidateId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_user")
                            .from(Vote::Table, Vote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_election")
                            .from(Vote::Table, Vote::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // The candidate must belong to the election the vote is cast in.
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_candidate_election")
                            .from(Vote::Table, (Vote::CandidateId, Vote::ElectionId))
                            .to(Candidate::Table, (Candidate::Id, Candidate::ElectionId))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, election_id) - one vote per user per election
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_user_election")
                    .table(Vote::Table)
                    .col(Vote::UserId)
                    .col(Vote::ElectionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: candidate_id (for tallies)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_candidate_id")
                    .table(Vote::Table)
                    .col(Vote::CandidateId)
                    .to_owned(),
            )
            .await?;

        // Index: election_id (for per-election totals)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_election_id")
                    .table(Vote::Table)
                    .col(Vote::ElectionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    UserId,
    ElectionId,
    CandidateId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
}

#[derive(Iden)]
enum Candidate {
    Table,
    Id,
    ElectionId,
}
