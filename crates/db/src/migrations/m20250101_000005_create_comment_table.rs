//! Create comment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comment::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comment::ElectionId).string_len(64))
                    .col(ColumnDef::new(Comment::NewsId).string_len(64))
                    .col(ColumnDef::new(Comment::ParentCommentId).string_len(64))
                    .col(ColumnDef::new(Comment::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Comment::Content).text().not_null())
                    .col(ColumnDef::new(Comment::Likes).integer().not_null().default(0))
                    .col(ColumnDef::new(Comment::Flagged).boolean().not_null().default(false))
                    .col(ColumnDef::new(Comment::Approved).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Comment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Exactly one subject: election xor news
                    .check(Expr::cust("(election_id IS NULL) <> (news_id IS NULL)"))
                    .check(Expr::cust("likes >= 0"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_user")
                            .from(Comment::Table, Comment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_election")
                            .from(Comment::Table, Comment::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_news")
                            .from(Comment::Table, Comment::NewsId)
                            .to(News::Table, News::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // Deleting a parent orphans its replies instead of removing them
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comment_parent")
                            .from(Comment::Table, Comment::ParentCommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (election_id, created_at) - election threads, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_election_created")
                    .table(Comment::Table)
                    .col(Comment::ElectionId)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (news_id, created_at) - news threads, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_news_created")
                    .table(Comment::Table)
                    .col(Comment::NewsId)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: parent_comment_id (for loading replies)
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_parent_id")
                    .table(Comment::Table)
                    .col(Comment::ParentCommentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
    ElectionId,
    NewsId,
    ParentCommentId,
    UserId,
    Content,
    Likes,
    Flagged,
    Approved,
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
enum News {
    Table,
    Id,
}
