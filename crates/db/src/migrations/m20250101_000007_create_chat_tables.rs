//! Create chat room, moderator and message tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatRoom::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatRoom::Id)
                            .string_len(160)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatRoom::Type).string_len(32).not_null())
                    .col(ColumnDef::new(ChatRoom::EntityId).string_len(64).not_null())
                    .col(ColumnDef::new(ChatRoom::Name).string_len(256).not_null())
                    .col(ColumnDef::new(ChatRoom::Description).text())
                    .col(
                        ColumnDef::new(ChatRoom::ActiveUsers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChatRoom::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (type, entity_id) - one room per entity
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_room_type_entity")
                    .table(ChatRoom::Table)
                    .col(ChatRoom::Type)
                    .col(ChatRoom::EntityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatModerator::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChatModerator::RoomId).string_len(160).not_null())
                    .col(ColumnDef::new(ChatModerator::UserId).string_len(64).not_null())
                    .col(
                        ColumnDef::new(ChatModerator::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ChatModerator::RoomId)
                            .col(ChatModerator::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_moderator_room")
                            .from(ChatModerator::Table, ChatModerator::RoomId)
                            .to(ChatRoom::Table, ChatRoom::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChatMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessage::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatMessage::RoomId).string_len(160).not_null())
                    .col(ColumnDef::new(ChatMessage::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(ChatMessage::Content).text().not_null())
                    .col(ColumnDef::new(ChatMessage::Flagged).boolean().not_null().default(false))
                    .col(ColumnDef::new(ChatMessage::Deleted).boolean().not_null().default(false))
                    .col(ColumnDef::new(ChatMessage::IsPinned).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(ChatMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_room")
                            .from(ChatMessage::Table, ChatMessage::RoomId)
                            .to(ChatRoom::Table, ChatRoom::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_user")
                            .from(ChatMessage::Table, ChatMessage::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (room_id, created_at) - room history, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_room_created")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::RoomId)
                    .col(ChatMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: flagged (for the moderation queue)
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_flagged")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::Flagged)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatModerator::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatRoom::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChatRoom {
    Table,
    Id,
    Type,
    EntityId,
    Name,
    Description,
    ActiveUsers,
    CreatedAt,
}

#[derive(Iden)]
enum ChatModerator {
    Table,
    RoomId,
    UserId,
    CreatedAt,
}

#[derive(Iden)]
enum ChatMessage {
    Table,
    Id,
    RoomId,
    UserId,
    Content,
    Flagged,
    Deleted,
    IsPinned,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
