//! Database migrations.
//!
//! Schema migrations for the database. Every uniqueness invariant of the
//! engine is declared here as a store-level constraint.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_election_tables;
mod m20250101_000003_create_news_table;
mod m20250101_000004_create_vote_table;
mod m20250101_000005_create_comment_table;
mod m20250101_000006_create_comment_like_reaction_tables;
mod m20250101_000007_create_chat_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_election_tables::Migration),
            Box::new(m20250101_000003_create_news_table::Migration),
            Box::new(m20250101_000004_create_vote_table::Migration),
            Box::new(m20250101_000005_create_comment_table::Migration),
            Box::new(m20250101_000006_create_comment_like_reaction_tables::Migration),
            Box::new(m20250101_000007_create_chat_tables::Migration),
        ]
    }
}
