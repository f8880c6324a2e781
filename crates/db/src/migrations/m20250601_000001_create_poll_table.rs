//! Create `poll` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Poll::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Poll::Question).string_len(512).not_null())
                    .col(
                        ColumnDef::new(Poll::Options)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Poll::VoteCounts)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Poll::VotersCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Poll::IsContest)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::IsWeekly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Poll::EndsAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Poll::ImageUrl).string_len(2048))
                    .col(ColumnDef::new(Poll::CreatedBy).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Poll::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index on status for listing active/ended polls
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_status")
                    .table(Poll::Table)
                    .col(Poll::Status)
                    .to_owned(),
            )
            .await?;

        // Composite index for finding open polls due to close
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_status_ends_at")
                    .table(Poll::Table)
                    .col(Poll::Status)
                    .col(Poll::EndsAt)
                    .to_owned(),
            )
            .await?;

        // Composite index for locating the featured weekly poll
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_is_weekly_status")
                    .table(Poll::Table)
                    .col(Poll::IsWeekly)
                    .col(Poll::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    Question,
    Options,
    VoteCounts,
    VotersCount,
    IsContest,
    IsWeekly,
    Status,
    EndsAt,
    ImageUrl,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
