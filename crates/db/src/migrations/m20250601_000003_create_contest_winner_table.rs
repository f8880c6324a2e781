//! Create `contest_winner` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContestWinner::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContestWinner::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContestWinner::PollId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContestWinner::OptionIndex)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContestWinner::VoterHash)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContestWinner::SelectedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contest_winner_poll")
                            .from(ContestWinner::Table, ContestWinner::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A contest resolves at most once, enforced at the database level
        manager
            .create_index(
                Index::create()
                    .name("idx_contest_winner_poll_id")
                    .table(ContestWinner::Table)
                    .col(ContestWinner::PollId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContestWinner::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ContestWinner {
    Table,
    Id,
    PollId,
    OptionIndex,
    VoterHash,
    SelectedAt,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}
