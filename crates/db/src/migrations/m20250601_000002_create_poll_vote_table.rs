//! Create `poll_vote` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PollVote::PollId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PollVote::VoterHash)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PollVote::OptionIndex).integer().not_null())
                    .col(
                        ColumnDef::new(PollVote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_vote_poll")
                            .from(PollVote::Table, PollVote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index on poll_id for tallying a poll's votes
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_vote_poll_id")
                    .table(PollVote::Table)
                    .col(PollVote::PollId)
                    .to_owned(),
            )
            .await?;

        // One vote per voter per poll, enforced at the database level
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_vote_poll_id_voter_hash")
                    .table(PollVote::Table)
                    .col(PollVote::PollId)
                    .col(PollVote::VoterHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollVote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollVote {
    Table,
    Id,
    PollId,
    VoterHash,
    OptionIndex,
    CreatedAt,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}
