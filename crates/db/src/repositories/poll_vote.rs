//! Poll vote repository.

use std::sync::Arc;

use crate::entities::{PollVote, poll_vote};
use pollbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Poll vote repository for database operations.
#[derive(Clone)]
pub struct PollVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl PollVoteRepository {
    /// Create a new poll vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a vote.
    pub async fn create(&self, model: poll_vote::ActiveModel) -> AppResult<poll_vote::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether a voter has already voted on a poll.
    pub async fn has_voted(&self, poll_id: &str, voter_hash: &str) -> AppResult<bool> {
        let count = PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .filter(poll_vote::Column::VoterHash.eq(voter_hash))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Find a voter's vote on a poll, if any.
    pub async fn find_by_voter(
        &self,
        poll_id: &str,
        voter_hash: &str,
    ) -> AppResult<Option<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .filter(poll_vote::Column::VoterHash.eq(voter_hash))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All votes cast on a poll, oldest first.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .order_by_asc(poll_vote::Column::CreatedAt)
            .order_by_asc(poll_vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count votes cast on a poll.
    ///
    /// One vote per voter, so this also counts voters.
    pub async fn count_for_poll(&self, poll_id: &str) -> AppResult<u64> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
