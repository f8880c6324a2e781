//! Contest winner repository.

use std::sync::Arc;

use crate::entities::{ContestWinner, contest_winner};
use pollbox_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Contest winner repository for database operations.
#[derive(Clone)]
pub struct ContestWinnerRepository {
    db: Arc<DatabaseConnection>,
}

impl ContestWinnerRepository {
    /// Create a new contest winner repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the recorded winner for a poll, if resolved.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Option<contest_winner::Model>> {
        ContestWinner::find()
            .filter(contest_winner::Column::PollId.eq(poll_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a winner.
    ///
    /// The unique index on `poll_id` rejects a second winner for the same
    /// poll at the database level.
    pub async fn create(&self, model: contest_winner::ActiveModel) -> AppResult<contest_winner::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample_winner(poll_id: &str) -> contest_winner::Model {
        contest_winner::Model {
            id: "w1".to_string(),
            poll_id: poll_id.to_string(),
            option_index: 0,
            voter_hash: "voter1".to_string(),
            selected_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_poll_found() {
        let winner = sample_winner("poll1");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![winner.clone()]])
            .into_connection();

        let repo = ContestWinnerRepository::new(Arc::new(db));
        let found = repo.find_by_poll("poll1").await.unwrap();

        assert_eq!(found, Some(winner));
    }

    #[tokio::test]
    async fn test_find_by_poll_unresolved() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<contest_winner::Model>::new()])
            .into_connection();

        let repo = ContestWinnerRepository::new(Arc::new(db));
        let found = repo.find_by_poll("poll1").await.unwrap();

        assert!(found.is_none());
    }
}
