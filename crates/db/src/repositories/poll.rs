//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, poll, poll::PollStatus};
use chrono::{DateTime, Utc};
use pollbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, poll_id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(poll_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning an error if not found.
    pub async fn get_by_id(&self, poll_id: &str) -> AppResult<poll::Model> {
        self.find_by_id(poll_id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(poll_id.to_string()))
    }

    /// Create a new poll.
    pub async fn create(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a poll. Votes and any winner row cascade.
    pub async fn delete(&self, poll_id: &str) -> AppResult<()> {
        Poll::delete_by_id(poll_id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List open polls, the featured weekly poll first, newest after.
    pub async fn find_active(&self, limit: u64, offset: u64) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::Status.eq(PollStatus::Active))
            .order_by_desc(poll::Column::IsWeekly)
            .order_by_desc(poll::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List ended polls, most recently closed first.
    pub async fn find_past(&self, limit: u64, offset: u64) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::Status.eq(PollStatus::Ended))
            .order_by_desc(poll::Column::EndsAt)
            .order_by_desc(poll::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the currently featured weekly poll, if any.
    pub async fn find_current_weekly(&self) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::IsWeekly.eq(true))
            .filter(poll::Column::Status.eq(PollStatus::Active))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find open polls whose scheduled end time has passed.
    pub async fn find_due_to_close(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::Status.eq(PollStatus::Active))
            .filter(poll::Column::EndsAt.is_not_null())
            .filter(poll::Column::EndsAt.lte(now))
            .order_by_asc(poll::Column::EndsAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the oldest poll eligible to become the next weekly feature.
    ///
    /// Eligible polls are drafts or already-open polls that are not
    /// currently featured. Ended and archived polls never come back.
    pub async fn find_rotation_candidate(&self) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::IsWeekly.eq(false))
            .filter(poll::Column::Status.is_in([PollStatus::Draft, PollStatus::Active]))
            .order_by_asc(poll::Column::CreatedAt)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn sample_poll(id: &str, status: PollStatus) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            question: "Which do you prefer?".to_string(),
            options: serde_json::json!(["Cat", "Dog"]),
            vote_counts: serde_json::json!([0, 0]),
            voters_count: 0,
            is_contest: false,
            is_weekly: false,
            status,
            ends_at: None,
            image_url: None,
            created_by: "creator-hash".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let poll = sample_poll("poll1", PollStatus::Active);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![poll.clone()]])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let found = repo.find_by_id("poll1").await.unwrap();

        assert_eq!(found, Some(poll));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PollNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_due_to_close_returns_overdue_polls() {
        let mut overdue = sample_poll("poll1", PollStatus::Active);
        overdue.ends_at = Some((Utc::now() - chrono::Duration::minutes(5)).into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![overdue.clone()]])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let due = repo.find_due_to_close(Utc::now(), 10).await.unwrap();

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "poll1");
    }

    #[tokio::test]
    async fn test_find_current_weekly_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let weekly = repo.find_current_weekly().await.unwrap();

        assert!(weekly.is_none());
    }

    #[tokio::test]
    async fn test_find_rotation_candidate() {
        let candidate = sample_poll("poll2", PollStatus::Draft);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![candidate.clone()]])
            .into_connection();

        let repo = PollRepository::new(Arc::new(db));
        let found = repo.find_rotation_candidate().await.unwrap();

        assert_eq!(found, Some(candidate));
    }
}
