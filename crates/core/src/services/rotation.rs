//! Weekly poll rotation.
//!
//! Two states, stored implicitly as "the at-most-one active poll with
//! `is_weekly = true`": when no weekly is active, the next scheduled
//! trigger features one; when a featured poll's end date passes, the
//! close pass ends it and clears the flag. Ended contest polls are
//! handed to the contest service on the way out.

use chrono::{Duration, Utc};
use pollbox_common::{AppError, AppResult};
use pollbox_db::{
    entities::{poll, poll::PollStatus},
    repositories::PollRepository,
};
use sea_orm::Set;
use tracing::{info, warn};

use super::contest::ContestService;
use super::locks::PollLocks;

/// How many overdue polls one close pass handles.
const CLOSE_BATCH_SIZE: u64 = 50;

/// Rotation service driving the weekly featured poll.
#[derive(Clone)]
pub struct RotationService {
    poll_repo: PollRepository,
    contest: ContestService,
    locks: PollLocks,
    weekly_duration_days: i64,
}

impl RotationService {
    /// Create a new rotation service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        contest: ContestService,
        locks: PollLocks,
        weekly_duration_days: i64,
    ) -> Self {
        Self {
            poll_repo,
            contest,
            locks,
            weekly_duration_days,
        }
    }

    /// Feature the next weekly poll if the slot is free.
    ///
    /// No-op while a weekly poll is already active. Otherwise the oldest
    /// eligible poll is promoted: flagged weekly, published if still a
    /// draft, and given a default end date when it has none.
    pub async fn rotate(&self) -> AppResult<Option<poll::Model>> {
        if self.poll_repo.find_current_weekly().await?.is_some() {
            return Ok(None);
        }

        let Some(candidate) = self.poll_repo.find_rotation_candidate().await? else {
            return Ok(None);
        };

        let poll_id = candidate.id.clone();
        let needs_end_date = candidate.ends_at.is_none();

        let mut active: poll::ActiveModel = candidate.into();
        active.is_weekly = Set(true);
        active.status = Set(PollStatus::Active);
        if needs_end_date {
            let ends_at = Utc::now() + Duration::days(self.weekly_duration_days);
            active.ends_at = Set(Some(ends_at.into()));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let featured = self.poll_repo.update(active).await?;
        info!(poll_id = %poll_id, "Featured new weekly poll");
        Ok(Some(featured))
    }

    /// End every open poll whose scheduled end time has passed.
    ///
    /// Clears the weekly flag so the rotation slot frees up, then hands
    /// ended contest polls to resolution. A contest that cannot be
    /// resolved stays ended and unresolved; the next manual retry can
    /// pick it up. Returns the number of polls closed.
    pub async fn close_due(&self) -> AppResult<u64> {
        let due = self
            .poll_repo
            .find_due_to_close(Utc::now(), CLOSE_BATCH_SIZE)
            .await?;

        let mut closed = 0u64;
        for poll in due {
            let poll_id = poll.id.clone();
            let is_contest = poll.is_contest;

            {
                let lock = self.locks.for_poll(&poll_id).await;
                let _guard = lock.lock().await;

                let mut active: poll::ActiveModel = poll.into();
                active.status = Set(PollStatus::Ended);
                active.is_weekly = Set(false);
                active.updated_at = Set(Some(Utc::now().into()));
                self.poll_repo.update(active).await?;
            }
            closed += 1;
            info!(poll_id = %poll_id, "Closed poll past its end time");

            if is_contest {
                match self.contest.resolve(&poll_id).await {
                    Ok(winner) => {
                        info!(
                            poll_id = %poll_id,
                            option_index = winner.option_index,
                            "Drew contest winner"
                        );
                    }
                    Err(AppError::NoVotes(_)) => {
                        warn!(poll_id = %poll_id, "Contest ended with no votes; left unresolved");
                    }
                    Err(AppError::AlreadyResolved(_)) => {}
                    Err(e) => {
                        warn!(poll_id = %poll_id, error = %e, "Contest resolution failed");
                    }
                }
            }
        }

        // The registry keeps an entry per poll ever locked; drop the
        // ones no in-flight operation holds.
        self.locks.cleanup().await;

        Ok(closed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pollbox_db::entities::{contest_winner, poll_vote};
    use pollbox_db::repositories::{ContestWinnerRepository, PollVoteRepository};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;
    use std::sync::Arc;

    fn stored_poll(id: &str, status: PollStatus) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            question: "Cats or dogs?".to_string(),
            options: json!(["Cat", "Dog"]),
            vote_counts: json!([0, 0]),
            voters_count: 0,
            is_contest: false,
            is_weekly: false,
            status,
            ends_at: None,
            image_url: None,
            created_by: "creator".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: sea_orm::DatabaseConnection) -> RotationService {
        service_with_locks(db, PollLocks::new())
    }

    fn service_with_locks(db: sea_orm::DatabaseConnection, locks: PollLocks) -> RotationService {
        let db = Arc::new(db);
        let contest = ContestService::new(
            PollRepository::new(db.clone()),
            PollVoteRepository::new(db.clone()),
            ContestWinnerRepository::new(db.clone()),
            locks.clone(),
        );
        RotationService::new(PollRepository::new(db), contest, locks, 7)
    }

    #[tokio::test]
    async fn test_rotate_is_noop_with_active_weekly() {
        let mut weekly = stored_poll("poll1", PollStatus::Active);
        weekly.is_weekly = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![weekly]])
            .into_connection();

        let featured = service(db).rotate().await.unwrap();

        assert!(featured.is_none());
    }

    #[tokio::test]
    async fn test_rotate_without_candidate_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();

        let featured = service(db).rotate().await.unwrap();

        assert!(featured.is_none());
    }

    #[tokio::test]
    async fn test_rotate_promotes_oldest_draft() {
        let candidate = stored_poll("poll2", PollStatus::Draft);
        let mut featured = stored_poll("poll2", PollStatus::Active);
        featured.is_weekly = true;
        featured.ends_at = Some((Utc::now() + Duration::days(7)).into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .append_query_results([vec![candidate]])
            .append_query_results([vec![featured]])
            .into_connection();

        let promoted = service(db).rotate().await.unwrap().unwrap();

        assert!(promoted.is_weekly);
        assert_eq!(promoted.status, PollStatus::Active);
        assert!(promoted.ends_at.is_some());
    }

    #[tokio::test]
    async fn test_close_due_ends_overdue_polls() {
        let mut overdue = stored_poll("poll1", PollStatus::Active);
        overdue.is_weekly = true;
        overdue.ends_at = Some((Utc::now() - Duration::minutes(5)).into());
        let mut ended = stored_poll("poll1", PollStatus::Ended);
        ended.ends_at = overdue.ends_at;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![overdue]])
            .append_query_results([vec![ended]])
            .into_connection();

        let closed = service(db).close_due().await.unwrap();

        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn test_close_due_resolves_ended_contest() {
        let mut overdue = stored_poll("poll1", PollStatus::Active);
        overdue.is_contest = true;
        overdue.ends_at = Some((Utc::now() - Duration::minutes(5)).into());
        overdue.vote_counts = json!([1, 0]);
        overdue.voters_count = 1;
        let mut ended = overdue.clone();
        ended.status = PollStatus::Ended;

        let vote = poll_vote::Model {
            id: "v1".to_string(),
            poll_id: "poll1".to_string(),
            voter_hash: "voter1".to_string(),
            option_index: 0,
            created_at: Utc::now().into(),
        };
        let winner = contest_winner::Model {
            id: "w1".to_string(),
            poll_id: "poll1".to_string(),
            option_index: 0,
            voter_hash: "voter1".to_string(),
            selected_at: Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![overdue]])
            .append_query_results([vec![ended.clone()]])
            // resolution: reload poll, check winner, load votes, insert
            .append_query_results([vec![ended]])
            .append_query_results([Vec::<contest_winner::Model>::new()])
            .append_query_results([vec![vote]])
            .append_query_results([vec![winner]])
            .into_connection();

        let closed = service(db).close_due().await.unwrap();

        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn test_close_due_tolerates_no_votes_contest() {
        let mut overdue = stored_poll("poll1", PollStatus::Active);
        overdue.is_contest = true;
        overdue.ends_at = Some((Utc::now() - Duration::minutes(5)).into());
        let mut ended = overdue.clone();
        ended.status = PollStatus::Ended;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![overdue]])
            .append_query_results([vec![ended.clone()]])
            .append_query_results([vec![ended]])
            .append_query_results([Vec::<contest_winner::Model>::new()])
            .append_query_results([Vec::<poll_vote::Model>::new()])
            .into_connection();

        // NoVotes from resolution must not fail the close pass.
        let closed = service(db).close_due().await.unwrap();

        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn test_close_due_releases_poll_locks() {
        let mut overdue = stored_poll("poll1", PollStatus::Active);
        overdue.is_weekly = true;
        overdue.ends_at = Some((Utc::now() - Duration::minutes(5)).into());
        let mut ended = stored_poll("poll1", PollStatus::Ended);
        ended.ends_at = overdue.ends_at;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![overdue]])
            .append_query_results([vec![ended]])
            .into_connection();

        let locks = PollLocks::new();
        let closed = service_with_locks(db, locks.clone()).close_due().await.unwrap();

        // The close pass must not leave its lock entries behind.
        assert_eq!(closed, 1);
        assert!(locks.is_empty().await);
    }

    #[tokio::test]
    async fn test_close_due_with_nothing_due() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();

        let closed = service(db).close_due().await.unwrap();

        assert_eq!(closed, 0);
    }
}
