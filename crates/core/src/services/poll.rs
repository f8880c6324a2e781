//! Poll lifecycle service.

use chrono::{DateTime, Utc};
use pollbox_common::{AppError, AppResult, IdGenerator};
use pollbox_db::{
    entities::{poll, poll::PollStatus},
    repositories::PollRepository,
};
use sea_orm::Set;
use serde_json::json;

/// Maximum number of options a poll may have.
pub const MAX_OPTIONS: usize = 10;

/// Maximum length of the question text.
pub const MAX_QUESTION_LEN: usize = 300;

/// Maximum length of a single option label.
pub const MAX_OPTION_LEN: usize = 100;

/// Input for creating a poll.
pub struct CreatePollInput {
    pub question: String,
    pub options: Vec<String>,
    pub is_contest: bool,
    /// When voting closes. None leaves the poll open until ended
    /// manually or by the weekly rotation.
    pub ends_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    /// Open for voting immediately instead of entering as a draft.
    /// Reserved for administrators; submissions from end users always
    /// start as drafts.
    pub start_active: bool,
}

/// Poll service for creation, listing and status transitions.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(poll_repo: PollRepository) -> Self {
        Self {
            poll_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll.
    pub async fn create(&self, created_by: &str, input: CreatePollInput) -> AppResult<poll::Model> {
        let question = input.question.trim();
        if question.is_empty() {
            return Err(AppError::Validation(
                "Poll question cannot be empty".to_string(),
            ));
        }
        if question.len() > MAX_QUESTION_LEN {
            return Err(AppError::Validation(format!(
                "Poll question is too long (max {MAX_QUESTION_LEN} chars)"
            )));
        }
        if input.options.len() < 2 {
            return Err(AppError::Validation(
                "Poll must have at least 2 options".to_string(),
            ));
        }
        if input.options.len() > MAX_OPTIONS {
            return Err(AppError::Validation(format!(
                "Poll cannot have more than {MAX_OPTIONS} options"
            )));
        }
        for option in &input.options {
            if option.trim().is_empty() {
                return Err(AppError::Validation(
                    "Poll options cannot be empty".to_string(),
                ));
            }
            if option.len() > MAX_OPTION_LEN {
                return Err(AppError::Validation(format!(
                    "Poll option is too long (max {MAX_OPTION_LEN} chars)"
                )));
            }
        }
        if let Some(ends_at) = input.ends_at
            && ends_at <= Utc::now()
        {
            return Err(AppError::Validation(
                "Poll end time must be in the future".to_string(),
            ));
        }

        let status = if input.start_active {
            PollStatus::Active
        } else {
            PollStatus::Draft
        };

        let model = poll::ActiveModel {
            id: Set(self.id_gen.generate()),
            question: Set(question.to_string()),
            options: Set(json!(input.options)),
            vote_counts: Set(json!(vec![0u64; input.options.len()])),
            voters_count: Set(0),
            is_contest: Set(input.is_contest),
            is_weekly: Set(false),
            status: Set(status),
            ends_at: Set(input.ends_at.map(Into::into)),
            image_url: Set(input.image_url),
            created_by: Set(created_by.to_string()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        self.poll_repo.create(model).await
    }

    /// Get a poll by id.
    pub async fn get(&self, poll_id: &str) -> AppResult<poll::Model> {
        self.poll_repo.get_by_id(poll_id).await
    }

    /// List open polls, the featured weekly poll first.
    pub async fn list_active(&self, limit: u64, offset: u64) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.find_active(limit, offset).await
    }

    /// List ended polls for the past-polls archive.
    pub async fn list_past(&self, limit: u64, offset: u64) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.find_past(limit, offset).await
    }

    /// The currently featured weekly poll, if any.
    pub async fn current_weekly(&self) -> AppResult<Option<poll::Model>> {
        self.poll_repo.find_current_weekly().await
    }

    /// Open a draft poll for voting.
    pub async fn publish(&self, poll_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        if poll.status != PollStatus::Draft {
            return Err(AppError::Validation(format!(
                "Only draft polls can be published (poll {poll_id} is {:?})",
                poll.status
            )));
        }

        let mut active: poll::ActiveModel = poll.into();
        active.status = Set(PollStatus::Active);
        active.updated_at = Set(Some(Utc::now().into()));
        self.poll_repo.update(active).await
    }

    /// Close an open poll immediately.
    ///
    /// The featured flag is cleared so the weekly slot frees up; contest
    /// resolution is the caller's follow-up.
    pub async fn end_now(&self, poll_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        if poll.status != PollStatus::Active {
            return Err(AppError::Validation(format!(
                "Only active polls can be ended (poll {poll_id} is {:?})",
                poll.status
            )));
        }

        let mut active: poll::ActiveModel = poll.into();
        active.status = Set(PollStatus::Ended);
        active.is_weekly = Set(false);
        active.ends_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Some(Utc::now().into()));
        self.poll_repo.update(active).await
    }

    /// Hide an ended poll from the archive listing.
    pub async fn archive(&self, poll_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        if poll.status != PollStatus::Ended {
            return Err(AppError::Validation(format!(
                "Only ended polls can be archived (poll {poll_id} is {:?})",
                poll.status
            )));
        }

        let mut active: poll::ActiveModel = poll.into();
        active.status = Set(PollStatus::Archived);
        active.updated_at = Set(Some(Utc::now().into()));
        self.poll_repo.update(active).await
    }

    /// Delete a poll. Votes and any winner row cascade with it.
    pub async fn delete(&self, poll_id: &str) -> AppResult<()> {
        // Surface NotFound rather than silently deleting nothing.
        self.poll_repo.get_by_id(poll_id).await?;
        self.poll_repo.delete(poll_id).await
    }
}

/// Parse a poll's option labels out of the stored JSON column.
pub fn poll_options(poll: &poll::Model) -> AppResult<Vec<String>> {
    serde_json::from_value(poll.options.clone())
        .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))
}
