//! Vote casting.

use chrono::Utc;
use pollbox_common::{AppError, AppResult, IdGenerator};
use pollbox_db::{
    entities::{poll, poll::PollStatus, poll_vote},
    repositories::{PollRepository, PollVoteRepository},
};
use sea_orm::Set;
use serde_json::json;

use super::locks::PollLocks;
use super::poll::poll_options;

/// Vote service: the write side of the vote store.
#[derive(Clone)]
pub struct VoteService {
    poll_repo: PollRepository,
    vote_repo: PollVoteRepository,
    locks: PollLocks,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        vote_repo: PollVoteRepository,
        locks: PollLocks,
    ) -> Self {
        Self {
            poll_repo,
            vote_repo,
            locks,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast a vote on a poll.
    ///
    /// One vote per voter fingerprint per poll; a rejected vote leaves
    /// the tally untouched. Runs under the poll's write lock so the
    /// vote row and the denormalized counts move together.
    pub async fn cast(
        &self,
        poll_id: &str,
        voter_hash: &str,
        option_index: i32,
    ) -> AppResult<(poll_vote::Model, poll::Model)> {
        let lock = self.locks.for_poll(poll_id).await;
        let _guard = lock.lock().await;

        let poll = self.poll_repo.get_by_id(poll_id).await?;

        if poll.status != PollStatus::Active {
            return Err(AppError::PollClosed(poll_id.to_string()));
        }
        if let Some(ref ends_at) = poll.ends_at
            && *ends_at < Utc::now()
        {
            return Err(AppError::PollClosed(poll_id.to_string()));
        }

        let options = poll_options(&poll)?;
        if option_index < 0 || option_index as usize >= options.len() {
            return Err(AppError::InvalidOption(format!(
                "option {option_index} is out of range for poll {poll_id}"
            )));
        }

        if self.vote_repo.has_voted(poll_id, voter_hash).await? {
            return Err(AppError::DuplicateVote(poll_id.to_string()));
        }

        let vote_model = poll_vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll_id.to_string()),
            voter_hash: Set(voter_hash.to_string()),
            option_index: Set(option_index),
            created_at: Set(Utc::now().into()),
        };
        let vote = match self.vote_repo.create(vote_model).await {
            Ok(vote) => vote,
            Err(e) => {
                // Another instance can slip past the in-process lock;
                // the unique (poll_id, voter_hash) index decides.
                if self.vote_repo.has_voted(poll_id, voter_hash).await? {
                    return Err(AppError::DuplicateVote(poll_id.to_string()));
                }
                return Err(e);
            }
        };

        // Write-through update of the cached counts. The vote rows stay
        // the source of truth; exact tallies recompute from them.
        let mut counts: Vec<u64> = serde_json::from_value(poll.vote_counts.clone())
            .map_err(|e| AppError::Internal(format!("Invalid poll vote counts: {e}")))?;
        if counts.len() < options.len() {
            counts.resize(options.len(), 0);
        }
        counts[option_index as usize] += 1;

        let voters_count = self.vote_repo.count_for_poll(poll_id).await?;

        let mut active: poll::ActiveModel = poll.into();
        active.vote_counts = Set(json!(counts));
        active.voters_count = Set(voters_count as i32);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = self.poll_repo.update(active).await?;

        Ok((vote, updated))
    }

    /// The caller's vote on a poll, if they have one.
    pub async fn find_vote(
        &self,
        poll_id: &str,
        voter_hash: &str,
    ) -> AppResult<Option<poll_vote::Model>> {
        self.vote_repo.find_by_voter(poll_id, voter_hash).await
    }
}
