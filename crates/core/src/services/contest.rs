//! Contest resolution: drawing a winner from the leading option's voters.

use chrono::Utc;
use pollbox_common::{AppError, AppResult, IdGenerator};
use pollbox_db::{
    entities::{contest_winner, poll::PollStatus},
    repositories::{ContestWinnerRepository, PollRepository, PollVoteRepository},
};
use rand::seq::SliceRandom;
use sea_orm::Set;
use tracing::info;

use super::locks::PollLocks;
use super::tally::Tally;

/// Contest service for winner resolution.
#[derive(Clone)]
pub struct ContestService {
    poll_repo: PollRepository,
    vote_repo: PollVoteRepository,
    winner_repo: ContestWinnerRepository,
    locks: PollLocks,
    id_gen: IdGenerator,
}

impl ContestService {
    /// Create a new contest service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        vote_repo: PollVoteRepository,
        winner_repo: ContestWinnerRepository,
        locks: PollLocks,
    ) -> Self {
        Self {
            poll_repo,
            vote_repo,
            winner_repo,
            locks,
            id_gen: IdGenerator::new(),
        }
    }

    /// The recorded winner for a poll, if resolved.
    pub async fn winner(&self, poll_id: &str) -> AppResult<Option<contest_winner::Model>> {
        // Surface NotFound for bogus poll ids instead of a silent None.
        self.poll_repo.get_by_id(poll_id).await?;
        self.winner_repo.find_by_poll(poll_id).await
    }

    /// Resolve a contest poll: draw one winner, uniformly at random,
    /// from the voters of the leading option.
    ///
    /// At-most-once: a second invocation after a success fails with
    /// `AlreadyResolved` and never records a second winner. A poll with
    /// zero votes fails with `NoVotes` and stays ended, unresolved, so
    /// resolution can be retried after a manual fix-up.
    pub async fn resolve(&self, poll_id: &str) -> AppResult<contest_winner::Model> {
        let lock = self.locks.for_poll(poll_id).await;
        let _guard = lock.lock().await;

        let poll = self.poll_repo.get_by_id(poll_id).await?;

        if !poll.is_contest {
            return Err(AppError::Validation(format!(
                "Poll {poll_id} is not a contest"
            )));
        }
        if poll.status != PollStatus::Ended {
            return Err(AppError::Validation(format!(
                "Contest {poll_id} cannot be resolved while {:?}",
                poll.status
            )));
        }
        if self.winner_repo.find_by_poll(poll_id).await?.is_some() {
            return Err(AppError::AlreadyResolved(poll_id.to_string()));
        }

        let options: Vec<String> = serde_json::from_value(poll.options.clone())
            .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))?;
        let votes = self.vote_repo.find_by_poll(poll_id).await?;

        let mut counts = vec![0u64; options.len()];
        for vote in &votes {
            if let Some(slot) = counts.get_mut(vote.option_index as usize) {
                *slot += 1;
            }
        }

        let tally = Tally::from_counts(counts);
        let Some(leading) = tally.leading_option() else {
            return Err(AppError::NoVotes(poll_id.to_string()));
        };

        let entrants: Vec<_> = votes
            .iter()
            .filter(|vote| vote.option_index as usize == leading)
            .collect();
        let Some(drawn) = entrants.choose(&mut rand::thread_rng()) else {
            return Err(AppError::NoVotes(poll_id.to_string()));
        };

        let model = contest_winner::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll_id.to_string()),
            option_index: Set(leading as i32),
            voter_hash: Set(drawn.voter_hash.clone()),
            selected_at: Set(Utc::now().into()),
        };

        match self.winner_repo.create(model).await {
            Ok(winner) => {
                info!(
                    poll_id,
                    option_index = winner.option_index,
                    entrants = entrants.len(),
                    "Contest resolved"
                );
                Ok(winner)
            }
            Err(err) => {
                // The unique index on poll_id is the durable guard; if a
                // concurrent resolution got there first, report that
                // rather than the constraint violation.
                if self.winner_repo.find_by_poll(poll_id).await?.is_some() {
                    return Err(AppError::AlreadyResolved(poll_id.to_string()));
                }
                Err(err)
            }
        }
    }
}
