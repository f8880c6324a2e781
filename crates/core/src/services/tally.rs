//! Tally computation over recorded votes.

use pollbox_common::{AppError, AppResult};
use pollbox_db::{
    entities::poll,
    repositories::{PollRepository, PollVoteRepository},
};
use serde::Serialize;

/// Vote totals for a poll, derived from the individual vote rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tally {
    /// Votes per option, index-aligned with the poll's options.
    pub counts: Vec<u64>,
    /// Total number of votes cast.
    pub total: u64,
    /// Per-option share of the total in percent, rounded to one decimal
    /// place. All zeros when no votes have been cast.
    pub percentages: Vec<f64>,
}

impl Tally {
    /// Build a tally from per-option counts.
    #[must_use]
    pub fn from_counts(counts: Vec<u64>) -> Self {
        let total: u64 = counts.iter().sum();
        let percentages = counts
            .iter()
            .map(|&count| {
                if total == 0 {
                    0.0
                } else {
                    round_one_decimal(count as f64 * 100.0 / total as f64)
                }
            })
            .collect();

        Self {
            counts,
            total,
            percentages,
        }
    }

    /// Build a tally from the denormalized counts stored on a poll row.
    ///
    /// Listing endpoints use this to avoid one vote query per poll. The
    /// counts array is padded with zeros if it is shorter than the
    /// option list.
    pub fn from_cached(poll: &poll::Model) -> AppResult<Self> {
        let mut counts: Vec<u64> = serde_json::from_value(poll.vote_counts.clone())
            .map_err(|e| AppError::Internal(format!("Invalid poll vote counts: {e}")))?;
        let options: Vec<String> = serde_json::from_value(poll.options.clone())
            .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))?;
        if counts.len() < options.len() {
            counts.resize(options.len(), 0);
        }
        Ok(Self::from_counts(counts))
    }

    /// The option currently in the lead.
    ///
    /// Ties break toward the lowest option index. `None` when no votes
    /// have been cast.
    #[must_use]
    pub fn leading_option(&self) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        let mut best: Option<usize> = None;
        for (index, &count) in self.counts.iter().enumerate() {
            match best {
                Some(current) if self.counts[current] >= count => {}
                _ => best = Some(index),
            }
        }
        best
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Tally service for computing poll results.
#[derive(Clone)]
pub struct TallyService {
    poll_repo: PollRepository,
    vote_repo: PollVoteRepository,
}

impl TallyService {
    /// Create a new tally service.
    #[must_use]
    pub const fn new(poll_repo: PollRepository, vote_repo: PollVoteRepository) -> Self {
        Self {
            poll_repo,
            vote_repo,
        }
    }

    /// Compute the exact tally for a poll from its vote rows.
    ///
    /// Reads take no lock: a tally requested while votes are arriving
    /// reflects some recent consistent state. Votes pointing outside the
    /// option range are skipped rather than failing the whole tally.
    pub async fn tally(&self, poll_id: &str) -> AppResult<Tally> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let options: Vec<String> = serde_json::from_value(poll.options.clone())
            .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))?;

        let votes = self.vote_repo.find_by_poll(poll_id).await?;

        let mut counts = vec![0u64; options.len()];
        for vote in votes {
            if let Some(slot) = counts.get_mut(vote.option_index as usize) {
                *slot += 1;
            }
        }

        Ok(Tally::from_counts(counts))
    }
}
