//! Database repositories.

pub mod contest_winner;
pub mod poll;
pub mod poll_vote;

pub use contest_winner::ContestWinnerRepository;
pub use poll::PollRepository;
pub use poll_vote::PollVoteRepository;
