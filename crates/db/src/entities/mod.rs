//! Database entities.

pub mod contest_winner;
pub mod poll;
pub mod poll_vote;

pub use contest_winner::Entity as ContestWinner;
pub use poll::Entity as Poll;
pub use poll_vote::Entity as PollVote;
