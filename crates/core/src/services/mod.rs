//! Business logic services.

#![allow(missing_docs)]

pub mod contest;
pub mod locks;
pub mod poll;
pub mod rotation;
pub mod tally;
pub mod vote;

pub use contest::ContestService;
pub use locks::PollLocks;
pub use poll::{CreatePollInput, PollService, poll_options};
pub use rotation::RotationService;
pub use tally::{Tally, TallyService};
pub use vote::VoteService;
