//! Shared application state.

#![allow(missing_docs)]

use pollbox_core::{ContestService, PollService, TallyService, VoteService};

/// Application state handed to every endpoint.
#[derive(Clone)]
pub struct AppState {
    pub poll_service: PollService,
    pub vote_service: VoteService,
    pub tally_service: TallyService,
    pub contest_service: ContestService,
    /// Shared secret for administrative endpoints. `None` disables them.
    pub admin_token: Option<String>,
}
