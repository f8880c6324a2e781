//! Vote endpoints.

use axum::{Json, Router, extract::State, routing::post};
use pollbox_common::AppResult;
use pollbox_core::Tally;
use serde::Deserialize;

use crate::{
    endpoints::polls::{PollResponse, poll_response},
    extractors::VoterIdentity,
    response::ApiResponse,
    state::AppState,
};

/// Cast vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub poll_id: String,
    pub option_index: i32,
}

/// Cast a vote and return the refreshed poll card.
async fn cast_vote(
    VoterIdentity(voter): VoterIdentity,
    State(state): State<AppState>,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let (vote, poll) = state
        .vote_service
        .cast(&req.poll_id, &voter, req.option_index)
        .await?;

    // The write-through counts on the returned row already include
    // this vote.
    let tally = Tally::from_cached(&poll)?;
    Ok(ApiResponse::ok(poll_response(
        &poll,
        &tally,
        Some(vote.option_index),
    )?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/cast", post(cast_vote))
}
