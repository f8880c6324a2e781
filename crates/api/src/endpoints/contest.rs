//! Contest endpoints: winner announcement and manual resolution.

use axum::{Json, Router, extract::State, routing::post};
use pollbox_common::{AppError, AppResult};
use pollbox_core::poll_options;
use pollbox_db::entities::contest_winner;
use serde::{Deserialize, Serialize};

use crate::{extractors::AdminKey, response::ApiResponse, state::AppState};

/// Request addressing a single contest poll.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestRequest {
    pub poll_id: String,
}

/// Winner announcement payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerResponse {
    pub poll_id: String,
    pub option_index: i32,
    pub option_label: String,
    /// Fingerprint of the drawn entrant.
    pub voter_hash: String,
    pub selected_at: String,
}

/// Resolution state of a contest poll.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerStatusResponse {
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<WinnerResponse>,
}

async fn winner_response(
    state: &AppState,
    winner: contest_winner::Model,
) -> AppResult<WinnerResponse> {
    let poll = state.poll_service.get(&winner.poll_id).await?;
    let options = poll_options(&poll)?;
    let option_label = options
        .get(winner.option_index as usize)
        .cloned()
        .ok_or_else(|| {
            AppError::Internal(format!(
                "Winner option {} out of range for poll {}",
                winner.option_index, winner.poll_id
            ))
        })?;

    Ok(WinnerResponse {
        poll_id: winner.poll_id,
        option_index: winner.option_index,
        option_label,
        voter_hash: winner.voter_hash,
        selected_at: winner.selected_at.to_rfc3339(),
    })
}

/// Winner announcement data for a contest poll.
async fn show_winner(
    State(state): State<AppState>,
    Json(req): Json<ContestRequest>,
) -> AppResult<ApiResponse<WinnerStatusResponse>> {
    let Some(winner) = state.contest_service.winner(&req.poll_id).await? else {
        return Ok(ApiResponse::ok(WinnerStatusResponse {
            resolved: false,
            winner: None,
        }));
    };

    let winner = winner_response(&state, winner).await?;
    Ok(ApiResponse::ok(WinnerStatusResponse {
        resolved: true,
        winner: Some(winner),
    }))
}

/// Resolve a contest manually.
///
/// Retry surface for contests the scheduler could not resolve; safe to
/// call again after a success, which fails with `ALREADY_RESOLVED`.
async fn resolve_contest(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(req): Json<ContestRequest>,
) -> AppResult<ApiResponse<WinnerResponse>> {
    let winner = state.contest_service.resolve(&req.poll_id).await?;
    let winner = winner_response(&state, winner).await?;
    Ok(ApiResponse::ok(winner))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/winner", post(show_winner))
        .route("/resolve", post(resolve_contest))
}
