//! Poll endpoints: creation, cards, archive and status transitions.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, Utc};
use pollbox_common::{AppError, AppResult};
use pollbox_core::{CreatePollInput, Tally, poll_options};
use pollbox_db::entities::poll;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AdminKey, MaybeAdmin, VoterIdentity},
    response::{ApiResponse, ok},
    state::AppState,
};

/// One option row on a poll card.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResponse {
    pub label: String,
    pub votes: u64,
    /// Share of the total in percent, one decimal place.
    pub percentage: f64,
    pub is_voted: bool,
}

/// Poll card payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOptionResponse>,
    pub total_votes: u64,
    pub voters_count: i32,
    pub is_contest: bool,
    pub is_weekly: bool,
    pub status: poll::PollStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Build a poll card from a poll row and its tally.
pub fn poll_response(
    poll: &poll::Model,
    tally: &Tally,
    voted_option: Option<i32>,
) -> AppResult<PollResponse> {
    let options = poll_options(poll)?
        .into_iter()
        .enumerate()
        .map(|(i, label)| PollOptionResponse {
            label,
            votes: tally.counts.get(i).copied().unwrap_or(0),
            percentage: tally.percentages.get(i).copied().unwrap_or(0.0),
            is_voted: voted_option == Some(i as i32),
        })
        .collect();

    Ok(PollResponse {
        id: poll.id.clone(),
        question: poll.question.clone(),
        options,
        total_votes: tally.total,
        voters_count: poll.voters_count,
        is_contest: poll.is_contest,
        is_weekly: poll.is_weekly,
        status: poll.status.clone(),
        ends_at: poll.ends_at.map(|e| e.to_rfc3339()),
        image_url: poll.image_url.clone(),
    })
}

/// Create poll request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[validate(length(min = 1, max = 300))]
    pub question: String,
    #[validate(length(min = 2, max = 10))]
    pub options: Vec<String>,
    #[serde(default)]
    pub is_contest: bool,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(url)]
    pub image_url: Option<String>,
    /// Open for voting immediately. Administrators only.
    #[serde(default)]
    pub start_active: bool,
}

/// Create a poll. End-user submissions enter as drafts.
async fn create_poll(
    MaybeAdmin(is_admin): MaybeAdmin,
    VoterIdentity(creator): VoterIdentity,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;
    if req.start_active && !is_admin {
        return Err(AppError::Forbidden(
            "Only administrators can open a poll immediately".to_string(),
        ));
    }

    let poll = state
        .poll_service
        .create(
            &creator,
            CreatePollInput {
                question: req.question,
                options: req.options,
                is_contest: req.is_contest,
                ends_at: req.ends_at,
                image_url: req.image_url,
                start_active: req.start_active,
            },
        )
        .await?;

    let tally = Tally::from_cached(&poll)?;
    Ok(ApiResponse::ok(poll_response(&poll, &tally, None)?))
}

/// Request addressing a single poll.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollIdRequest {
    pub poll_id: String,
}

/// Poll card with the caller's vote status and an exact tally.
async fn show_poll(
    voter: Result<VoterIdentity, AppError>,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state.poll_service.get(&req.poll_id).await?;
    let tally = state.tally_service.tally(&req.poll_id).await?;

    let voted_option = match voter {
        Ok(VoterIdentity(fingerprint)) => state
            .vote_service
            .find_vote(&req.poll_id, &fingerprint)
            .await?
            .map(|vote| vote.option_index),
        Err(_) => None,
    };

    Ok(ApiResponse::ok(poll_response(&poll, &tally, voted_option)?))
}

/// Tally of a poll, for rendering percentage bars.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyResponse {
    pub counts: Vec<u64>,
    pub total: u64,
    pub percentages: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leading_option: Option<usize>,
}

/// Exact tally for a poll.
async fn poll_results(
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<TallyResponse>> {
    let tally = state.tally_service.tally(&req.poll_id).await?;
    Ok(ApiResponse::ok(TallyResponse {
        leading_option: tally.leading_option(),
        counts: tally.counts,
        total: tally.total,
        percentages: tally.percentages,
    }))
}

/// Paged listing request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    20
}

/// Cards for all open polls, the weekly feature first.
///
/// Uses the write-through cached counts: one query for the whole page.
async fn list_active(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    let polls = state
        .poll_service
        .list_active(req.limit.min(100), req.offset)
        .await?;

    let mut cards = Vec::with_capacity(polls.len());
    for poll in &polls {
        let tally = Tally::from_cached(poll)?;
        cards.push(poll_response(poll, &tally, None)?);
    }
    Ok(ApiResponse::ok(cards))
}

/// The past-polls archive: ended polls with their final tallies.
async fn list_past(
    State(state): State<AppState>,
    Json(req): Json<ListRequest>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    let polls = state
        .poll_service
        .list_past(req.limit.min(100), req.offset)
        .await?;

    let mut cards = Vec::with_capacity(polls.len());
    for poll in &polls {
        let tally = Tally::from_cached(poll)?;
        cards.push(poll_response(poll, &tally, None)?);
    }
    Ok(ApiResponse::ok(cards))
}

/// The currently featured weekly poll, if any.
async fn current_weekly(
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Option<PollResponse>>> {
    let Some(poll) = state.poll_service.current_weekly().await? else {
        return Ok(ApiResponse::ok(None));
    };
    let tally = Tally::from_cached(&poll)?;
    Ok(ApiResponse::ok(Some(poll_response(&poll, &tally, None)?)))
}

/// Open a draft poll for voting.
async fn publish_poll(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state.poll_service.publish(&req.poll_id).await?;
    let tally = Tally::from_cached(&poll)?;
    Ok(ApiResponse::ok(poll_response(&poll, &tally, None)?))
}

/// Close a poll immediately.
async fn end_poll(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state.poll_service.end_now(&req.poll_id).await?;
    let tally = Tally::from_cached(&poll)?;
    Ok(ApiResponse::ok(poll_response(&poll, &tally, None)?))
}

/// Hide an ended poll from the archive listing.
async fn archive_poll(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state.poll_service.archive(&req.poll_id).await?;
    let tally = Tally::from_cached(&poll)?;
    Ok(ApiResponse::ok(poll_response(&poll, &tally, None)?))
}

/// Delete a poll along with its votes and any winner row.
async fn delete_poll(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(req): Json<PollIdRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.poll_service.delete(&req.poll_id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_poll))
        .route("/show", post(show_poll))
        .route("/results", post(poll_results))
        .route("/list-active", post(list_active))
        .route("/archive", post(list_past))
        .route("/weekly", post(current_weekly))
        .route("/publish", post(publish_poll))
        .route("/end", post(end_poll))
        .route("/archive-poll", post(archive_poll))
        .route("/delete", post(delete_poll))
}
