//! API integration tests.
//!
//! Drive the router end to end over a mock database and assert the
//! HTTP status mapping of the error taxonomy.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use pollbox_api::{AppState, router as api_router};
use pollbox_core::{ContestService, PollLocks, PollService, TallyService, VoteService};
use pollbox_db::entities::{contest_winner, poll, poll::PollStatus, poll_vote};
use pollbox_db::repositories::{ContestWinnerRepository, PollRepository, PollVoteRepository};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(db: DatabaseConnection, admin_token: Option<&str>) -> Router {
    let db = Arc::new(db);
    let poll_repo = PollRepository::new(db.clone());
    let vote_repo = PollVoteRepository::new(db.clone());
    let winner_repo = ContestWinnerRepository::new(db);
    let locks = PollLocks::new();

    let state = AppState {
        poll_service: PollService::new(poll_repo.clone()),
        vote_service: VoteService::new(poll_repo.clone(), vote_repo.clone(), locks.clone()),
        tally_service: TallyService::new(poll_repo.clone(), vote_repo.clone()),
        contest_service: ContestService::new(poll_repo, vote_repo, winner_repo, locks),
        admin_token: admin_token.map(ToString::to_string),
    };
    api_router().with_state(state)
}

fn stored_poll(id: &str, status: PollStatus) -> poll::Model {
    poll::Model {
        id: id.to_string(),
        question: "Cats or dogs?".to_string(),
        options: json!(["Cat", "Dog"]),
        vote_counts: json!([0, 0]),
        voters_count: 0,
        is_contest: false,
        is_weekly: false,
        status,
        ends_at: None,
        image_url: None,
        created_by: "creator".to_string(),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn stored_vote(id: &str, voter: &str, option_index: i32) -> poll_vote::Model {
    poll_vote::Model {
        id: id.to_string(),
        poll_id: "poll1".to_string(),
        voter_hash: voter.to_string(),
        option_index,
        created_at: Utc::now().into(),
    }
}

fn count_result(n: i64) -> Vec<std::collections::BTreeMap<&'static str, sea_orm::Value>> {
    vec![maplit::btreemap! {
        "num_items" => sea_orm::Value::BigInt(Some(n)),
    }]
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .header("X-Client-Token", "test-client")
        .header("X-Forwarded-For", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_show_poll_returns_card() {
    let poll = stored_poll("poll1", PollStatus::Active);
    let votes = vec![
        stored_vote("v1", "voter1", 0),
        stored_vote("v2", "voter2", 0),
        stored_vote("v3", "voter3", 1),
    ];

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![poll.clone()]])
        .append_query_results([vec![poll]])
        .append_query_results([votes])
        .append_query_results([Vec::<poll_vote::Model>::new()])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post("/polls/show", json!({"pollId": "poll1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_show_unknown_poll_returns_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<poll::Model>::new()])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post("/polls/show", json!({"pollId": "missing"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_results_computes_tally() {
    let poll = stored_poll("poll1", PollStatus::Active);
    let votes = vec![stored_vote("v1", "voter1", 0), stored_vote("v2", "voter2", 1)];

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![poll]])
        .append_query_results([votes])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post("/polls/results", json!({"pollId": "poll1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cast_duplicate_vote_returns_409() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored_poll("poll1", PollStatus::Active)]])
        .append_query_results([count_result(1)])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post(
            "/votes/cast",
            json!({"pollId": "poll1", "optionIndex": 0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cast_invalid_option_returns_400() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored_poll("poll1", PollStatus::Active)]])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post(
            "/votes/cast",
            json!({"pollId": "poll1", "optionIndex": 9}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cast_on_ended_poll_returns_409() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored_poll("poll1", PollStatus::Ended)]])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post(
            "/votes/cast",
            json!({"pollId": "poll1", "optionIndex": 0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cast_without_identity_returns_401() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let request = Request::builder()
        .uri("/votes/cast")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({"pollId": "poll1", "optionIndex": 0}).to_string(),
        ))
        .unwrap();

    let response = app_with(db, None).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_poll_with_one_option_returns_400() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let response = app_with(db, None)
        .oneshot(post(
            "/polls/create",
            json!({"question": "Only one?", "options": ["Yes"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_poll_as_visitor_starts_draft() {
    let draft = stored_poll("poll1", PollStatus::Draft);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![draft]])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post(
            "/polls/create",
            json!({"question": "Cats or dogs?", "options": ["Cat", "Dog"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_start_active_requires_admin() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let response = app_with(db, Some("secret"))
        .oneshot(post(
            "/polls/create",
            json!({
                "question": "Cats or dogs?",
                "options": ["Cat", "Dog"],
                "startActive": true
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_endpoint_rejected_when_unconfigured() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let response = app_with(db, None)
        .oneshot(post("/polls/publish", json!({"pollId": "poll1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_endpoint_rejects_wrong_token() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let request = Request::builder()
        .uri("/polls/publish")
        .method("POST")
        .header("Content-Type", "application/json")
        .header("X-Admin-Token", "wrong")
        .body(Body::from(json!({"pollId": "poll1"}).to_string()))
        .unwrap();

    let response = app_with(db, Some("secret")).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_resolve_already_resolved_returns_409() {
    let mut contest = stored_poll("poll1", PollStatus::Ended);
    contest.is_contest = true;
    let winner = contest_winner::Model {
        id: "w1".to_string(),
        poll_id: "poll1".to_string(),
        option_index: 0,
        voter_hash: "voter1".to_string(),
        selected_at: Utc::now().into(),
    };

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![contest]])
        .append_query_results([vec![winner]])
        .into_connection();

    let request = Request::builder()
        .uri("/contest/resolve")
        .method("POST")
        .header("Content-Type", "application/json")
        .header("X-Admin-Token", "secret")
        .body(Body::from(json!({"pollId": "poll1"}).to_string()))
        .unwrap();

    let response = app_with(db, Some("secret")).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_winner_before_resolution_reports_unresolved() {
    let mut contest = stored_poll("poll1", PollStatus::Ended);
    contest.is_contest = true;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![contest]])
        .append_query_results([Vec::<contest_winner::Model>::new()])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post("/contest/winner", json!({"pollId": "poll1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_weekly_without_feature_returns_ok() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<poll::Model>::new()])
        .into_connection();

    let response = app_with(db, None)
        .oneshot(post("/polls/weekly", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let response = app_with(db, None)
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
