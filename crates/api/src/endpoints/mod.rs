//! API endpoints.

mod contest;
mod polls;
mod votes;

use axum::Router;

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/polls", polls::router())
        .nest("/votes", votes::router())
        .nest("/contest", contest::router())
}
