//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use pollbox_common::{
    AppError,
    fingerprint::{anonymous_fingerprint, secure_compare},
};

use crate::state::AppState;

/// Header carrying the anonymous client token (a client-side cookie value).
pub const CLIENT_TOKEN_HEADER: &str = "x-client-token";

/// Header carrying the administrative shared secret.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

fn client_address(parts: &Parts) -> &str {
    // Behind a proxy the first forwarded hop is the client.
    if let Some(forwarded) = header_str(parts, "x-forwarded-for") {
        return forwarded.split(',').next().unwrap_or("").trim();
    }
    header_str(parts, "x-real-ip").unwrap_or("")
}

/// Voter identity extractor.
///
/// Authenticated callers present `Authorization: Bearer <subject>` and
/// vote under that subject id. Anonymous callers are identified by a
/// digest of their client token and network address, so the same
/// visitor maps to the same fingerprint without storing who they are.
#[derive(Debug, Clone)]
pub struct VoterIdentity(pub String);

impl FromRequestParts<AppState> for VoterIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = header_str(parts, "authorization")
            && let Some(subject) = auth.strip_prefix("Bearer ")
            && !subject.trim().is_empty()
        {
            return Ok(Self(subject.trim().to_string()));
        }

        let token = header_str(parts, CLIENT_TOKEN_HEADER).unwrap_or("");
        let address = client_address(parts);
        if token.is_empty() && address.is_empty() {
            return Err(AppError::Unauthorized);
        }

        Ok(Self(anonymous_fingerprint(token, address)))
    }
}

/// Administrator guard.
///
/// Requires the configured admin token in the `X-Admin-Token` header.
/// When no token is configured, administrative endpoints reject every
/// request.
#[derive(Debug, Clone, Copy)]
pub struct AdminKey;

impl FromRequestParts<AppState> for AdminKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(ref expected) = state.admin_token else {
            return Err(AppError::Forbidden(
                "Administration is not configured".to_string(),
            ));
        };

        let presented = header_str(parts, ADMIN_TOKEN_HEADER).unwrap_or("");
        if secure_compare(presented, expected) {
            Ok(Self)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// Optional administrator check.
///
/// True when a valid admin token was presented; never rejects.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAdmin(pub bool);

impl FromRequestParts<AppState> for MaybeAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let is_admin = match state.admin_token {
            Some(ref expected) => {
                let presented = header_str(parts, ADMIN_TOKEN_HEADER).unwrap_or("");
                secure_compare(presented, expected)
            }
            None => false,
        };
        Ok(Self(is_admin))
    }
}
