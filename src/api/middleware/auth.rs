//! Caller identity middleware.
//!
//! Token verification happens in the gateway in front of this service; it
//! forwards the verified user id in `X-User-Id`. This layer only checks the
//! header is present and well-formed, then injects `UserContext` into request
//! extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::UserContext;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Longest accepted user id.
const MAX_USER_ID_LENGTH: usize = 128;

/// Require a caller identity on the request.
pub async fn require_user(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_user_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_user_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_user_id)
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(UserContext { user_id });
    Ok(next.run(req).await)
}

fn parse_user_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.chars().count() > MAX_USER_ID_LENGTH
        || trimmed.chars().any(char::is_control)
    {
        return None;
    }
    Some(trimmed.to_string())
}
