//! Admin access-code middleware.
//!
//! This middleware intercepts every admin request to:
//! 1. Extract the code from the Authorization header
//! 2. Hash it and compare with the hash of `ADMIN_ACCESS_CODE`
//! 3. Reject anything else with HTTP 401
//!
//! The code only ever lives on the server; no client code embeds it.

use crate::{error::AppError, state::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

/// Admin authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <code>` header from request
/// 2. Hash `<code>` and the configured code using SHA-256
/// 3. If the digests match: call next handler
/// 4. Otherwise (including when no code is configured): 401
///
/// Comparing fixed-length digests keeps the check independent of the
/// configured code's length.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state
        .config
        .admin_access_code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            tracing::warn!("admin request rejected: ADMIN_ACCESS_CODE is not set");
            AppError::AdminUnauthorized
        })?;

    let provided = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::AdminUnauthorized)?;

    if Sha256::digest(provided.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        tracing::warn!("admin request rejected: wrong access code");
        return Err(AppError::AdminUnauthorized);
    }

    Ok(next.run(request).await)
}
