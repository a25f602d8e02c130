use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::api::auth::decode_token;
use crate::app_state::AppState;
use crate::utils::error::AppError;

/// Token from `Authorization: Bearer <jwt>` or, failing that, a bare
/// `token: <jwt>` header.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    bearer
        .or_else(|| headers.get("token").and_then(|value| value.to_str().ok()))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// **JWT Middleware**: rejects the request with 401 unless it carries a
/// valid token, then exposes the decoded `Claims` as an extension.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = token_from_headers(req.headers()).ok_or_else(|| {
        warn!("Request to {} without a token", req.uri().path());
        AppError::Unauthorized("No token provided".into()).into_response()
    })?;

    let claims = decode_token(&state.config, token).map_err(|e| {
        warn!("JWT decoding failed: {e}");
        AppError::Unauthorized("Invalid token".into()).into_response()
    })?;

    debug!("JWT decoded for teacher {}", claims.sub);
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
