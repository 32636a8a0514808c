//! Cookie login and the middleware that enforces it
//!
//! The cookie value is a SHA-256 over a random per-process salt and the
//! configured credentials, so sessions end on restart or credential change.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::extract::Json;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Name of the session cookie
pub const AUTH_COOKIE: &str = "auth";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Hex SHA-256 of salt, username and password
pub fn session_token(salt: &[u8], username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(username.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Value of `name` in the request's Cookie headers
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Compare without stopping at the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

fn is_authenticated(state: &AppState, headers: &HeaderMap) -> bool {
    cookie_value(headers, AUTH_COOKIE)
        .map_or(false, |value| constant_time_eq(value.as_bytes(), state.session_token.as_bytes()))
}

/// Authentication middleware
///
/// API calls without a valid cookie get 401; page requests are sent to
/// `/login`. Applied to protected routes only.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_authenticated(&state, request.headers()) {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if path.starts_with("/api/") {
        warn!("Rejected unauthenticated request to {}", path);
        ApiError::Unauthorized("No autenticado".to_string()).into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    let auth = &state.config.auth;
    let user_ok = constant_time_eq(req.username.as_bytes(), auth.username.as_bytes());
    let password_ok = constant_time_eq(req.password.as_bytes(), auth.password.as_bytes());
    if !(user_ok && password_ok) {
        warn!("Failed login for user '{}'", req.username);
        return Err(ApiError::Unauthorized("Credenciales incorrectas".to_string()));
    }

    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        AUTH_COOKIE, state.session_token, auth.session_max_age_secs
    );
    info!("User '{}' logged in", req.username);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// POST /logout
pub async fn logout() -> Response {
    let cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", AUTH_COOKIE);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response()
}

/// GET /login
///
/// Already signed in: back to the dashboard.
pub async fn login_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if is_authenticated(&state, &headers) {
        return Redirect::to("/").into_response();
    }
    Json(json!({ "authenticated": false })).into_response()
}
