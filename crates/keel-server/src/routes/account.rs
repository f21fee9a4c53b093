//! Account endpoints: login, logout and the current user.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::auth::{Credentials, USER_KEY, User};
use crate::error::{Result, ServerError};
use crate::middleware::CurrentSession;
use crate::state::AppState;

/// Response for logout.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Always true; errors are reported through [`ServerError`].
    pub logged_out: bool,
}

/// POST /api/account/login - Store the authenticated user in the session.
///
/// A session that is already logged in is returned unchanged.
pub async fn login_handler(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<User>> {
    if let Some(user) = session.get_as::<User>(USER_KEY) {
        debug!(user = %user.name, "Login on an already authenticated session");
        return Ok(Json(user));
    }

    let user = state
        .authenticator
        .authenticate(&credentials)
        .await?
        .ok_or_else(|| ServerError::Unauthorized("invalid credentials".to_string()))?;

    session.set_as(USER_KEY, &user)?;
    info!(user = %user.name, "User logged in");
    Ok(Json(user))
}

/// GET|POST /api/account/logout - Destroy the session and expire its cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let mut cookies = HeaderMap::new();
    state.manager.session_destroy(&headers, &mut cookies)?;
    Ok((cookies, Json(LogoutResponse { logged_out: true })))
}

/// GET /api/account - The logged-in user.
pub async fn me_handler(Extension(session): Extension<CurrentSession>) -> Result<Json<User>> {
    session
        .get_as::<User>(USER_KEY)
        .map(Json)
        .ok_or_else(|| ServerError::Internal("session user is malformed".to_string()))
}

/// Create account routes.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/account", get(me_handler))
        .route("/api/account/login", post(login_handler))
        .route(
            "/api/account/logout",
            get(logout_handler).post(logout_handler),
        )
}
