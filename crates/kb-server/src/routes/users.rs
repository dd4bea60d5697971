//! Login, logout and session introspection endpoints.

use axum::{
    Json, Router, middleware,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use kb_session::Session;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth;
use crate::cookies::{SetCookies, jar_from_headers};
use crate::error::{Result, ServerError};
use crate::state::AppState;

pub const EMPTY_CREDENTIALS_MESSAGE: &str = "Username and password both must be non-empty";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";
pub const LOGOUT_FAILED_MESSAGE: &str = "Logout failed";
pub const ALREADY_LOGGED_IN_MESSAGE: &str = "Already logged in";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The session token, also set as the private cookie.
    pub token: String,
}

/// Plain acknowledgement body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub code: u16,
}

/// Session details safe to show the session's owner. Excludes the token.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionInfo {
    pub username: String,
    pub created_on: DateTime<Utc>,
    pub expires_on: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            username: session.username,
            created_on: session.created_on,
            expires_on: session.expires_on,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicResponse {
    #[serde(rename = "allow-public")]
    pub allow_public: bool,
}

/// `POST /login`
///
/// A request that already carries a live session is acknowledged without a
/// credential check or a new session. The token is only ever returned by a
/// login that verified credentials.
pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) =
        body.map_err(|e| ServerError::BadRequest(format!("Invalid login request: {e}")))?;
    if request.username.is_empty() || request.password.is_empty() {
        return Err(ServerError::BadRequest(EMPTY_CREDENTIALS_MESSAGE.to_string()));
    }

    let mut jar = jar_from_headers(&headers);
    if state.sessions.has_session(&jar) {
        match state.sessions.get_session(&jar).await {
            Ok(existing) => {
                debug!(username = %existing.username, "Login with live session");
                return Ok(Json(MessageResponse {
                    message: ALREADY_LOGGED_IN_MESSAGE.to_string(),
                    code: 200,
                })
                .into_response());
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
    }

    let valid = state
        .credentials
        .verify_credentials(&request.username, &request.password)
        .await?;
    if !valid {
        info!(username = %request.username, "Rejected login");
        return Err(ServerError::Unauthorized(
            INVALID_CREDENTIALS_MESSAGE.to_string(),
        ));
    }

    let session = state
        .sessions
        .session_start(&mut jar, &request.username)
        .await?;
    Ok((SetCookies(jar), Json(LoginResponse { token: session.token })).into_response())
}

/// `POST /logout`
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(SetCookies, Json<MessageResponse>)> {
    let mut jar = jar_from_headers(&headers);
    state
        .sessions
        .session_destroy(&mut jar)
        .await
        .map_err(|e| ServerError::Failed {
            message: LOGOUT_FAILED_MESSAGE,
            detail: e.to_string(),
        })?;

    Ok((
        SetCookies(jar),
        Json(MessageResponse {
            message: "Success".to_string(),
            code: 200,
        }),
    ))
}

/// `GET /profile` and `GET /users/{username}/session`
///
/// Guarded, so the session is known to resolve; it is looked up again here.
pub async fn session_info_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionInfo>> {
    let jar = jar_from_headers(&headers);
    let session = state.sessions.get_session(&jar).await?;
    Ok(Json(session.into()))
}

/// `GET /public`
pub async fn public_handler(State(state): State<AppState>) -> Json<PublicResponse> {
    Json(PublicResponse {
        allow_public: state.config.allow_public_questions,
    })
}

/// Create login, logout and session routes.
pub fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/public", get(public_handler))
        .route(
            "/profile",
            get(session_info_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::logged_in,
            )),
        )
        .route(
            "/users/{username}/session",
            get(session_info_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::is_user,
            )),
        )
}
