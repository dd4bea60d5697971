//! Route guard middleware.
//!
//! Each guard is an `axum::middleware::from_fn_with_state` function. Attach
//! guards with `route_layer` (or `MethodRouter::layer`) so path parameters
//! are available when the guard runs:
//!
//! ```ignore
//! Router::new()
//!     .route("/organizations/{organization}/admins", get(handler))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), auth::org_admin))
//! ```
//!
//! On denial the guard answers with a JSON error and the handler never runs.
//! On success the request is passed through untouched; handlers that need
//! the session resolve it again through [`SessionManager`](crate::SessionManager),
//! which is served from cache.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cookies::jar_from_headers;
use crate::error::ServerError;
use crate::policy::{Decision, Guard};
use crate::state::AppState;

/// Require a valid session.
pub async fn logged_in(State(state): State<AppState>, request: Request, next: Next) -> Response {
    guard(&state, Guard::LoggedIn, request, next).await
}

/// Require the session to belong to the `{username}` in the path.
pub async fn is_user(State(state): State<AppState>, request: Request, next: Next) -> Response {
    guard(&state, Guard::IsUser, request, next).await
}

/// Require membership of the `{organization}` in the path.
pub async fn org_member(State(state): State<AppState>, request: Request, next: Next) -> Response {
    guard(&state, Guard::ORG_MEMBER, request, next).await
}

/// Require admin rights in the `{organization}` in the path.
pub async fn org_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    guard(&state, Guard::ORG_ADMIN, request, next).await
}

/// Require membership of the `{organization}`/`{team}` in the path.
pub async fn team_member(State(state): State<AppState>, request: Request, next: Next) -> Response {
    guard(&state, Guard::TEAM_MEMBER, request, next).await
}

/// Require admin rights in the `{organization}`/`{team}` in the path.
pub async fn team_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    guard(&state, Guard::TEAM_ADMIN, request, next).await
}

async fn guard(state: &AppState, guard: Guard, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let params = path_params(&mut parts).await;
    let jar = jar_from_headers(&parts.headers);

    match state.policy.evaluate(guard, &jar, &params).await {
        Decision::Allow(_) => next.run(Request::from_parts(parts, body)).await,
        Decision::Deny(denial) => {
            tracing::debug!(?guard, path = %parts.uri.path(), "Request denied");
            ServerError::from(denial).into_response()
        }
    }
}

/// Matched path parameters, or none if the route has no captures.
async fn path_params(parts: &mut Parts) -> HashMap<String, String> {
    match Path::<HashMap<String, String>>::from_request_parts(parts, &()).await {
        Ok(Path(params)) => params,
        Err(_) => HashMap::new(),
    }
}
