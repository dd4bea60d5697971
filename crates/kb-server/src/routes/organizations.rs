//! Organization and team roster endpoints.
//!
//! Each route sits behind the guard matching what it reveals: member lists
//! need membership, admin lists need the admin role.

use axum::{
    Json, Router, middleware,
    extract::{Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::error::Result;
use crate::state::AppState;

/// A roster listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct RosterResponse {
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub usernames: Vec<String>,
}

async fn organization_roster(
    state: &AppState,
    organization: String,
    admins_only: bool,
) -> Result<Json<RosterResponse>> {
    let usernames = state
        .roster
        .organization_members(&organization, admins_only)
        .await?;
    Ok(Json(RosterResponse {
        organization,
        team: None,
        usernames,
    }))
}

async fn team_roster(
    state: &AppState,
    organization: String,
    team: String,
    admins_only: bool,
) -> Result<Json<RosterResponse>> {
    let usernames = state
        .roster
        .team_members(&organization, &team, admins_only)
        .await?;
    Ok(Json(RosterResponse {
        organization,
        team: Some(team),
        usernames,
    }))
}

/// `GET /organizations/{organization}/members`
pub async fn organization_members_handler(
    State(state): State<AppState>,
    Path(organization): Path<String>,
) -> Result<Json<RosterResponse>> {
    organization_roster(&state, organization, false).await
}

/// `GET /organizations/{organization}/admins`
pub async fn organization_admins_handler(
    State(state): State<AppState>,
    Path(organization): Path<String>,
) -> Result<Json<RosterResponse>> {
    organization_roster(&state, organization, true).await
}

/// `GET /organizations/{organization}/teams/{team}/members`
pub async fn team_members_handler(
    State(state): State<AppState>,
    Path((organization, team)): Path<(String, String)>,
) -> Result<Json<RosterResponse>> {
    team_roster(&state, organization, team, false).await
}

/// `GET /organizations/{organization}/teams/{team}/admins`
pub async fn team_admins_handler(
    State(state): State<AppState>,
    Path((organization, team)): Path<(String, String)>,
) -> Result<Json<RosterResponse>> {
    team_roster(&state, organization, team, true).await
}

/// Create roster routes.
pub fn organization_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{organization}/members",
            get(organization_members_handler).route_layer(
                middleware::from_fn_with_state(state.clone(), auth::org_member),
            ),
        )
        .route(
            "/organizations/{organization}/admins",
            get(organization_admins_handler).route_layer(
                middleware::from_fn_with_state(state.clone(), auth::org_admin),
            ),
        )
        .route(
            "/organizations/{organization}/teams/{team}/members",
            get(team_members_handler).route_layer(
                middleware::from_fn_with_state(state.clone(), auth::team_member),
            ),
        )
        .route(
            "/organizations/{organization}/teams/{team}/admins",
            get(team_admins_handler).route_layer(
                middleware::from_fn_with_state(state.clone(), auth::team_admin),
            ),
        )
}
