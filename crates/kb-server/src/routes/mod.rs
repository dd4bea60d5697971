//! HTTP routes.

pub mod health;
pub mod organizations;
pub mod users;

pub use health::{HealthResponse, health_routes};
pub use organizations::{
    RosterResponse, organization_admins_handler, organization_members_handler,
    organization_routes, team_admins_handler, team_members_handler,
};
pub use users::{
    LoginRequest, LoginResponse, MessageResponse, PublicResponse, SessionInfo, login_handler,
    logout_handler, public_handler, session_info_handler, user_routes,
};
