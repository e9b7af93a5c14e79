// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter over the coordinator

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::services::TeamCoordinator;

pub mod errors;
pub mod handlers;
pub mod middleware;

use handlers::{health, invitations, matching, teams};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<TeamCoordinator>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(coordinator: TeamCoordinator, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            jwt_secret: jwt_secret.into(),
        }
    }
}

/// Builds every route; transport layers (tracing, CORS) are added by the caller
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Teams
        .route("/api/teams", post(teams::create_team))
        .route("/api/teams/ready", get(teams::list_ready_teams))
        .route("/api/teams/mine", get(teams::get_my_team))
        .route("/api/teams/leave", post(teams::leave_team))
        .route(
            "/api/teams/:id",
            get(teams::get_team)
                .patch(teams::rename_team)
                .delete(teams::disband_team),
        )
        .route("/api/teams/:id/status", put(teams::change_status))
        // Invitations
        .route(
            "/api/teams/:id/invitations",
            post(invitations::invite).get(invitations::list_sent),
        )
        .route("/api/invitations", get(invitations::list_mine))
        .route("/api/invitations/:id/accept", post(invitations::accept))
        .route("/api/invitations/:id/refuse", post(invitations::refuse))
        .route("/api/invitations/:id", delete(invitations::cancel))
        // Matching
        .route("/api/teams/:id/match-requests", post(matching::request_match))
        .route(
            "/api/teams/:id/match-requests/received",
            get(matching::list_received),
        )
        .route("/api/teams/:id/match-requests/sent", get(matching::list_sent))
        .route("/api/match-requests/:id/accept", post(matching::accept))
        .route("/api/match-requests/:id/refuse", post(matching::refuse))
        .route("/api/match-requests/:id", delete(matching::cancel))
        .route("/api/teams/:id/match", delete(matching::clear_match))
        .with_state(state)
}
