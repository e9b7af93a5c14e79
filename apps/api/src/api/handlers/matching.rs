use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::teams::TeamResponse;
use crate::api::errors::ApiError;
use crate::api::middleware::JwtAuth;
use crate::api::AppState;
use crate::domain::matching::MatchRequest;

#[derive(Debug, Deserialize)]
pub struct MatchRequestBody {
    pub receiver_team_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MatchRequestResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&MatchRequest> for MatchRequestResponse {
    fn from(request: &MatchRequest) -> Self {
        Self {
            id: request.id(),
            sender_id: request.sender_id(),
            receiver_id: request.receiver_id(),
            created_at: request.created_at(),
        }
    }
}

/// Propose a match from the caller's team to another ready team
///
/// POST /api/teams/:id/match-requests
pub async fn request_match(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(team_id): Path<Uuid>,
    Json(req): Json<MatchRequestBody>,
) -> Result<(StatusCode, Json<MatchRequestResponse>), ApiError> {
    let request = state
        .coordinator
        .request_match(team_id, req.receiver_team_id, user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(MatchRequestResponse::from(&request))))
}

/// GET /api/teams/:id/match-requests/received
pub async fn list_received(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<MatchRequestResponse>>, ApiError> {
    let found = state
        .coordinator
        .list_match_requests_for(team_id, user_id)
        .await?;
    Ok(Json(found.iter().map(MatchRequestResponse::from).collect()))
}

/// GET /api/teams/:id/match-requests/sent
pub async fn list_sent(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<MatchRequestResponse>>, ApiError> {
    let found = state
        .coordinator
        .list_match_requests_from(team_id, user_id)
        .await?;
    Ok(Json(found.iter().map(MatchRequestResponse::from).collect()))
}

/// POST /api/match-requests/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.coordinator.accept_match(id, user_id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// POST /api/match-requests/:id/refuse
pub async fn refuse(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.refuse_match(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/match-requests/:id
pub async fn cancel(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.cancel_match_request(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Unpair the team from its partner
///
/// DELETE /api/teams/:id/match
pub async fn clear_match(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.coordinator.clear_match(team_id, user_id).await?;
    Ok(Json(TeamResponse::from(&team)))
}
