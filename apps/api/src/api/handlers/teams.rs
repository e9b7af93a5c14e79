use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::middleware::JwtAuth;
use crate::api::AppState;
use crate::domain::team::{Team, TeamStatus};
use crate::domain::user::Gender;

/// Request body for creating or renaming a team
#[derive(Debug, Deserialize)]
pub struct TeamNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TeamStatus,
}

#[derive(Debug, Deserialize)]
pub struct ReadyTeamsQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub id: Uuid,
    pub name: String,
    pub gender: Gender,
    pub status: TeamStatus,
    pub leader_id: Uuid,
    pub matched_team_id: Option<Uuid>,
    pub members: Vec<Uuid>,
    pub headcount: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Team> for TeamResponse {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id(),
            name: team.name().to_string(),
            gender: team.gender(),
            status: team.status(),
            leader_id: team.leader_id(),
            matched_team_id: team.matched_team_id(),
            members: team.members().iter().copied().collect(),
            headcount: team.headcount(),
            created_at: team.created_at(),
            updated_at: team.updated_at(),
        }
    }
}

/// Create a team led by the caller
///
/// POST /api/teams
pub async fn create_team(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Json(req): Json<TeamNameRequest>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    let team = state.coordinator.create_team(user_id, req.name).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse::from(&team))))
}

/// GET /api/teams/ready?name=
pub async fn list_ready_teams(
    State(state): State<AppState>,
    JwtAuth(_): JwtAuth,
    Query(query): Query<ReadyTeamsQuery>,
) -> Result<Json<Vec<TeamResponse>>, ApiError> {
    let teams = state.coordinator.list_ready_teams(query.name).await?;
    Ok(Json(teams.iter().map(TeamResponse::from).collect()))
}

/// GET /api/teams/mine
pub async fn get_my_team(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.coordinator.get_user_team(user_id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// GET /api/teams/:id
pub async fn get_team(
    State(state): State<AppState>,
    JwtAuth(_): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.coordinator.get_team(id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// PATCH /api/teams/:id
pub async fn rename_team(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<TeamNameRequest>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.coordinator.rename(id, req.name, user_id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// PUT /api/teams/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.coordinator.change_status(id, req.status, user_id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// Disband a team
///
/// DELETE /api/teams/:id
pub async fn disband_team(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.disband(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Leave the caller's current team
///
/// POST /api/teams/leave
pub async fn leave_team(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
) -> Result<StatusCode, ApiError> {
    state.coordinator.leave(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
