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
use crate::domain::invitation::Invitation;

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&Invitation> for InvitationResponse {
    fn from(invitation: &Invitation) -> Self {
        Self {
            id: invitation.id(),
            team_id: invitation.team_id(),
            user_id: invitation.user_id(),
            created_at: invitation.created_at(),
        }
    }
}

/// Invite a user to the team; caller must lead it
///
/// POST /api/teams/:id/invitations
pub async fn invite(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(team_id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), ApiError> {
    let invitation = state
        .coordinator
        .invite(team_id, req.user_id, user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(InvitationResponse::from(&invitation))))
}

/// Pending invitations of the caller's team
///
/// GET /api/teams/:id/invitations
pub async fn list_sent(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<InvitationResponse>>, ApiError> {
    let found = state
        .coordinator
        .list_invitations_from(team_id, user_id)
        .await?;
    Ok(Json(found.iter().map(InvitationResponse::from).collect()))
}

/// Invitations addressed to the caller
///
/// GET /api/invitations
pub async fn list_mine(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
) -> Result<Json<Vec<InvitationResponse>>, ApiError> {
    let found = state.coordinator.list_invitations_for(user_id).await?;
    Ok(Json(found.iter().map(InvitationResponse::from).collect()))
}

/// POST /api/invitations/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state.coordinator.accept_invitation(id, user_id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// POST /api/invitations/:id/refuse
pub async fn refuse(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.refuse_invitation(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/invitations/:id
pub async fn cancel(
    State(state): State<AppState>,
    JwtAuth(user_id): JwtAuth,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.cancel_invitation(id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
