//! Invitation lifecycle: invite, accept, refuse, cancel
//!
//! An invitation row exists only while it is pending. Every terminal action
//! deletes it.

use tracing::debug;
use uuid::Uuid;

use super::team_store;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::invitation::Invitation;
use crate::domain::repositories::Transaction;
use crate::domain::team::{Actor, Team, TeamEvent};

async fn load_invitation(tx: &mut dyn Transaction, id: Uuid) -> DomainResult<Invitation> {
    tx.find_invitation(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Invitation not found: {}", id)))
}

/// Invites `target_id` to join `team_id` on behalf of the team's leader
///
/// # Business Rules
/// - Only the leader may invite
/// - The target must not belong to any team
/// - The target must share the team's gender
/// - At most one open invitation per team and user
pub async fn invite(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    target_id: Uuid,
    requester_id: Uuid,
) -> DomainResult<Invitation> {
    let team = team_store::load_team(tx, team_id).await?;
    team.authorize(Actor::User(requester_id))?;

    let target = team_store::load_user(tx, target_id).await?;

    if target.has_team() {
        return Err(DomainError::forbidden(format!(
            "User {} already belongs to a team",
            target.id
        )));
    }

    if target.gender != team.gender() {
        return Err(DomainError::forbidden(format!(
            "Team {} can only invite {} users",
            team.id(),
            team.gender()
        )));
    }

    if tx.invitation_exists(team.id(), target.id).await? {
        return Err(DomainError::forbidden(format!(
            "Team {} already invited user {}",
            team.id(),
            target.id
        )));
    }

    let invitation = Invitation::new(team.id(), target.id);
    tx.save_invitation(&invitation).await?;
    Ok(invitation)
}

/// Accepts an invitation, joining its team
///
/// Joining a team invalidates every other invitation addressed to the user.
pub async fn accept(
    tx: &mut dyn Transaction,
    invitation_id: Uuid,
    acting_user_id: Uuid,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<Team> {
    let invitation = load_invitation(tx, invitation_id).await?;

    if !invitation.is_addressed_to(acting_user_id) {
        return Err(DomainError::forbidden(format!(
            "Invitation {} is not addressed to user {}",
            invitation_id, acting_user_id
        )));
    }

    let mut team = team_store::load_team(tx, invitation.team_id()).await?;
    team_store::add_member(tx, &mut team, acting_user_id, events).await?;

    let dropped = tx.delete_invitations_for_user(acting_user_id).await?;
    debug!(user_id = %acting_user_id, dropped, "cleared invitations of new member");

    Ok(team)
}

/// Declines an invitation
pub async fn refuse(
    tx: &mut dyn Transaction,
    invitation_id: Uuid,
    acting_user_id: Uuid,
) -> DomainResult<()> {
    let invitation = load_invitation(tx, invitation_id).await?;

    if !invitation.is_addressed_to(acting_user_id) {
        return Err(DomainError::forbidden(format!(
            "Invitation {} is not addressed to user {}",
            invitation_id, acting_user_id
        )));
    }

    tx.delete_invitation(invitation_id).await
}

/// Withdraws an invitation on behalf of the sending team's leader
pub async fn cancel(
    tx: &mut dyn Transaction,
    invitation_id: Uuid,
    acting_user_id: Uuid,
) -> DomainResult<()> {
    let invitation = load_invitation(tx, invitation_id).await?;
    let team = team_store::load_team(tx, invitation.team_id()).await?;

    team.authorize(Actor::User(acting_user_id))?;

    tx.delete_invitation(invitation_id).await
}

pub async fn addressed_to(tx: &mut dyn Transaction, user_id: Uuid) -> DomainResult<Vec<Invitation>> {
    let user = team_store::load_user(tx, user_id).await?;
    tx.find_invitations_for_user(user.id).await
}

/// Pending invitations sent by `team_id`, visible to its members only
pub async fn sent_by(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    acting_user_id: Uuid,
) -> DomainResult<Vec<Invitation>> {
    let team = team_store::load_team(tx, team_id).await?;
    team.authorize_member(acting_user_id)?;
    tx.find_invitations_from_team(team.id()).await
}
