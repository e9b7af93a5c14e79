//! Team membership and lifecycle operations
//!
//! Every function runs inside the caller's transaction and keeps the team's
//! member set and each member's `team_id` pointer in step.

use tracing::debug;
use uuid::Uuid;

use super::matching;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::repositories::Transaction;
use crate::domain::team::{Actor, Team, TeamEvent, TeamStatus};
use crate::domain::user::User;

/// Loads a team or fails with `NotFound`
pub async fn load_team(tx: &mut dyn Transaction, id: Uuid) -> DomainResult<Team> {
    tx.find_team(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Team not found: {}", id)))
}

/// Loads a user or fails with `NotFound`
pub async fn load_user(tx: &mut dyn Transaction, id: Uuid) -> DomainResult<User> {
    tx.find_user(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("User not found: {}", id)))
}

/// Forms a new team with `leader_id` as leader and sole member
///
/// Invitations still addressed to the leader are dropped, since they can no
/// longer be accepted.
pub async fn create_team(
    tx: &mut dyn Transaction,
    leader_id: Uuid,
    name: String,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<Team> {
    let leader = load_user(tx, leader_id).await?;
    let (team, created) = Team::new(&leader, name)?;

    tx.save_team(&team).await?;
    tx.set_current_team(leader.id, Some(team.id())).await?;
    tx.delete_invitations_for_user(leader.id).await?;

    events.extend(created);
    Ok(team)
}

/// Adds `user_id` to `team`, re-reading the user inside this transaction
pub async fn add_member(
    tx: &mut dyn Transaction,
    team: &mut Team,
    user_id: Uuid,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<()> {
    let user = load_user(tx, user_id).await?;
    let joined = team.admit(&user)?;

    tx.save_team(team).await?;
    tx.set_current_team(user.id, Some(team.id())).await?;

    events.push(joined);
    Ok(())
}

/// Removes `user_id` from a team, deleting the team if nobody is left
pub async fn remove_member(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    user_id: Uuid,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<()> {
    let mut team = load_team(tx, team_id).await?;
    let left = team.release(user_id)?;

    tx.set_current_team(user_id, None).await?;
    events.push(left);

    if team.headcount() == 0 {
        return dissolve(tx, team, events).await;
    }

    tx.save_team(&team).await
}

pub async fn rename(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    name: String,
    actor: Actor,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<Team> {
    let mut team = load_team(tx, team_id).await?;
    team.authorize(actor)?;

    events.push(team.rename(name)?);
    tx.save_team(&team).await?;
    Ok(team)
}

/// Sets a team's status on behalf of its leader
///
/// Leaving Matched clears the pairing on both sides first.
pub async fn change_status(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    status: TeamStatus,
    actor: Actor,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<Team> {
    let mut team = load_team(tx, team_id).await?;
    team.authorize(actor)?;

    if team.status() == TeamStatus::Matched && status != TeamStatus::Matched {
        matching::clear_match(tx, &mut team, events).await?;
    }

    if let Some(changed) = team.change_status(status)? {
        events.push(changed);
    }

    tx.save_team(&team).await?;
    Ok(team)
}

/// Deletes a team on behalf of its leader or an administrator
pub async fn disband(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    actor: Actor,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<()> {
    let team = load_team(tx, team_id).await?;
    team.authorize(actor)?;

    dissolve(tx, team, events).await
}

/// Clears the match, drops invitations and match requests, detaches every
/// member, then deletes the team
async fn dissolve(
    tx: &mut dyn Transaction,
    mut team: Team,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<()> {
    let team_id = team.id();

    matching::clear_match(tx, &mut team, events).await?;

    let invitations = tx.delete_invitations_from_team(team_id).await?;
    let requests = tx.delete_match_requests_involving(team_id).await?;
    debug!(%team_id, invitations, requests, "dropped pending offers of dissolved team");

    for member in team.members() {
        tx.set_current_team(*member, None).await?;
    }

    tx.delete_team(team_id).await?;
    events.push(TeamEvent::Disbanded { team_id });
    Ok(())
}

/// The team `user_id` currently belongs to
pub async fn user_team(tx: &mut dyn Transaction, user_id: Uuid) -> DomainResult<Team> {
    let user = load_user(tx, user_id).await?;
    let team_id = user
        .team_id
        .ok_or_else(|| DomainError::not_found(format!("User {} has no team", user_id)))?;

    load_team(tx, team_id).await
}

/// Ready teams, most recently updated first, optionally filtered by name
pub async fn ready_teams(
    tx: &mut dyn Transaction,
    name_filter: Option<&str>,
) -> DomainResult<Vec<Team>> {
    let teams = tx.find_teams_by_status(TeamStatus::Ready).await?;

    let needle = match name_filter.map(str::trim) {
        Some(needle) if !needle.is_empty() => needle.to_lowercase(),
        _ => return Ok(teams),
    };

    Ok(teams
        .into_iter()
        .filter(|t| t.name().to_lowercase().contains(&needle))
        .collect())
}
