//! Team lifecycle coordinator
//!
//! The single entry point for callers. Every operation opens a transaction,
//! delegates to the owning component, and commits. A failed check anywhere
//! drops the transaction so nothing it touched is changed.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{invitations, matching, team_store};
use crate::domain::errors::DomainResult;
use crate::domain::invitation::Invitation;
use crate::domain::matching::MatchRequest;
use crate::domain::repositories::{Store, Transaction};
use crate::domain::team::{Actor, Team, TeamEvent, TeamStatus};

#[derive(Clone)]
pub struct TeamCoordinator {
    store: Arc<dyn Store>,
}

impl TeamCoordinator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Commits `tx`, then logs the events it produced
    async fn commit(&self, tx: Box<dyn Transaction>, events: Vec<TeamEvent>) -> DomainResult<()> {
        tx.commit().await?;

        for event in &events {
            info!(team_id = %event.team_id(), ?event, "team event");
        }
        Ok(())
    }

    // Team store

    #[tracing::instrument(skip(self, name), err(level = "debug"))]
    pub async fn create_team(&self, leader_id: Uuid, name: String) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let team = team_store::create_team(&mut *tx, leader_id, name, &mut events).await?;

        self.commit(tx, events).await?;
        Ok(team)
    }

    /// Adds a user directly, bypassing the invitation flow
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn add_member(&self, team_id: Uuid, user_id: Uuid) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let mut team = team_store::load_team(&mut *tx, team_id).await?;
        team_store::add_member(&mut *tx, &mut team, user_id, &mut events).await?;

        self.commit(tx, events).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        team_store::remove_member(&mut *tx, team_id, user_id, &mut events).await?;

        self.commit(tx, events).await
    }

    /// Removes `user_id` from whichever team they belong to
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn leave(&self, user_id: Uuid) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let team = team_store::user_team(&mut *tx, user_id).await?;
        team_store::remove_member(&mut *tx, team.id(), user_id, &mut events).await?;

        self.commit(tx, events).await
    }

    #[tracing::instrument(skip(self, name), err(level = "debug"))]
    pub async fn rename(&self, team_id: Uuid, name: String, acting_user_id: Uuid) -> DomainResult<Team> {
        self.rename_as(team_id, name, Actor::User(acting_user_id)).await
    }

    #[tracing::instrument(skip(self, name), err(level = "debug"))]
    pub async fn rename_as_admin(&self, team_id: Uuid, name: String) -> DomainResult<Team> {
        self.rename_as(team_id, name, Actor::Admin).await
    }

    async fn rename_as(&self, team_id: Uuid, name: String, actor: Actor) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let team = team_store::rename(&mut *tx, team_id, name, actor, &mut events).await?;

        self.commit(tx, events).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn change_status(
        &self,
        team_id: Uuid,
        status: TeamStatus,
        acting_user_id: Uuid,
    ) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let team = team_store::change_status(
            &mut *tx,
            team_id,
            status,
            Actor::User(acting_user_id),
            &mut events,
        )
        .await?;

        self.commit(tx, events).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn disband(&self, team_id: Uuid, acting_user_id: Uuid) -> DomainResult<()> {
        self.disband_as(team_id, Actor::User(acting_user_id)).await
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn disband_as_admin(&self, team_id: Uuid) -> DomainResult<()> {
        self.disband_as(team_id, Actor::Admin).await
    }

    async fn disband_as(&self, team_id: Uuid, actor: Actor) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        team_store::disband(&mut *tx, team_id, actor, &mut events).await?;

        self.commit(tx, events).await
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn get_team(&self, team_id: Uuid) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let team = team_store::load_team(&mut *tx, team_id).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn get_user_team(&self, user_id: Uuid) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let team = team_store::user_team(&mut *tx, user_id).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_ready_teams(&self, name_filter: Option<String>) -> DomainResult<Vec<Team>> {
        let mut tx = self.store.begin().await?;
        let teams = team_store::ready_teams(&mut *tx, name_filter.as_deref()).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(teams)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_teams_led_by(&self, leader_id: Uuid) -> DomainResult<Vec<Team>> {
        let mut tx = self.store.begin().await?;
        let teams = tx.find_teams_by_leader(leader_id).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(teams)
    }

    // Invitations

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn invite(
        &self,
        team_id: Uuid,
        target_user_id: Uuid,
        requester_id: Uuid,
    ) -> DomainResult<Invitation> {
        let mut tx = self.store.begin().await?;

        let invitation = invitations::invite(&mut *tx, team_id, target_user_id, requester_id).await?;

        self.commit(tx, Vec::new()).await?;
        info!(invitation_id = %invitation.id(), %team_id, %target_user_id, "invitation sent");
        Ok(invitation)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn accept_invitation(&self, invitation_id: Uuid, acting_user_id: Uuid) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let team = invitations::accept(&mut *tx, invitation_id, acting_user_id, &mut events).await?;

        self.commit(tx, events).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn refuse_invitation(&self, invitation_id: Uuid, acting_user_id: Uuid) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        invitations::refuse(&mut *tx, invitation_id, acting_user_id).await?;
        self.commit(tx, Vec::new()).await
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn cancel_invitation(&self, invitation_id: Uuid, acting_user_id: Uuid) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        invitations::cancel(&mut *tx, invitation_id, acting_user_id).await?;
        self.commit(tx, Vec::new()).await
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_invitations_for(&self, user_id: Uuid) -> DomainResult<Vec<Invitation>> {
        let mut tx = self.store.begin().await?;
        let found = invitations::addressed_to(&mut *tx, user_id).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(found)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_invitations_from(
        &self,
        team_id: Uuid,
        acting_user_id: Uuid,
    ) -> DomainResult<Vec<Invitation>> {
        let mut tx = self.store.begin().await?;
        let found = invitations::sent_by(&mut *tx, team_id, acting_user_id).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(found)
    }

    // Matching

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn request_match(
        &self,
        sender_team_id: Uuid,
        receiver_team_id: Uuid,
        requester_id: Uuid,
    ) -> DomainResult<MatchRequest> {
        let mut tx = self.store.begin().await?;

        let request =
            matching::request_match(&mut *tx, sender_team_id, receiver_team_id, requester_id).await?;

        self.commit(tx, Vec::new()).await?;
        info!(
            request_id = %request.id(),
            %sender_team_id,
            %receiver_team_id,
            "match requested"
        );
        Ok(request)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn accept_match(&self, request_id: Uuid, acting_user_id: Uuid) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let team = matching::accept_match(&mut *tx, request_id, acting_user_id, &mut events).await?;

        self.commit(tx, events).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn refuse_match(&self, request_id: Uuid, acting_user_id: Uuid) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        matching::refuse_match(&mut *tx, request_id, acting_user_id).await?;
        self.commit(tx, Vec::new()).await
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn cancel_match_request(&self, request_id: Uuid, acting_user_id: Uuid) -> DomainResult<()> {
        let mut tx = self.store.begin().await?;
        matching::cancel_match_request(&mut *tx, request_id, acting_user_id).await?;
        self.commit(tx, Vec::new()).await
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn clear_match(&self, team_id: Uuid, acting_user_id: Uuid) -> DomainResult<Team> {
        let mut tx = self.store.begin().await?;
        let mut events = Vec::new();

        let team =
            matching::clear_team_match(&mut *tx, team_id, Actor::User(acting_user_id), &mut events)
                .await?;

        self.commit(tx, events).await?;
        Ok(team)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_match_requests_for(
        &self,
        team_id: Uuid,
        acting_user_id: Uuid,
    ) -> DomainResult<Vec<MatchRequest>> {
        let mut tx = self.store.begin().await?;
        let found = matching::received_by(&mut *tx, team_id, acting_user_id).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(found)
    }

    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_match_requests_from(
        &self,
        team_id: Uuid,
        acting_user_id: Uuid,
    ) -> DomainResult<Vec<MatchRequest>> {
        let mut tx = self.store.begin().await?;
        let found = matching::sent_by(&mut *tx, team_id, acting_user_id).await?;
        self.commit(tx, Vec::new()).await?;
        Ok(found)
    }
}
