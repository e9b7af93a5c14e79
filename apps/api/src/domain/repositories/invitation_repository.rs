use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::invitation::Invitation;

/// Repository trait for open invitations
#[async_trait]
pub trait InvitationRepository: Send {
    async fn save_invitation(&mut self, invitation: &Invitation) -> DomainResult<()>;

    async fn find_invitation(&mut self, id: Uuid) -> DomainResult<Option<Invitation>>;

    /// Whether `team_id` already has an open invitation to `user_id`
    async fn invitation_exists(&mut self, team_id: Uuid, user_id: Uuid) -> DomainResult<bool>;

    /// Invitations addressed to a user, oldest first
    async fn find_invitations_for_user(&mut self, user_id: Uuid) -> DomainResult<Vec<Invitation>>;

    /// Invitations sent by a team, oldest first
    async fn find_invitations_from_team(&mut self, team_id: Uuid) -> DomainResult<Vec<Invitation>>;

    async fn delete_invitation(&mut self, id: Uuid) -> DomainResult<()>;

    /// Delete every invitation addressed to a user, returning how many went
    async fn delete_invitations_for_user(&mut self, user_id: Uuid) -> DomainResult<usize>;

    /// Delete every invitation sent by a team, returning how many went
    async fn delete_invitations_from_team(&mut self, team_id: Uuid) -> DomainResult<usize>;
}
