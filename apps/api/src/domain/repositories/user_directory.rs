use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::user::User;

/// Access to the externally owned user records
///
/// The core never creates or deletes users; it only reads them and moves
/// their current team pointer.
#[async_trait]
pub trait UserDirectory: Send {
    /// Find a user by ID
    async fn find_user(&mut self, id: Uuid) -> DomainResult<Option<User>>;

    /// Point a user at a team, or at none
    async fn set_current_team(&mut self, user_id: Uuid, team_id: Option<Uuid>) -> DomainResult<()>;
}
