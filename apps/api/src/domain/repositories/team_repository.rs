use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::team::{Team, TeamStatus};

/// Repository trait for Team aggregate
///
/// Saving a team persists its member set along with the scalar fields.
/// Implementations lock the loaded row until the transaction ends.
#[async_trait]
pub trait TeamRepository: Send {
    /// Save a team (insert or update)
    async fn save_team(&mut self, team: &Team) -> DomainResult<()>;

    /// Find a team by its ID
    async fn find_team(&mut self, id: Uuid) -> DomainResult<Option<Team>>;

    /// Find all teams led by a specific user
    async fn find_teams_by_leader(&mut self, leader_id: Uuid) -> DomainResult<Vec<Team>>;

    /// Find all teams with a status, most recently updated first
    async fn find_teams_by_status(&mut self, status: TeamStatus) -> DomainResult<Vec<Team>>;

    /// Delete a team by ID
    async fn delete_team(&mut self, id: Uuid) -> DomainResult<()>;
}
