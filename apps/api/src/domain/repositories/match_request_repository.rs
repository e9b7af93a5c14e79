use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::matching::MatchRequest;

/// Repository trait for open match requests
#[async_trait]
pub trait MatchRequestRepository: Send {
    async fn save_match_request(&mut self, request: &MatchRequest) -> DomainResult<()>;

    async fn find_match_request(&mut self, id: Uuid) -> DomainResult<Option<MatchRequest>>;

    /// Whether an open request exists for the ordered pair
    async fn match_request_exists(&mut self, sender_id: Uuid, receiver_id: Uuid)
        -> DomainResult<bool>;

    /// Requests a team has received, oldest first
    async fn find_match_requests_received(&mut self, team_id: Uuid)
        -> DomainResult<Vec<MatchRequest>>;

    /// Requests a team has sent, oldest first
    async fn find_match_requests_sent(&mut self, team_id: Uuid) -> DomainResult<Vec<MatchRequest>>;

    async fn delete_match_request(&mut self, id: Uuid) -> DomainResult<()>;

    /// Delete every request sent or received by a team, returning how many went
    async fn delete_match_requests_involving(&mut self, team_id: Uuid) -> DomainResult<usize>;
}
