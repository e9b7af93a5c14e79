use async_trait::async_trait;

use super::{InvitationRepository, MatchRequestRepository, TeamRepository, UserDirectory};
use crate::domain::errors::DomainResult;

/// A unit of work over every repository the core touches
///
/// Reads and writes made through one transaction are applied atomically by
/// `commit`. Dropping the transaction instead discards them.
#[async_trait]
pub trait Transaction:
    UserDirectory + TeamRepository + InvitationRepository + MatchRequestRepository + Send
{
    /// Apply every write, or fail with `Conflict` if a concurrent
    /// transaction changed something this one depended on
    async fn commit(self: Box<Self>) -> DomainResult<()>;
}

/// Factory for transactions against the shared persistent state
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> DomainResult<Box<dyn Transaction>>;
}
