use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// A directed proposal from one ready team to another
///
/// Like invitations, a request has no status of its own: it is deleted
/// once accepted, refused or cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    created_at: DateTime<Utc>,
}

impl MatchRequest {
    /// Creates a request from `sender_id` to `receiver_id`
    ///
    /// # Business Rules
    /// - Sender and receiver must be distinct teams
    pub fn new(sender_id: Uuid, receiver_id: Uuid) -> DomainResult<Self> {
        if sender_id == receiver_id {
            return Err(DomainError::policy("A team cannot request a match with itself"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            created_at: Utc::now(),
        })
    }

    /// Whether `team_id` is either end of this request
    pub fn involves(&self, team_id: Uuid) -> bool {
        self.sender_id == team_id || self.receiver_id == team_id
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender_id(&self) -> Uuid {
        self.sender_id
    }

    pub fn receiver_id(&self) -> Uuid {
        self.receiver_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Reconstructs a MatchRequest from persistence layer data
    pub fn from_persistence(
        id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender_id,
            receiver_id,
            created_at,
        }
    }
}
