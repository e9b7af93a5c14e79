use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An open invitation from a team to a user without a team
///
/// There is no status field: an invitation exists while it is pending and is
/// deleted by accept, refuse or cancel, or together with its team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    id: Uuid,
    team_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl Invitation {
    /// Creates a new invitation from `team_id` to `user_id`
    pub fn new(team_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            user_id,
            created_at: Utc::now(),
        }
    }

    /// Whether `user_id` is the invited user
    pub fn is_addressed_to(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The sending team
    pub fn team_id(&self) -> Uuid {
        self.team_id
    }

    /// The invited user
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Reconstructs an Invitation from persistence layer data
    pub fn from_persistence(
        id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            team_id,
            user_id,
            created_at,
        }
    }
}
