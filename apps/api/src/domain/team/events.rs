use uuid::Uuid;

use super::value_objects::TeamStatus;

/// Domain events that occur within the Team aggregate
///
/// The coordinator logs every event of a committed transaction. Events of a
/// rolled back transaction are discarded with it.
///
/// # Example
/// ```
/// use teamdate_api::domain::team::events::TeamEvent;
/// use uuid::Uuid;
///
/// let event = TeamEvent::Created {
///     team_id: Uuid::new_v4(),
///     name: "Night owls".to_string(),
///     leader_id: Uuid::new_v4(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamEvent {
    /// Fired when a user forms a team and becomes its leader
    Created {
        team_id: Uuid,
        name: String,
        leader_id: Uuid,
    },
    /// Fired when a user is added to the member set
    MemberJoined { team_id: Uuid, user_id: Uuid },
    /// Fired when a user is removed from the member set
    MemberLeft { team_id: Uuid, user_id: Uuid },
    Renamed { team_id: Uuid, name: String },
    StatusChanged {
        team_id: Uuid,
        from: TeamStatus,
        to: TeamStatus,
    },
    /// Fired once per side when a match request is accepted
    Matched { team_id: Uuid, partner_id: Uuid },
    /// Fired once per side when a pairing is undone
    MatchCleared { team_id: Uuid, partner_id: Uuid },
    /// Fired when the team is deleted, explicitly or by its last member leaving
    Disbanded { team_id: Uuid },
}

impl TeamEvent {
    /// Returns the team_id for this event
    pub fn team_id(&self) -> Uuid {
        match self {
            TeamEvent::Created { team_id, .. }
            | TeamEvent::MemberJoined { team_id, .. }
            | TeamEvent::MemberLeft { team_id, .. }
            | TeamEvent::Renamed { team_id, .. }
            | TeamEvent::StatusChanged { team_id, .. }
            | TeamEvent::Matched { team_id, .. }
            | TeamEvent::MatchCleared { team_id, .. }
            | TeamEvent::Disbanded { team_id } => *team_id,
        }
    }
}
