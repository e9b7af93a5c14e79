use serde::{Deserialize, Serialize};

/// Represents the matching status of a team
///
/// # Status Transitions
/// ```text
/// Pending <-> Ready -> Matched
///               ^         |
///               +---------+  (match cleared)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "team_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamStatus {
    /// Team is still forming and is not open to match requests
    Pending,
    /// Team is open to sending and receiving match requests
    Ready,
    /// Team is paired with another team
    Matched,
}

impl TeamStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Valid Transitions
    /// - Pending -> Ready
    /// - Ready -> Pending
    /// - Ready -> Matched
    /// - Matched -> Ready
    ///
    /// # Example
    /// ```
    /// use teamdate_api::domain::team::value_objects::TeamStatus;
    ///
    /// assert!(TeamStatus::Pending.can_transition_to(TeamStatus::Ready));
    /// assert!(!TeamStatus::Pending.can_transition_to(TeamStatus::Matched));
    /// ```
    pub fn can_transition_to(&self, next: TeamStatus) -> bool {
        use TeamStatus::*;
        matches!(
            (self, next),
            (Pending, Ready) | (Ready, Pending) | (Ready, Matched) | (Matched, Ready)
        )
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamStatus::Pending => write!(f, "pending"),
            TeamStatus::Ready => write!(f, "ready"),
            TeamStatus::Matched => write!(f, "matched"),
        }
    }
}

/// Who is acting on a team
///
/// Leader-only operations accept `Actor::User` when the user leads the team.
/// `Actor::Admin` bypasses the leadership check and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(uuid::Uuid),
    Admin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transition_pending_to_ready() {
        assert!(TeamStatus::Pending.can_transition_to(TeamStatus::Ready));
    }

    #[test]
    fn valid_transition_ready_to_pending() {
        assert!(TeamStatus::Ready.can_transition_to(TeamStatus::Pending));
    }

    #[test]
    fn valid_transition_ready_to_matched() {
        assert!(TeamStatus::Ready.can_transition_to(TeamStatus::Matched));
    }

    #[test]
    fn valid_transition_matched_to_ready() {
        assert!(TeamStatus::Matched.can_transition_to(TeamStatus::Ready));
    }

    #[test]
    fn invalid_transition_pending_to_matched() {
        assert!(!TeamStatus::Pending.can_transition_to(TeamStatus::Matched));
    }

    #[test]
    fn invalid_transition_matched_to_pending() {
        assert!(!TeamStatus::Matched.can_transition_to(TeamStatus::Pending));
    }

    #[test]
    fn status_display() {
        assert_eq!(TeamStatus::Pending.to_string(), "pending");
        assert_eq!(TeamStatus::Ready.to_string(), "ready");
        assert_eq!(TeamStatus::Matched.to_string(), "matched");
    }
}
