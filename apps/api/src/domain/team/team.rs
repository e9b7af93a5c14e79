use std::collections::BTreeSet;

use super::events::TeamEvent;
use super::value_objects::{Actor, TeamStatus};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::user::{Gender, User};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Team aggregate root
///
/// A same-gender group of users that can be paired with another team.
/// The team owns its member set; `User::team_id` mirrors it.
///
/// # Invariants
/// - Name cannot be empty
/// - Every member shares the team's gender
/// - The leader is always a member
/// - `status == Matched` exactly when `matched_team_id` is set
/// - The member set is never empty while the team exists
///
/// # Example
/// ```
/// use teamdate_api::domain::team::{Team, TeamStatus};
/// use teamdate_api::domain::user::{Gender, User};
/// use uuid::Uuid;
///
/// let leader = User::new(Uuid::new_v4(), Gender::Female);
/// let (team, events) = Team::new(&leader, "Night owls".to_string()).expect("valid team");
///
/// assert_eq!(team.status(), TeamStatus::Pending);
/// assert_eq!(team.headcount(), 1);
/// assert!(!events.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    id: Uuid,
    name: String,
    gender: Gender,
    status: TeamStatus,
    leader_id: Uuid,
    matched_team_id: Option<Uuid>,
    members: BTreeSet<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Team {
    /// Creates a new Team aggregate led by `leader`
    ///
    /// # Returns
    /// * `Ok((Team, Vec<TeamEvent>))` - New team and events generated
    /// * `Err(DomainError)` - If any invariant is violated
    ///
    /// # Business Rules Enforced
    /// - Name must not be blank
    /// - Leader must not already belong to a team
    /// - Gender is taken from the leader
    /// - Initial status is always Pending
    pub fn new(leader: &User, name: String) -> DomainResult<(Self, Vec<TeamEvent>)> {
        let name = Self::validate_name(name)?;

        if leader.has_team() {
            return Err(DomainError::conflict(format!(
                "User {} already belongs to a team",
                leader.id
            )));
        }

        let now = Utc::now();
        let team = Self {
            id: Uuid::new_v4(),
            name,
            gender: leader.gender,
            status: TeamStatus::Pending,
            leader_id: leader.id,
            matched_team_id: None,
            members: BTreeSet::from([leader.id]),
            created_at: now,
            updated_at: now,
        };

        let events = vec![TeamEvent::Created {
            team_id: team.id,
            name: team.name.clone(),
            leader_id: team.leader_id,
        }];

        Ok((team, events))
    }

    fn validate_name(name: String) -> DomainResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::policy("Team name cannot be empty"));
        }
        Ok(trimmed.to_string())
    }

    /// Checks that `actor` may run leader-only operations on this team
    pub fn authorize(&self, actor: Actor) -> DomainResult<()> {
        match actor {
            Actor::Admin => Ok(()),
            Actor::User(user_id) if self.is_led_by(user_id) => Ok(()),
            Actor::User(user_id) => Err(DomainError::forbidden(format!(
                "User {} is not the leader of team {}",
                user_id, self.id
            ))),
        }
    }

    /// Checks that `user_id` belongs to this team
    pub fn authorize_member(&self, user_id: Uuid) -> DomainResult<()> {
        if self.has_member(user_id) {
            return Ok(());
        }
        Err(DomainError::forbidden(format!(
            "User {} is not a member of team {}",
            user_id, self.id
        )))
    }

    /// Adds `user` to the member set
    ///
    /// # Business Rules
    /// - User must not belong to any team (`Conflict`)
    /// - User's gender must equal the team's (`PolicyViolation`)
    pub fn admit(&mut self, user: &User) -> DomainResult<TeamEvent> {
        if user.has_team() || self.members.contains(&user.id) {
            return Err(DomainError::conflict(format!(
                "User {} already belongs to a team",
                user.id
            )));
        }

        if user.gender != self.gender {
            return Err(DomainError::policy(format!(
                "Team {} only accepts {} members",
                self.id, self.gender
            )));
        }

        self.members.insert(user.id);
        self.touch();

        Ok(TeamEvent::MemberJoined {
            team_id: self.id,
            user_id: user.id,
        })
    }

    /// Removes `user_id` from the member set
    ///
    /// The leader may only leave while they are the last member. Leaving
    /// may bring the headcount to zero; deleting the team is then up to
    /// the caller.
    pub fn release(&mut self, user_id: Uuid) -> DomainResult<TeamEvent> {
        if !self.members.contains(&user_id) {
            return Err(DomainError::policy(format!(
                "User {} is not a member of team {}",
                user_id, self.id
            )));
        }

        if self.is_led_by(user_id) && self.headcount() > 1 {
            return Err(DomainError::policy(
                "The leader can only leave when they are the last member",
            ));
        }

        self.members.remove(&user_id);
        self.touch();

        Ok(TeamEvent::MemberLeft {
            team_id: self.id,
            user_id,
        })
    }

    pub fn rename(&mut self, name: String) -> DomainResult<TeamEvent> {
        self.name = Self::validate_name(name)?;
        self.touch();

        Ok(TeamEvent::Renamed {
            team_id: self.id,
            name: self.name.clone(),
        })
    }

    /// Moves the team between Pending and Ready
    ///
    /// Returns `Ok(None)` when the team already has the requested status.
    /// Matched is entered and left only through `match_with` / `unmatch`.
    pub fn change_status(&mut self, next: TeamStatus) -> DomainResult<Option<TeamEvent>> {
        if next == self.status {
            return Ok(None);
        }

        if next == TeamStatus::Matched || self.status == TeamStatus::Matched {
            return Err(DomainError::policy(format!(
                "Cannot change status of team {} from {} to {} directly",
                self.id, self.status, next
            )));
        }

        if !self.status.can_transition_to(next) {
            return Err(DomainError::policy(format!(
                "Cannot change status of team {} from {} to {}",
                self.id, self.status, next
            )));
        }

        let from = self.status;
        self.status = next;
        self.touch();

        Ok(Some(TeamEvent::StatusChanged {
            team_id: self.id,
            from,
            to: next,
        }))
    }

    /// Pairs this side with `partner_id`
    ///
    /// Only one side of the pairing. The caller mutates both teams in the
    /// same transaction.
    pub fn match_with(&mut self, partner_id: Uuid) -> DomainResult<TeamEvent> {
        if partner_id == self.id {
            return Err(DomainError::policy("A team cannot match with itself"));
        }

        if !self.status.can_transition_to(TeamStatus::Matched) {
            return Err(DomainError::policy(format!(
                "Team {} is {} and cannot be matched",
                self.id, self.status
            )));
        }

        self.status = TeamStatus::Matched;
        self.matched_team_id = Some(partner_id);
        self.touch();

        Ok(TeamEvent::Matched {
            team_id: self.id,
            partner_id,
        })
    }

    /// Undoes this side of a pairing and returns the team to Ready
    ///
    /// Returns `None` if the team was not matched.
    pub fn unmatch(&mut self) -> Option<TeamEvent> {
        let partner_id = self.matched_team_id.take()?;
        self.status = TeamStatus::Ready;
        self.touch();

        Some(TeamEvent::MatchCleared {
            team_id: self.id,
            partner_id,
        })
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn status(&self) -> TeamStatus {
        self.status
    }

    pub fn leader_id(&self) -> Uuid {
        self.leader_id
    }

    pub fn matched_team_id(&self) -> Option<Uuid> {
        self.matched_team_id
    }

    pub fn members(&self) -> &BTreeSet<Uuid> {
        &self.members
    }

    /// Number of members; a team at zero must be deleted
    pub fn headcount(&self) -> usize {
        self.members.len()
    }

    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_led_by(&self, user_id: Uuid) -> bool {
        self.leader_id == user_id
    }

    pub fn is_ready(&self) -> bool {
        self.status == TeamStatus::Ready
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Reconstructs a Team from persistence layer data
    ///
    /// This method bypasses business rules validation since the data
    /// is already validated and stored in the database.
    ///
    /// # Note
    /// Only to be used by repository implementations for data reconstruction.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        name: String,
        gender: Gender,
        status: TeamStatus,
        leader_id: Uuid,
        matched_team_id: Option<Uuid>,
        members: BTreeSet<Uuid>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            gender,
            status,
            leader_id,
            matched_team_id,
            members,
            created_at,
            updated_at,
        }
    }
}
