use uuid::Uuid;

use super::value_objects::Gender;

/// The slice of a user the team core works with
///
/// `team_id` is a denormalized back-reference to the team whose member set
/// contains this user. It is written only together with that member set,
/// inside the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub gender: Gender,
    pub team_id: Option<Uuid>,
}

impl User {
    /// Creates a user that belongs to no team
    pub fn new(id: Uuid, gender: Gender) -> Self {
        Self {
            id,
            gender,
            team_id: None,
        }
    }

    pub fn has_team(&self) -> bool {
        self.team_id.is_some()
    }
}
