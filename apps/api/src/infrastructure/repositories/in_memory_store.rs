//! In-memory implementation of the persistence ports
//!
//! Transactions are optimistic: each one works on a private snapshot and
//! records the rows it read or wrote and the predicates it queried by
//! (`user_id`, `team_id`, sender, receiver, pair, leader, status). `commit`
//! fails with `Conflict` if a transaction committed after the snapshot wrote
//! one of those rows or a row matching one of those predicates, before or
//! after its change. Unrelated rows of the same table never conflict.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::invitation::Invitation;
use crate::domain::matching::MatchRequest;
use crate::domain::repositories::{
    InvitationRepository, MatchRequestRepository, Store, TeamRepository, Transaction,
    UserDirectory,
};
use crate::domain::team::{Team, TeamStatus};
use crate::domain::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    User(Uuid),
    Team(Uuid),
    Invitation(Uuid),
    MatchRequest(Uuid),
}

/// A lookup that is not by primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Predicate {
    TeamsLedBy(Uuid),
    TeamsWithStatus(TeamStatus),
    InvitationsTo(Uuid),
    InvitationsFrom(Uuid),
    InvitationPair { team_id: Uuid, user_id: Uuid },
    RequestsFrom(Uuid),
    RequestsTo(Uuid),
    RequestPair { sender_id: Uuid, receiver_id: Uuid },
}

fn team_predicates(team: &Team) -> Vec<Predicate> {
    vec![
        Predicate::TeamsLedBy(team.leader_id()),
        Predicate::TeamsWithStatus(team.status()),
    ]
}

fn invitation_predicates(invitation: &Invitation) -> Vec<Predicate> {
    vec![
        Predicate::InvitationsTo(invitation.user_id()),
        Predicate::InvitationsFrom(invitation.team_id()),
        Predicate::InvitationPair {
            team_id: invitation.team_id(),
            user_id: invitation.user_id(),
        },
    ]
}

fn request_predicates(request: &MatchRequest) -> Vec<Predicate> {
    vec![
        Predicate::RequestsFrom(request.sender_id()),
        Predicate::RequestsTo(request.receiver_id()),
        Predicate::RequestPair {
            sender_id: request.sender_id(),
            receiver_id: request.receiver_id(),
        },
    ]
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    invitations: HashMap<Uuid, Invitation>,
    match_requests: HashMap<Uuid, MatchRequest>,
}

/// Committed state; versions are clock values of the last commit touching
/// a row or a predicate
#[derive(Debug, Default)]
struct Shared {
    tables: Tables,
    row_versions: HashMap<RowKey, u64>,
    predicate_versions: HashMap<Predicate, u64>,
    clock: u64,
}

impl Shared {
    fn row_version(&self, key: RowKey) -> u64 {
        self.row_versions.get(&key).copied().unwrap_or(0)
    }

    fn predicate_version(&self, predicate: Predicate) -> u64 {
        self.predicate_versions.get(&predicate).copied().unwrap_or(0)
    }
}

/// Copies a row's final state from the working copy, deleting it if absent
///
/// Predicates matched by the old or the new value are pushed to `touched`.
fn sync_row<V, F>(
    working: &mut HashMap<Uuid, V>,
    shared: &mut HashMap<Uuid, V>,
    id: Uuid,
    predicates: F,
    touched: &mut Vec<Predicate>,
) where
    F: Fn(&V) -> Vec<Predicate>,
{
    let previous = match working.remove(&id) {
        Some(value) => {
            touched.extend(predicates(&value));
            shared.insert(id, value)
        }
        None => shared.remove(&id),
    };

    if let Some(previous) = previous {
        touched.extend(predicates(&previous));
    }
}

fn lock_error<T>(_: T) -> DomainError {
    DomainError::storage("In-memory store lock poisoned")
}

/// Thread-safe in-memory store
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<RwLock<Shared>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user record in the directory
    ///
    /// Users are owned outside the core; this stands in for that service.
    pub fn insert_user(&self, user: User) -> DomainResult<()> {
        let mut shared = self.shared.write().map_err(lock_error)?;
        shared.clock += 1;
        let version = shared.clock;
        shared.row_versions.insert(RowKey::User(user.id), version);
        shared.tables.users.insert(user.id, user);
        Ok(())
    }

    fn snapshot(&self) -> DomainResult<InMemoryTransaction> {
        let shared = self.shared.read().map_err(lock_error)?;
        Ok(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            working: shared.tables.clone(),
            snapshot: shared.clock,
            reads: HashSet::new(),
            predicates: HashSet::new(),
            writes: HashSet::new(),
        })
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> DomainResult<Box<dyn Transaction>> {
        Ok(Box::new(self.snapshot()?))
    }
}

/// A transaction against an [`InMemoryStore`]
pub struct InMemoryTransaction {
    shared: Arc<RwLock<Shared>>,
    working: Tables,
    /// Shared clock when the working copy was taken
    snapshot: u64,
    reads: HashSet<RowKey>,
    predicates: HashSet<Predicate>,
    writes: HashSet<RowKey>,
}

impl InMemoryTransaction {
    fn read_row(&mut self, key: RowKey) {
        self.reads.insert(key);
    }

    fn write_row(&mut self, key: RowKey) {
        self.reads.insert(key);
        self.writes.insert(key);
    }

    fn observe(&mut self, predicate: Predicate) {
        self.predicates.insert(predicate);
    }

    fn validate(&self, shared: &Shared) -> DomainResult<()> {
        for key in &self.reads {
            if shared.row_version(*key) > self.snapshot {
                return Err(DomainError::conflict(format!(
                    "{:?} was modified by a concurrent transaction",
                    key
                )));
            }
        }

        for predicate in &self.predicates {
            if shared.predicate_version(*predicate) > self.snapshot {
                return Err(DomainError::conflict(format!(
                    "Rows matching {:?} were modified by a concurrent transaction",
                    predicate
                )));
            }
        }

        Ok(())
    }

    fn apply(mut self) -> DomainResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let shared_lock = Arc::clone(&self.shared);
        let mut shared = shared_lock.write().map_err(lock_error)?;
        self.validate(&shared)?;

        shared.clock += 1;
        let version = shared.clock;
        let writes = std::mem::take(&mut self.writes);
        let mut touched = Vec::new();

        for key in writes {
            let tables = &mut shared.tables;
            let working = &mut self.working;
            match key {
                RowKey::User(id) => {
                    sync_row(&mut working.users, &mut tables.users, id, |_| Vec::new(), &mut touched)
                }
                RowKey::Team(id) => sync_row(
                    &mut working.teams,
                    &mut tables.teams,
                    id,
                    team_predicates,
                    &mut touched,
                ),
                RowKey::Invitation(id) => sync_row(
                    &mut working.invitations,
                    &mut tables.invitations,
                    id,
                    invitation_predicates,
                    &mut touched,
                ),
                RowKey::MatchRequest(id) => sync_row(
                    &mut working.match_requests,
                    &mut tables.match_requests,
                    id,
                    request_predicates,
                    &mut touched,
                ),
            }
            shared.row_versions.insert(key, version);
        }

        for predicate in touched {
            shared.predicate_versions.insert(predicate, version);
        }

        Ok(())
    }

    fn remove_invitations<F>(&mut self, observed: Predicate, predicate: F) -> usize
    where
        F: Fn(&Invitation) -> bool,
    {
        self.observe(observed);
        let ids: Vec<Uuid> = self
            .working
            .invitations
            .values()
            .filter(|i| predicate(i))
            .map(Invitation::id)
            .collect();

        for id in &ids {
            self.write_row(RowKey::Invitation(*id));
            self.working.invitations.remove(id);
        }

        ids.len()
    }

    fn remove_match_requests<F>(&mut self, observed: &[Predicate], predicate: F) -> usize
    where
        F: Fn(&MatchRequest) -> bool,
    {
        for p in observed {
            self.observe(*p);
        }
        let ids: Vec<Uuid> = self
            .working
            .match_requests
            .values()
            .filter(|r| predicate(r))
            .map(MatchRequest::id)
            .collect();

        for id in &ids {
            self.write_row(RowKey::MatchRequest(*id));
            self.working.match_requests.remove(id);
        }

        ids.len()
    }

    fn sorted_invitations<F>(&mut self, observed: Predicate, predicate: F) -> Vec<Invitation>
    where
        F: Fn(&Invitation) -> bool,
    {
        self.observe(observed);
        let mut found: Vec<Invitation> = self
            .working
            .invitations
            .values()
            .filter(|i| predicate(i))
            .cloned()
            .collect();
        found.sort_by_key(|i| (i.created_at(), i.id()));
        found
    }

    fn sorted_match_requests<F>(&mut self, observed: Predicate, predicate: F) -> Vec<MatchRequest>
    where
        F: Fn(&MatchRequest) -> bool,
    {
        self.observe(observed);
        let mut found: Vec<MatchRequest> = self
            .working
            .match_requests
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.created_at(), r.id()));
        found
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> DomainResult<()> {
        (*self).apply()
    }
}

#[async_trait]
impl UserDirectory for InMemoryTransaction {
    async fn find_user(&mut self, id: Uuid) -> DomainResult<Option<User>> {
        self.read_row(RowKey::User(id));
        Ok(self.working.users.get(&id).cloned())
    }

    async fn set_current_team(&mut self, user_id: Uuid, team_id: Option<Uuid>) -> DomainResult<()> {
        self.write_row(RowKey::User(user_id));
        let user = self
            .working
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::not_found(format!("User not found: {}", user_id)))?;
        user.team_id = team_id;
        Ok(())
    }
}

#[async_trait]
impl TeamRepository for InMemoryTransaction {
    async fn save_team(&mut self, team: &Team) -> DomainResult<()> {
        self.write_row(RowKey::Team(team.id()));
        self.working.teams.insert(team.id(), team.clone());
        Ok(())
    }

    async fn find_team(&mut self, id: Uuid) -> DomainResult<Option<Team>> {
        self.read_row(RowKey::Team(id));
        Ok(self.working.teams.get(&id).cloned())
    }

    async fn find_teams_by_leader(&mut self, leader_id: Uuid) -> DomainResult<Vec<Team>> {
        self.observe(Predicate::TeamsLedBy(leader_id));
        let mut teams: Vec<Team> = self
            .working
            .teams
            .values()
            .filter(|t| t.is_led_by(leader_id))
            .cloned()
            .collect();
        teams.sort_by_key(|t| (t.created_at(), t.id()));
        Ok(teams)
    }

    async fn find_teams_by_status(&mut self, status: TeamStatus) -> DomainResult<Vec<Team>> {
        self.observe(Predicate::TeamsWithStatus(status));
        let mut teams: Vec<Team> = self
            .working
            .teams
            .values()
            .filter(|t| t.status() == status)
            .cloned()
            .collect();
        teams.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(teams)
    }

    async fn delete_team(&mut self, id: Uuid) -> DomainResult<()> {
        self.write_row(RowKey::Team(id));
        if self.working.teams.remove(&id).is_none() {
            return Err(DomainError::not_found(format!("Team not found: {}", id)));
        }

        // Same cascade as the foreign keys of the relational schema
        self.remove_invitations(Predicate::InvitationsFrom(id), |i| i.team_id() == id);
        self.remove_match_requests(
            &[Predicate::RequestsFrom(id), Predicate::RequestsTo(id)],
            |r| r.involves(id),
        );
        Ok(())
    }
}

#[async_trait]
impl InvitationRepository for InMemoryTransaction {
    async fn save_invitation(&mut self, invitation: &Invitation) -> DomainResult<()> {
        self.observe(Predicate::InvitationPair {
            team_id: invitation.team_id(),
            user_id: invitation.user_id(),
        });
        let duplicate = self.working.invitations.values().any(|i| {
            i.id() != invitation.id()
                && i.team_id() == invitation.team_id()
                && i.user_id() == invitation.user_id()
        });
        if duplicate {
            return Err(DomainError::conflict(format!(
                "Team {} already invited user {}",
                invitation.team_id(),
                invitation.user_id()
            )));
        }

        self.write_row(RowKey::Invitation(invitation.id()));
        self.working
            .invitations
            .insert(invitation.id(), invitation.clone());
        Ok(())
    }

    async fn find_invitation(&mut self, id: Uuid) -> DomainResult<Option<Invitation>> {
        self.read_row(RowKey::Invitation(id));
        Ok(self.working.invitations.get(&id).cloned())
    }

    async fn invitation_exists(&mut self, team_id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        self.observe(Predicate::InvitationPair { team_id, user_id });
        Ok(self
            .working
            .invitations
            .values()
            .any(|i| i.team_id() == team_id && i.user_id() == user_id))
    }

    async fn find_invitations_for_user(&mut self, user_id: Uuid) -> DomainResult<Vec<Invitation>> {
        Ok(self.sorted_invitations(Predicate::InvitationsTo(user_id), |i| {
            i.user_id() == user_id
        }))
    }

    async fn find_invitations_from_team(&mut self, team_id: Uuid) -> DomainResult<Vec<Invitation>> {
        Ok(self.sorted_invitations(Predicate::InvitationsFrom(team_id), |i| {
            i.team_id() == team_id
        }))
    }

    async fn delete_invitation(&mut self, id: Uuid) -> DomainResult<()> {
        self.write_row(RowKey::Invitation(id));
        self.working
            .invitations
            .remove(&id)
            .map(drop)
            .ok_or_else(|| DomainError::not_found(format!("Invitation not found: {}", id)))
    }

    async fn delete_invitations_for_user(&mut self, user_id: Uuid) -> DomainResult<usize> {
        Ok(self.remove_invitations(Predicate::InvitationsTo(user_id), |i| {
            i.user_id() == user_id
        }))
    }

    async fn delete_invitations_from_team(&mut self, team_id: Uuid) -> DomainResult<usize> {
        Ok(self.remove_invitations(Predicate::InvitationsFrom(team_id), |i| {
            i.team_id() == team_id
        }))
    }
}

#[async_trait]
impl MatchRequestRepository for InMemoryTransaction {
    async fn save_match_request(&mut self, request: &MatchRequest) -> DomainResult<()> {
        self.observe(Predicate::RequestPair {
            sender_id: request.sender_id(),
            receiver_id: request.receiver_id(),
        });
        let duplicate = self.working.match_requests.values().any(|r| {
            r.id() != request.id()
                && r.sender_id() == request.sender_id()
                && r.receiver_id() == request.receiver_id()
        });
        if duplicate {
            return Err(DomainError::conflict(format!(
                "Team {} already requested a match with team {}",
                request.sender_id(),
                request.receiver_id()
            )));
        }

        self.write_row(RowKey::MatchRequest(request.id()));
        self.working
            .match_requests
            .insert(request.id(), request.clone());
        Ok(())
    }

    async fn find_match_request(&mut self, id: Uuid) -> DomainResult<Option<MatchRequest>> {
        self.read_row(RowKey::MatchRequest(id));
        Ok(self.working.match_requests.get(&id).cloned())
    }

    async fn match_request_exists(
        &mut self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> DomainResult<bool> {
        self.observe(Predicate::RequestPair {
            sender_id,
            receiver_id,
        });
        Ok(self
            .working
            .match_requests
            .values()
            .any(|r| r.sender_id() == sender_id && r.receiver_id() == receiver_id))
    }

    async fn find_match_requests_received(
        &mut self,
        team_id: Uuid,
    ) -> DomainResult<Vec<MatchRequest>> {
        Ok(self.sorted_match_requests(Predicate::RequestsTo(team_id), |r| {
            r.receiver_id() == team_id
        }))
    }

    async fn find_match_requests_sent(&mut self, team_id: Uuid) -> DomainResult<Vec<MatchRequest>> {
        Ok(self.sorted_match_requests(Predicate::RequestsFrom(team_id), |r| {
            r.sender_id() == team_id
        }))
    }

    async fn delete_match_request(&mut self, id: Uuid) -> DomainResult<()> {
        self.write_row(RowKey::MatchRequest(id));
        self.working
            .match_requests
            .remove(&id)
            .map(drop)
            .ok_or_else(|| DomainError::not_found(format!("Match request not found: {}", id)))
    }

    async fn delete_match_requests_involving(&mut self, team_id: Uuid) -> DomainResult<usize> {
        Ok(self.remove_match_requests(
            &[Predicate::RequestsFrom(team_id), Predicate::RequestsTo(team_id)],
            |r| r.involves(team_id),
        ))
    }
}
