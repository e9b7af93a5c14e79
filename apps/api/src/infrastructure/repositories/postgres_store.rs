use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::invitation::Invitation;
use crate::domain::matching::MatchRequest;
use crate::domain::repositories::{
    InvitationRepository, MatchRequestRepository, Store, TeamRepository, Transaction,
    UserDirectory,
};
use crate::domain::team::{Team, TeamStatus};
use crate::domain::user::{Gender, User};

/// SQLSTATE codes that mean "lost a race", not "broken"
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    if let Some(db) = err.as_database_error() {
        let code = db.code();
        if matches!(
            code.as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | UNIQUE_VIOLATION)
        ) {
            return DomainError::conflict(format!("{}: {}", context, db.message()));
        }
    }

    DomainError::storage(format!("{}: {}", context, err))
}

/// PostgreSQL implementation of the persistence ports
///
/// Every transaction runs at SERIALIZABLE isolation and locks the team,
/// user, invitation and match request rows it loads by id.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgresStore
    ///
    /// # Arguments
    /// * `pool` - SQLx connection pool for PostgreSQL
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to run migrations: {}", e)))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> DomainResult<Box<dyn Transaction>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to set isolation level", e))?;

        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// A transaction against a [`PostgresStore`]
///
/// Rolled back by sqlx when dropped without `commit`.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    gender: Gender,
    team_id: Option<Uuid>,
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    name: String,
    gender: Gender,
    status: TeamStatus,
    leader_id: Uuid,
    matched_team_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn into_team(self, members: BTreeSet<Uuid>) -> Team {
        Team::from_persistence(
            self.id,
            self.name,
            self.gender,
            self.status,
            self.leader_id,
            self.matched_team_id,
            members,
            self.created_at,
            self.updated_at,
        )
    }
}

#[derive(sqlx::FromRow)]
struct InvitationRow {
    id: Uuid,
    team_id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<InvitationRow> for Invitation {
    fn from(r: InvitationRow) -> Self {
        Invitation::from_persistence(r.id, r.team_id, r.user_id, r.created_at)
    }
}

#[derive(sqlx::FromRow)]
struct MatchRequestRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<MatchRequestRow> for MatchRequest {
    fn from(r: MatchRequestRow) -> Self {
        MatchRequest::from_persistence(r.id, r.sender_id, r.receiver_id, r.created_at)
    }
}

const TEAM_COLUMNS: &str =
    "id, name, gender, status, leader_id, matched_team_id, created_at, updated_at";

impl PostgresTransaction {
    /// Loads member sets for `rows` in one query and builds the aggregates
    async fn with_members(&mut self, rows: Vec<TeamRow>) -> DomainResult<Vec<Team>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let pairs: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT team_id, user_id
            FROM team_members
            WHERE team_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to load team members", e))?;

        let mut members: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
        for (team_id, user_id) in pairs {
            members.entry(team_id).or_default().insert(user_id);
        }

        Ok(rows
            .into_iter()
            .map(|r| {
                let set = members.remove(&r.id).unwrap_or_default();
                r.into_team(set)
            })
            .collect())
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))
    }
}

#[async_trait]
impl UserDirectory for PostgresTransaction {
    async fn find_user(&mut self, id: Uuid) -> DomainResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, gender, team_id
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find user by id", e))?;

        Ok(row.map(|r| User {
            id: r.id,
            gender: r.gender,
            team_id: r.team_id,
        }))
    }

    async fn set_current_team(&mut self, user_id: Uuid, team_id: Option<Uuid>) -> DomainResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET team_id = $2 WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(team_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to update user team", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("User not found: {}", user_id)));
        }

        Ok(())
    }
}

#[async_trait]
impl TeamRepository for PostgresTransaction {
    async fn save_team(&mut self, team: &Team) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO teams (
                id, name, gender, status, leader_id, matched_team_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                status = EXCLUDED.status,
                leader_id = EXCLUDED.leader_id,
                matched_team_id = EXCLUDED.matched_team_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(team.id())
        .bind(team.name())
        .bind(team.gender())
        .bind(team.status())
        .bind(team.leader_id())
        .bind(team.matched_team_id())
        .bind(team.created_at())
        .bind(team.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save team", e))?;

        let members: Vec<Uuid> = team.members().iter().copied().collect();

        sqlx::query(
            r#"
            DELETE FROM team_members
            WHERE team_id = $1 AND NOT (user_id = ANY($2))
            "#,
        )
        .bind(team.id())
        .bind(&members)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to remove team members", e))?;

        sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id)
            SELECT $1, member FROM UNNEST($2::uuid[]) AS member
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(team.id())
        .bind(&members)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to add team members", e))?;

        Ok(())
    }

    async fn find_team(&mut self, id: Uuid) -> DomainResult<Option<Team>> {
        let row: Option<TeamRow> = sqlx::query_as(&format!(
            "SELECT {} FROM teams WHERE id = $1 FOR UPDATE",
            TEAM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find team by id", e))?;

        match row {
            Some(row) => Ok(self.with_members(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_teams_by_leader(&mut self, leader_id: Uuid) -> DomainResult<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(&format!(
            "SELECT {} FROM teams WHERE leader_id = $1 ORDER BY created_at",
            TEAM_COLUMNS
        ))
        .bind(leader_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find teams by leader", e))?;

        self.with_members(rows).await
    }

    async fn find_teams_by_status(&mut self, status: TeamStatus) -> DomainResult<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(&format!(
            "SELECT {} FROM teams WHERE status = $1 ORDER BY updated_at DESC",
            TEAM_COLUMNS
        ))
        .bind(status)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find teams by status", e))?;

        self.with_members(rows).await
    }

    async fn delete_team(&mut self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM teams WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to delete team", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("Team not found: {}", id)));
        }

        Ok(())
    }
}

#[async_trait]
impl InvitationRepository for PostgresTransaction {
    async fn save_invitation(&mut self, invitation: &Invitation) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invitations (id, team_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(invitation.id())
        .bind(invitation.team_id())
        .bind(invitation.user_id())
        .bind(invitation.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save invitation", e))?;

        Ok(())
    }

    async fn find_invitation(&mut self, id: Uuid) -> DomainResult<Option<Invitation>> {
        let row: Option<InvitationRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, user_id, created_at
            FROM invitations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find invitation by id", e))?;

        Ok(row.map(Invitation::from))
    }

    async fn invitation_exists(&mut self, team_id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM invitations WHERE team_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to check invitation", e))
    }

    async fn find_invitations_for_user(&mut self, user_id: Uuid) -> DomainResult<Vec<Invitation>> {
        let rows: Vec<InvitationRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, user_id, created_at
            FROM invitations
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find invitations by user", e))?;

        Ok(rows.into_iter().map(Invitation::from).collect())
    }

    async fn find_invitations_from_team(&mut self, team_id: Uuid) -> DomainResult<Vec<Invitation>> {
        let rows: Vec<InvitationRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, user_id, created_at
            FROM invitations
            WHERE team_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find invitations by team", e))?;

        Ok(rows.into_iter().map(Invitation::from).collect())
    }

    async fn delete_invitation(&mut self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to delete invitation", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("Invitation not found: {}", id)));
        }

        Ok(())
    }

    async fn delete_invitations_for_user(&mut self, user_id: Uuid) -> DomainResult<usize> {
        let result = sqlx::query("DELETE FROM invitations WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to delete invitations by user", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete_invitations_from_team(&mut self, team_id: Uuid) -> DomainResult<usize> {
        let result = sqlx::query("DELETE FROM invitations WHERE team_id = $1")
            .bind(team_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to delete invitations by team", e))?;

        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl MatchRequestRepository for PostgresTransaction {
    async fn save_match_request(&mut self, request: &MatchRequest) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO match_requests (id, sender_id, receiver_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(request.id())
        .bind(request.sender_id())
        .bind(request.receiver_id())
        .bind(request.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save match request", e))?;

        Ok(())
    }

    async fn find_match_request(&mut self, id: Uuid) -> DomainResult<Option<MatchRequest>> {
        let row: Option<MatchRequestRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, created_at
            FROM match_requests
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find match request by id", e))?;

        Ok(row.map(MatchRequest::from))
    }

    async fn match_request_exists(
        &mut self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> DomainResult<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM match_requests WHERE sender_id = $1 AND receiver_id = $2
            )
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to check match request", e))
    }

    async fn find_match_requests_received(
        &mut self,
        team_id: Uuid,
    ) -> DomainResult<Vec<MatchRequest>> {
        let rows: Vec<MatchRequestRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, created_at
            FROM match_requests
            WHERE receiver_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find received match requests", e))?;

        Ok(rows.into_iter().map(MatchRequest::from).collect())
    }

    async fn find_match_requests_sent(&mut self, team_id: Uuid) -> DomainResult<Vec<MatchRequest>> {
        let rows: Vec<MatchRequestRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, created_at
            FROM match_requests
            WHERE sender_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(team_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to find sent match requests", e))?;

        Ok(rows.into_iter().map(MatchRequest::from).collect())
    }

    async fn delete_match_request(&mut self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM match_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to delete match request", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Match request not found: {}",
                id
            )));
        }

        Ok(())
    }

    async fn delete_match_requests_involving(&mut self, team_id: Uuid) -> DomainResult<usize> {
        let result = sqlx::query(
            r#"
            DELETE FROM match_requests WHERE sender_id = $1 OR receiver_id = $1
            "#,
        )
        .bind(team_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to delete match requests by team", e))?;

        Ok(result.rows_affected() as usize)
    }
}
