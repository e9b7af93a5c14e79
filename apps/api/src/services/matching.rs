//! Mutual team matching
//!
//! A match request is a directed offer between two ready teams. Accepting
//! it pairs both teams in one transaction; clearing a match always unpairs
//! both sides before either is changed further.

use tracing::{debug, warn};
use uuid::Uuid;

use super::team_store;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::matching::MatchRequest;
use crate::domain::repositories::Transaction;
use crate::domain::team::{Actor, Team, TeamEvent};

async fn load_request(tx: &mut dyn Transaction, id: Uuid) -> DomainResult<MatchRequest> {
    tx.find_match_request(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Match request not found: {}", id)))
}

fn ensure_ready(team: &Team) -> DomainResult<()> {
    if !team.is_ready() {
        return Err(DomainError::policy(format!(
            "Team {} is {}, not ready",
            team.id(),
            team.status()
        )));
    }
    Ok(())
}

/// Sends a match request from `sender_id` to `receiver_id`
///
/// # Business Rules
/// - Only the sender's leader may request (`Forbidden`)
/// - Teams must be distinct and both Ready (`PolicyViolation`)
/// - At most one open request per ordered pair (`Forbidden`)
pub async fn request_match(
    tx: &mut dyn Transaction,
    sender_id: Uuid,
    receiver_id: Uuid,
    requester_id: Uuid,
) -> DomainResult<MatchRequest> {
    let sender = team_store::load_team(tx, sender_id).await?;
    sender.authorize(Actor::User(requester_id))?;

    let request = MatchRequest::new(sender_id, receiver_id)?;
    let receiver = team_store::load_team(tx, receiver_id).await?;

    ensure_ready(&sender)?;
    ensure_ready(&receiver)?;

    if tx.match_request_exists(sender_id, receiver_id).await? {
        return Err(DomainError::forbidden(format!(
            "Team {} already requested a match with team {}",
            sender_id, receiver_id
        )));
    }

    tx.save_match_request(&request).await?;
    Ok(request)
}

/// Accepts a match request on behalf of the receiving team's leader
///
/// Both teams become Matched and point at each other. Every other open
/// request sent or received by either team is dropped with the accepted one.
pub async fn accept_match(
    tx: &mut dyn Transaction,
    request_id: Uuid,
    acting_user_id: Uuid,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<Team> {
    let request = load_request(tx, request_id).await?;

    let mut receiver = team_store::load_team(tx, request.receiver_id()).await?;
    receiver.authorize(Actor::User(acting_user_id))?;

    let mut sender = team_store::load_team(tx, request.sender_id()).await?;

    // either side may have matched elsewhere or stepped back since the request
    ensure_ready(&sender)?;
    ensure_ready(&receiver)?;

    events.push(sender.match_with(receiver.id())?);
    events.push(receiver.match_with(sender.id())?);

    tx.save_team(&sender).await?;
    tx.save_team(&receiver).await?;

    let dropped = tx.delete_match_requests_involving(sender.id()).await?
        + tx.delete_match_requests_involving(receiver.id()).await?;
    debug!(%request_id, dropped, "cleared match requests of matched teams");

    Ok(receiver)
}

/// Declines a match request on behalf of the receiving team's leader
pub async fn refuse_match(
    tx: &mut dyn Transaction,
    request_id: Uuid,
    acting_user_id: Uuid,
) -> DomainResult<()> {
    let request = load_request(tx, request_id).await?;
    let receiver = team_store::load_team(tx, request.receiver_id()).await?;
    receiver.authorize(Actor::User(acting_user_id))?;

    tx.delete_match_request(request_id).await
}

/// Withdraws a match request on behalf of the sending team's leader
pub async fn cancel_match_request(
    tx: &mut dyn Transaction,
    request_id: Uuid,
    acting_user_id: Uuid,
) -> DomainResult<()> {
    let request = load_request(tx, request_id).await?;
    let sender = team_store::load_team(tx, request.sender_id()).await?;
    sender.authorize(Actor::User(acting_user_id))?;

    tx.delete_match_request(request_id).await
}

/// Undoes `team`'s pairing on both sides, leaving both teams Ready
///
/// The partner is updated before `team` itself. Does nothing for an
/// unmatched team.
pub async fn clear_match(
    tx: &mut dyn Transaction,
    team: &mut Team,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<()> {
    let Some(partner_id) = team.matched_team_id() else {
        return Ok(());
    };

    match tx.find_team(partner_id).await? {
        Some(mut partner) if partner.matched_team_id() == Some(team.id()) => {
            events.extend(partner.unmatch());
            tx.save_team(&partner).await?;
        }
        Some(_) => warn!(
            team_id = %team.id(),
            %partner_id,
            "partner team is not matched back, clearing one side only"
        ),
        None => warn!(
            team_id = %team.id(),
            %partner_id,
            "partner team no longer exists, clearing one side only"
        ),
    }

    events.extend(team.unmatch());
    tx.save_team(team).await
}

/// Leader-initiated unpairing of a matched team
pub async fn clear_team_match(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    actor: Actor,
    events: &mut Vec<TeamEvent>,
) -> DomainResult<Team> {
    let mut team = team_store::load_team(tx, team_id).await?;
    team.authorize(actor)?;

    if team.matched_team_id().is_none() {
        return Err(DomainError::policy(format!("Team {} is not matched", team_id)));
    }

    clear_match(tx, &mut team, events).await?;
    Ok(team)
}

/// Open requests addressed to `team_id`, visible to its members only
pub async fn received_by(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    acting_user_id: Uuid,
) -> DomainResult<Vec<MatchRequest>> {
    let team = team_store::load_team(tx, team_id).await?;
    team.authorize_member(acting_user_id)?;
    tx.find_match_requests_received(team.id()).await
}

/// Open requests sent by `team_id`, visible to its members only
pub async fn sent_by(
    tx: &mut dyn Transaction,
    team_id: Uuid,
    acting_user_id: Uuid,
) -> DomainResult<Vec<MatchRequest>> {
    let team = team_store::load_team(tx, team_id).await?;
    team.authorize_member(acting_user_id)?;
    tx.find_match_requests_sent(team.id()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::Store;
    use crate::domain::team::TeamStatus;
    use crate::domain::user::{Gender, User};
    use crate::infrastructure::repositories::InMemoryStore;

    fn seed(store: &InMemoryStore, gender: Gender) -> Uuid {
        let user = User::new(Uuid::new_v4(), gender);
        let id = user.id;
        store.insert_user(user).unwrap();
        id
    }

    /// Forms a team led by `leader`, optionally marking it ready
    async fn form(tx: &mut dyn Transaction, leader: Uuid, ready: bool) -> Uuid {
        let mut events = Vec::new();
        let team = team_store::create_team(tx, leader, "Crew".to_string(), &mut events)
            .await
            .unwrap();
        if ready {
            team_store::change_status(
                tx,
                team.id(),
                TeamStatus::Ready,
                Actor::User(leader),
                &mut events,
            )
            .await
            .unwrap();
        }
        team.id()
    }

    #[tokio::test]
    async fn accept_pairs_both_teams() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;

        let request = request_match(&mut *tx, t1, t2, l1).await.unwrap();
        let mut events = Vec::new();
        accept_match(&mut *tx, request.id(), l2, &mut events)
            .await
            .unwrap();

        let first = team_store::load_team(&mut *tx, t1).await.unwrap();
        let second = team_store::load_team(&mut *tx, t2).await.unwrap();
        assert_eq!(first.status(), TeamStatus::Matched);
        assert_eq!(second.status(), TeamStatus::Matched);
        assert_eq!(first.matched_team_id(), Some(t2));
        assert_eq!(second.matched_team_id(), Some(t1));
        assert!(tx.find_match_request(request.id()).await.unwrap().is_none());
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn request_requires_sender_leader() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;

        let result = request_match(&mut *tx, t1, t2, l2).await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn request_requires_both_ready() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, false).await;

        let result = request_match(&mut *tx, t1, t2, l1).await;

        assert!(matches!(result, Err(DomainError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn self_request_is_policy_violation() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;

        let result = request_match(&mut *tx, t1, t1, l1).await;

        assert!(matches!(result, Err(DomainError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn duplicate_request_is_forbidden() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;

        request_match(&mut *tx, t1, t2, l1).await.unwrap();
        let again = request_match(&mut *tx, t1, t2, l1).await;

        assert!(matches!(again, Err(DomainError::Forbidden(_))));
        // the reverse direction is a different ordered pair
        assert!(request_match(&mut *tx, t2, t1, l2).await.is_ok());
    }

    #[tokio::test]
    async fn only_receiver_leader_may_accept() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;

        let request = request_match(&mut *tx, t1, t2, l1).await.unwrap();
        let result = accept_match(&mut *tx, request.id(), l1, &mut Vec::new()).await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn accept_after_sender_matched_elsewhere_fails() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let l3 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;
        let t3 = form(&mut *tx, l3, true).await;

        let to_t2 = request_match(&mut *tx, t1, t2, l1).await.unwrap();
        let from_t3 = request_match(&mut *tx, t3, t1, l3).await.unwrap();
        accept_match(&mut *tx, to_t2.id(), l2, &mut Vec::new())
            .await
            .unwrap();

        // accepting dropped every request touching t1
        let stale = accept_match(&mut *tx, from_t3.id(), l1, &mut Vec::new()).await;
        assert!(matches!(stale, Err(DomainError::NotFound(_))));
        assert!(sent_by(&mut *tx, t3, l3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_when_sender_stepped_back_is_policy_violation() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;

        let request = request_match(&mut *tx, t1, t2, l1).await.unwrap();
        team_store::change_status(
            &mut *tx,
            t1,
            TeamStatus::Pending,
            Actor::User(l1),
            &mut Vec::new(),
        )
        .await
        .unwrap();

        let result = accept_match(&mut *tx, request.id(), l2, &mut Vec::new()).await;

        assert!(matches!(result, Err(DomainError::PolicyViolation(_))));
        let second = team_store::load_team(&mut *tx, t2).await.unwrap();
        assert_eq!(second.status(), TeamStatus::Ready);
    }

    #[tokio::test]
    async fn refuse_and_cancel_check_roles() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;

        let request = request_match(&mut *tx, t1, t2, l1).await.unwrap();
        assert!(matches!(
            refuse_match(&mut *tx, request.id(), l1).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            cancel_match_request(&mut *tx, request.id(), l2).await,
            Err(DomainError::Forbidden(_))
        ));

        refuse_match(&mut *tx, request.id(), l2).await.unwrap();
        assert!(received_by(&mut *tx, t2, l2).await.unwrap().is_empty());

        let again = request_match(&mut *tx, t1, t2, l1).await.unwrap();
        cancel_match_request(&mut *tx, again.id(), l1).await.unwrap();
        assert!(sent_by(&mut *tx, t1, l1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_match_unpairs_both_sides() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let l2 = seed(&store, Gender::Female);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;
        let t2 = form(&mut *tx, l2, true).await;
        let request = request_match(&mut *tx, t1, t2, l1).await.unwrap();
        accept_match(&mut *tx, request.id(), l2, &mut Vec::new())
            .await
            .unwrap();

        let mut events = Vec::new();
        let cleared = clear_team_match(&mut *tx, t1, Actor::User(l1), &mut events)
            .await
            .unwrap();

        let partner = team_store::load_team(&mut *tx, t2).await.unwrap();
        assert_eq!(cleared.status(), TeamStatus::Ready);
        assert_eq!(cleared.matched_team_id(), None);
        assert_eq!(partner.status(), TeamStatus::Ready);
        assert_eq!(partner.matched_team_id(), None);
        assert_eq!(
            events,
            vec![
                TeamEvent::MatchCleared {
                    team_id: t2,
                    partner_id: t1
                },
                TeamEvent::MatchCleared {
                    team_id: t1,
                    partner_id: t2
                },
            ]
        );
    }

    #[tokio::test]
    async fn clearing_unmatched_team_is_policy_violation() {
        let store = InMemoryStore::new();
        let l1 = seed(&store, Gender::Male);
        let mut tx = store.begin().await.unwrap();
        let t1 = form(&mut *tx, l1, true).await;

        let result = clear_team_match(&mut *tx, t1, Actor::User(l1), &mut Vec::new()).await;

        assert!(matches!(result, Err(DomainError::PolicyViolation(_))));
    }
}
