//! Integration tests for the PostgreSQL store
//!
//! Ignored by default. Run with a scratch database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use std::sync::Arc;

use sqlx::PgPool;
use teamdate_api::domain::repositories::Store;
use teamdate_api::domain::team::TeamStatus;
use teamdate_api::domain::DomainError;
use teamdate_api::infrastructure::repositories::PostgresStore;
use teamdate_api::services::{invitations, TeamCoordinator};
use uuid::Uuid;

/// Connects and applies migrations
async fn setup_store() -> (PgPool, PostgresStore) {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    let store = PostgresStore::new(pool.clone());
    store.migrate().await.expect("Failed to run migrations");
    (pool, store)
}

/// Inserts a directory user the way the owning service would
async fn create_test_user(pool: &PgPool, gender: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, gender) VALUES ($1, $2::gender)")
        .bind(id)
        .bind(gender)
        .execute(pool)
        .await
        .expect("Failed to create test user");
    id
}

#[tokio::test]
#[ignore]
async fn test_team_round_trip() {
    let (pool, store) = setup_store().await;
    let coordinator = TeamCoordinator::new(Arc::new(store));
    let leader = create_test_user(&pool, "male").await;
    let member = create_test_user(&pool, "male").await;

    let team = coordinator
        .create_team(leader, "Round Trip".to_string())
        .await
        .expect("Failed to create team");
    coordinator
        .add_member(team.id(), member)
        .await
        .expect("Failed to add member");

    let loaded = coordinator.get_team(team.id()).await.expect("Team should exist");
    assert_eq!(loaded.name(), "Round Trip");
    assert_eq!(loaded.headcount(), 2);
    assert!(loaded.has_member(member));
    assert_eq!(
        coordinator.get_user_team(member).await.unwrap().id(),
        team.id()
    );

    coordinator.disband(team.id(), leader).await.expect("Failed to disband");
    assert!(matches!(
        coordinator.get_user_team(member).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore]
async fn test_match_and_disband() {
    let (pool, store) = setup_store().await;
    let coordinator = TeamCoordinator::new(Arc::new(store));
    let l1 = create_test_user(&pool, "male").await;
    let l2 = create_test_user(&pool, "female").await;

    let t1 = coordinator.create_team(l1, "One".to_string()).await.unwrap();
    let t2 = coordinator.create_team(l2, "Two".to_string()).await.unwrap();
    coordinator.change_status(t1.id(), TeamStatus::Ready, l1).await.unwrap();
    coordinator.change_status(t2.id(), TeamStatus::Ready, l2).await.unwrap();

    let request = coordinator.request_match(t1.id(), t2.id(), l1).await.unwrap();
    coordinator.accept_match(request.id(), l2).await.unwrap();
    assert_eq!(
        coordinator.get_team(t1.id()).await.unwrap().matched_team_id(),
        Some(t2.id())
    );

    coordinator.disband(t1.id(), l1).await.unwrap();

    let partner = coordinator.get_team(t2.id()).await.unwrap();
    assert_eq!(partner.status(), TeamStatus::Ready);
    assert_eq!(partner.matched_team_id(), None);

    coordinator.disband(t2.id(), l2).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_concurrent_accepts_conflict() {
    let (pool, store) = setup_store().await;
    let coordinator = TeamCoordinator::new(Arc::new(store.clone()));
    let first_leader = create_test_user(&pool, "female").await;
    let second_leader = create_test_user(&pool, "female").await;
    let target = create_test_user(&pool, "female").await;

    let first = coordinator.create_team(first_leader, "First".to_string()).await.unwrap();
    let second = coordinator.create_team(second_leader, "Second".to_string()).await.unwrap();
    let i1 = coordinator.invite(first.id(), target, first_leader).await.unwrap();
    let i2 = coordinator.invite(second.id(), target, second_leader).await.unwrap();

    let mut tx1 = store.begin().await.unwrap();
    invitations::accept(&mut *tx1, i1.id(), target, &mut Vec::new())
        .await
        .unwrap();

    // the second accept blocks on the user row until the first commits
    let handle = tokio::spawn({
        let store = store.clone();
        async move {
            let mut tx2 = store.begin().await?;
            invitations::accept(&mut *tx2, i2.id(), target, &mut Vec::new()).await?;
            tx2.commit().await
        }
    });

    tx1.commit().await.unwrap();
    let loser = handle.await.unwrap();

    assert!(matches!(
        loser,
        Err(DomainError::Conflict(_)) | Err(DomainError::NotFound(_))
    ));
    assert_eq!(
        coordinator.get_user_team(target).await.unwrap().id(),
        first.id()
    );
}
