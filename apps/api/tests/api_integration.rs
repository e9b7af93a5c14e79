//! HTTP API integration tests
//!
//! Drive the full router with bearer tokens against the in-memory store:
//! - Health check and authentication
//! - Team creation, lookup and status changes
//! - Invitation and match flows
//! - Error status mapping

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use teamdate_api::api::{router, AppState};
use teamdate_api::auth::jwt::create_token;
use teamdate_api::domain::user::{Gender, User};
use teamdate_api::infrastructure::repositories::InMemoryStore;
use teamdate_api::services::TeamCoordinator;
use tower::util::ServiceExt; // for oneshot
use uuid::Uuid;

const SECRET: &str = "api-test-secret";

struct TestApp {
    store: InMemoryStore,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let coordinator = TeamCoordinator::new(Arc::new(store.clone()));
        let app = router(AppState::new(coordinator, SECRET));
        Self { store, app }
    }

    /// Registers a user in the directory and returns their id and token
    fn user(&self, gender: Gender) -> (Uuid, String) {
        let user = User::new(Uuid::new_v4(), gender);
        let id = user.id;
        self.store.insert_user(user).unwrap();
        (id, create_token(id, SECRET).unwrap())
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create_ready_team(&self, token: &str, name: &str) -> String {
        let (status, team) = self
            .call("POST", "/api/teams", Some(token), Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = team["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .call(
                "PUT",
                &format!("/api/teams/{}/status", id),
                Some(token),
                Some(json!({ "status": "READY" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        id
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new();

    let (status, _) = app.call("GET", "/api/teams/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = create_token(Uuid::new_v4(), "another-secret").unwrap();
    let (status, body) = app.call("GET", "/api/teams/mine", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_create_and_fetch_team() {
    let app = TestApp::new();
    let (leader, token) = app.user(Gender::Female);

    let (status, team) = app
        .call("POST", "/api/teams", Some(&token), Some(json!({ "name": "Crew" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(team["name"], "Crew");
    assert_eq!(team["status"], "PENDING");
    assert_eq!(team["gender"], "FEMALE");
    assert_eq!(team["headcount"], 1);
    assert_eq!(team["leader_id"], leader.to_string());

    let (status, mine) = app.call("GET", "/api/teams/mine", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["id"], team["id"]);

    let (status, _) = app
        .call("POST", "/api/teams", Some(&token), Some(json!({ "name": "Again" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_blank_name_is_unprocessable() {
    let app = TestApp::new();
    let (_, token) = app.user(Gender::Male);

    let (status, body) = app
        .call("POST", "/api/teams", Some(&token), Some(json!({ "name": "  " })))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().starts_with("Policy violation"));
}

#[tokio::test]
async fn test_unknown_team_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.user(Gender::Male);

    let (status, _) = app
        .call("GET", &format!("/api/teams/{}", Uuid::new_v4()), Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invitation_flow() {
    let app = TestApp::new();
    let (_, leader_token) = app.user(Gender::Male);
    let (member, member_token) = app.user(Gender::Male);
    let (_, stranger_token) = app.user(Gender::Male);

    let (_, team) = app
        .call("POST", "/api/teams", Some(&leader_token), Some(json!({ "name": "Crew" })))
        .await;
    let team_id = team["id"].as_str().unwrap();

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/teams/{}/invitations", team_id),
            Some(&stranger_token),
            Some(json!({ "user_id": member })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, invitation) = app
        .call(
            "POST",
            &format!("/api/teams/{}/invitations", team_id),
            Some(&leader_token),
            Some(json!({ "user_id": member })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let invitation_id = invitation["id"].as_str().unwrap();

    let (status, mine) = app.call("GET", "/api/invitations", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, joined) = app
        .call(
            "POST",
            &format!("/api/invitations/{}/accept", invitation_id),
            Some(&member_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["headcount"], 2);

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/invitations/{}/refuse", invitation_id),
            Some(&member_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leader_cannot_leave_populated_team() {
    let app = TestApp::new();
    let (_, leader_token) = app.user(Gender::Female);
    let (member, member_token) = app.user(Gender::Female);

    let (_, team) = app
        .call("POST", "/api/teams", Some(&leader_token), Some(json!({ "name": "Crew" })))
        .await;
    let team_id = team["id"].as_str().unwrap();
    let (_, invitation) = app
        .call(
            "POST",
            &format!("/api/teams/{}/invitations", team_id),
            Some(&leader_token),
            Some(json!({ "user_id": member })),
        )
        .await;
    app.call(
        "POST",
        &format!("/api/invitations/{}/accept", invitation["id"].as_str().unwrap()),
        Some(&member_token),
        None,
    )
    .await;

    let (status, _) = app.call("POST", "/api/teams/leave", Some(&leader_token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.call("POST", "/api/teams/leave", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_match_flow() {
    let app = TestApp::new();
    let (_, first_token) = app.user(Gender::Male);
    let (_, second_token) = app.user(Gender::Female);

    let first = app.create_ready_team(&first_token, "Night Owls").await;
    let second = app.create_ready_team(&second_token, "Early Birds").await;

    let (status, ready) = app
        .call("GET", "/api/teams/ready?name=birds", Some(&first_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready.as_array().unwrap().len(), 1);
    assert_eq!(ready[0]["id"], second.as_str());

    let (status, request) = app
        .call(
            "POST",
            &format!("/api/teams/{}/match-requests", first),
            Some(&first_token),
            Some(json!({ "receiver_team_id": second })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_str().unwrap();

    let (_, received) = app
        .call(
            "GET",
            &format!("/api/teams/{}/match-requests/received", second),
            Some(&second_token),
            None,
        )
        .await;
    assert_eq!(received.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/match-requests/{}/accept", request_id),
            Some(&first_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, matched) = app
        .call(
            "POST",
            &format!("/api/match-requests/{}/accept", request_id),
            Some(&second_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(matched["status"], "MATCHED");
    assert_eq!(matched["matched_team_id"], first.as_str());

    let (status, cleared) = app
        .call("DELETE", &format!("/api/teams/{}/match", first), Some(&first_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["status"], "READY");

    let (_, partner) = app
        .call("GET", &format!("/api/teams/{}", second), Some(&second_token), None)
        .await;
    assert_eq!(partner["status"], "READY");
    assert!(partner["matched_team_id"].is_null());
}

#[tokio::test]
async fn test_team_listings_are_forbidden_to_outsiders() {
    let app = TestApp::new();
    let (_, first_token) = app.user(Gender::Male);
    let (_, second_token) = app.user(Gender::Female);
    let (_, outsider_token) = app.user(Gender::Male);

    let first = app.create_ready_team(&first_token, "Night Owls").await;
    let second = app.create_ready_team(&second_token, "Early Birds").await;
    let (status, _) = app
        .call(
            "POST",
            &format!("/api/teams/{}/match-requests", first),
            Some(&first_token),
            Some(json!({ "receiver_team_id": second })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    for uri in [
        format!("/api/teams/{}/invitations", first),
        format!("/api/teams/{}/match-requests/sent", first),
        format!("/api/teams/{}/match-requests/received", second),
    ] {
        let (status, _) = app.call("GET", &uri, Some(&outsider_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }

    let (status, sent) = app
        .call(
            "GET",
            &format!("/api/teams/{}/match-requests/sent", first),
            Some(&first_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_self_match_is_unprocessable() {
    let app = TestApp::new();
    let (_, token) = app.user(Gender::Male);
    let team = app.create_ready_team(&token, "Solo").await;

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/teams/{}/match-requests", team),
            Some(&token),
            Some(json!({ "receiver_team_id": team })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_disband_team() {
    let app = TestApp::new();
    let (_, token) = app.user(Gender::Female);
    let (_, other_token) = app.user(Gender::Female);
    let team = app.create_ready_team(&token, "Crew").await;

    let (status, _) = app
        .call("DELETE", &format!("/api/teams/{}", team), Some(&other_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call("DELETE", &format!("/api/teams/{}", team), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call("GET", "/api/teams/mine", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
