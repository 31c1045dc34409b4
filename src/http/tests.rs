use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::http::{build_router, AppConfig, AppState};
use crate::store::{MemStore, Store};

fn test_app() -> (Router, Arc<MemStore>) {
    app_with_config(AppConfig::default())
}

fn app_with_config(config: AppConfig) -> (Router, Arc<MemStore>) {
    let store = Arc::new(MemStore::new());
    let state = AppState::new(store.clone(), config);
    (build_router(state), store)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn signup(app: &Router, email: &str, name: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": email, "password": "password-123", "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_team(app: &Router, token: &str, name: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/teams",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create team failed: {body}");
    body["id"].as_str().unwrap().to_string()
}

async fn create_team_log(app: &Router, token: &str, team_id: &str, title: &str, tags: Value) {
    let (status, body) = call(
        app,
        Method::POST,
        &format!("/api/teams/{team_id}/logs"),
        Some(token),
        Some(json!({
            "title": title,
            "what_learned": ["ownership", "borrowing"],
            "tags": tags,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create log failed: {body}");
}

#[tokio::test]
async fn healthz_needs_no_auth() {
    let (app, _) = test_app();
    let (status, body) = call(&app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn signup_login_me_logout_flow() {
    let (app, _) = test_app();

    let token = signup(&app, "avery@example.com", "Avery").await;
    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "avery@example.com");
    assert_eq!(body["email_verified"], true);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "avery@example.com", "password": "password-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login_token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "avery@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid email or password");

    let (status, _) = call(&app, Method::POST, "/api/auth/logout", Some(&login_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/api/auth/me", Some(&login_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_validation_and_duplicates() {
    let (app, _) = test_app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "not-an-email", "password": "password-123", "name": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "short@example.com", "password": "short", "name": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    signup(&app, "dup@example.com", "First").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "dup@example.com", "password": "password-123", "name": "Second" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email is already registered");
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let (app, _) = test_app();
    let (status, body) = call(&app, Method::GET, "/api/teams", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn team_lifecycle_and_role_checks() {
    let (app, _) = test_app();
    let leader = signup(&app, "leader@example.com", "Leader").await;
    let outsider = signup(&app, "outsider@example.com", "Outsider").await;

    let team_id = create_team(&app, &leader, "Alpha").await;

    // Outsiders see neither the team nor its logs.
    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/teams/{team_id}"),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/teams/{team_id}"),
        Some(&outsider),
        Some(json!({ "name": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Invite and join.
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/invite"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = body["invite_code"].as_str().unwrap().to_string();
    assert!(body["invite_link"].as_str().unwrap().contains(&code));

    // A second request reuses the active code.
    let (_, body) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/invite"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(body["invite_code"], code.as_str());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/teams/join",
        Some(&outsider),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "join failed: {body}");
    assert_eq!(body["success"], true);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/teams/join",
        Some(&outsider),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "already a team member");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/teams/join",
        Some(&leader),
        Some(json!({ "code": "NOPE1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid or expired invite code");

    // Members can view but not modify.
    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/teams/{team_id}"),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["member_count"], 2);
    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/teams/{team_id}"),
        Some(&outsider),
        Some(json!({ "name": "Still Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Leader updates and removes the joined member.
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/teams/{team_id}"),
        Some(&leader),
        Some(json!({ "name": "Alpha Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alpha Renamed");

    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/teams/{team_id}"),
        Some(&leader),
        None,
    )
    .await;
    let member_id = body["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["role"] == "member")
        .map(|m| m["id"].as_str().unwrap().to_string())
        .unwrap();

    // The leader membership itself cannot be removed.
    let leader_member_id = body["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["role"] == "leader")
        .map(|m| m["id"].as_str().unwrap().to_string())
        .unwrap();
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team_id}/members/{leader_member_id}"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team_id}/members/{member_id}"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // Only the creator can delete.
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team_id}"),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team_id}"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/teams/{team_id}"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn team_log_validation_and_author_rules() {
    let (app, _) = test_app();
    let author = signup(&app, "author@example.com", "Author").await;
    let reader = signup(&app, "reader@example.com", "Reader").await;

    let team_id = create_team(&app, &author, "Logbook").await;

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/logs"),
        Some(&author),
        Some(json!({ "title": "", "what_learned": ["x"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/logs"),
        Some(&author),
        Some(json!({ "title": "Day 1", "what_learned": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("what_learned"));

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/logs"),
        Some(&author),
        Some(json!({
            "title": "Day 1",
            "what_learned": ["ownership"],
            "tags": ["rust"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let log_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["author"]["name"], "Author");

    // Bring the reader in as a member; they can read but not edit.
    let (_, invite) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/invite"),
        Some(&author),
        None,
    )
    .await;
    call(
        &app,
        Method::POST,
        "/api/teams/join",
        Some(&reader),
        Some(json!({ "code": invite["invite_code"] })),
    )
    .await;

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/teams/{team_id}/logs/{log_id}"),
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/teams/{team_id}/logs/{log_id}"),
        Some(&reader),
        Some(json!({ "title": "Edited by reader" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "only the author can update this log");

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/teams/{team_id}/logs/{log_id}"),
        Some(&author),
        Some(json!({ "title": "Day 1 (edited)" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Day 1 (edited)");
    assert_eq!(body["what_learned"][0], "ownership");

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team_id}/logs/{log_id}"),
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team_id}/logs/{log_id}"),
        Some(&author),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/teams/{team_id}/logs"),
        Some(&author),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn portfolio_generation_overwrites_in_place() {
    let (app, _) = test_app();
    let leader = signup(&app, "gen@example.com", "Gen").await;
    let team_id = create_team(&app, &leader, "Shipit").await;

    create_team_log(&app, &leader, &team_id, "Week 1", json!(["rust", "axum"])).await;
    create_team_log(&app, &leader, &team_id, "Week 2", json!(["rust", "sqlx"])).await;

    let (status, first) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/portfolios/generate"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let content = first["content"].as_str().unwrap();
    assert!(content.starts_with("# Shipit Portfolio"));
    assert!(content.contains("### 1. Week 1"));
    assert!(content.contains("### 2. Week 2"));
    assert!(content.contains("#rust"));
    assert!(first["summary"].as_str().unwrap().contains("ownership"));

    let (status, second) = call(
        &app,
        Method::POST,
        &format!("/api/teams/{team_id}/portfolios/generate"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["summary"], second["summary"]);
    assert_eq!(first["public_url"], second["public_url"]);

    let (_, listed) = call(
        &app,
        Method::GET,
        &format!("/api/teams/{team_id}/portfolios"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Leader-only mutation of the stored document.
    let portfolio_id = first["id"].as_str().unwrap();
    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/teams/{team_id}/portfolios/{portfolio_id}"),
        Some(&leader),
        Some(json!({ "is_public": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_public"], true);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/teams/{team_id}/portfolios/{portfolio_id}"),
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn personal_logs_feed_the_summary() {
    let (app, _) = test_app();
    let token = signup(&app, "solo@example.com", "Solo").await;

    let today = Utc::now().date_naive();
    let dates = [
        today - Duration::days(1),
        today - Duration::days(1),
        today - Duration::days(3),
        today - Duration::days(45),
    ];
    let tags = [
        json!(["rust", "axum"]),
        json!(["rust"]),
        json!([]),
        json!(["ancient"]),
    ];
    for (date, tags) in dates.iter().zip(tags) {
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/logs",
            Some(&token),
            Some(json!({
                "content": "studied",
                "log_date": date.format("%Y-%m-%d").to_string(),
                "tags": tags,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/logs",
        Some(&token),
        Some(json!({ "content": "bad date", "log_date": "01/02/2024" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = call(&app, Method::GET, "/api/logs/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_logs"], 4);
    assert_eq!(report["total_days"], 3);
    assert_eq!(report["average_per_day"], 1.33);
    assert_eq!(report["recent_logs"].as_array().unwrap().len(), 3);
    assert_eq!(report["top_tags"][0]["tag"], "rust");
    assert_eq!(report["top_tags"][0]["count"], 2);
}

#[tokio::test]
async fn personal_portfolio_upsert_keeps_slug() {
    let (app, _) = test_app();
    let token = signup(&app, "Jordan.Kim@example.com", "Jordan").await;

    let (status, body) = call(&app, Method::GET, "/api/portfolio", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let (status, first) = call(
        &app,
        Method::PUT,
        "/api/portfolio",
        Some(&token),
        Some(json!({ "bio": "Backend dev", "skills": ["rust"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["slug"], "jordan-kim");
    assert_eq!(first["skills"][0], "rust");

    let (status, second) = call(
        &app,
        Method::PUT,
        "/api/portfolio",
        Some(&token),
        Some(json!({ "is_public": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["slug"], "jordan-kim");
    assert_eq!(second["bio"], "Backend dev");
    assert_eq!(second["is_public"], true);
}

#[tokio::test]
async fn email_verification_consumes_the_token() {
    let (app, store) = app_with_config(AppConfig {
        require_email_confirmation: true,
        ..AppConfig::default()
    });

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({
            "email": "pending@example.com",
            "password": "password-123",
            "name": "Pending",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["requires_email_confirmation"], true);
    assert!(body["token"].is_null());

    let user = store
        .find_user_by_email("pending@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!user.email_verified);
    let verify_token = user.verify_token.unwrap();

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/auth/verify-email?token={verify_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let user = store
        .find_user_by_email("pending@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(user.email_verified);
    assert!(user.verify_token.is_none());

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/api/auth/verify-email?token={verify_token}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
