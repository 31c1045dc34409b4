use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::models::User;
use crate::store::Store;

pub mod auth;
pub mod error;
pub mod personal;
pub mod portfolios;
pub mod team_logs;
pub mod teams;

pub use error::ApiError;

pub struct AppConfig {
    /// Base URL used when building invite links and public portfolio URLs.
    pub public_url: String,
    pub require_email_confirmation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            public_url: "http://localhost:3000".to_string(),
            require_email_confirmation: false,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        AppState {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/verify-email", get(auth::verify_email))
        .route("/api/teams", get(teams::list_teams).post(teams::create_team))
        .route("/api/teams/join", post(teams::join_team))
        .route(
            "/api/teams/:team_id",
            get(teams::get_team)
                .put(teams::update_team)
                .delete(teams::delete_team),
        )
        .route("/api/teams/:team_id/invite", post(teams::create_invite))
        .route(
            "/api/teams/:team_id/members/:member_id",
            delete(teams::remove_member),
        )
        .route(
            "/api/teams/:team_id/logs",
            get(team_logs::list_logs).post(team_logs::create_log),
        )
        .route(
            "/api/teams/:team_id/logs/:log_id",
            get(team_logs::get_log)
                .put(team_logs::update_log)
                .delete(team_logs::delete_log),
        )
        .route(
            "/api/teams/:team_id/portfolios",
            get(portfolios::list_portfolios),
        )
        .route(
            "/api/teams/:team_id/portfolios/generate",
            post(portfolios::generate_portfolio),
        )
        .route(
            "/api/teams/:team_id/portfolios/:portfolio_id",
            get(portfolios::get_portfolio)
                .put(portfolios::update_portfolio)
                .delete(portfolios::delete_portfolio),
        )
        .route(
            "/api/logs",
            get(personal::list_logs).post(personal::create_log),
        )
        .route("/api/logs/summary", get(personal::summary))
        .route(
            "/api/logs/:log_id",
            put(personal::update_log).delete(personal::delete_log),
        )
        .route(
            "/api/portfolio",
            get(personal::get_portfolio).put(personal::update_portfolio),
        )
        .with_state(state)
}

async fn healthz(State(_state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Resolves the request's bearer token to a user, rejecting missing,
/// unknown, and expired sessions alike.
pub(crate) async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers).ok_or_else(ApiError::unauthenticated)?;
    let session = state
        .store
        .find_session(token)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;
    if session.expires_at <= Utc::now() {
        return Err(ApiError::unauthenticated());
    }
    state
        .store
        .find_user(session.user_id)
        .await?
        .ok_or_else(ApiError::unauthenticated)
}

#[cfg(test)]
mod tests;
