use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth;
use crate::models::{Session, User, UserPublic};

use super::{bearer_token, require_user, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn new_session(user_id: Uuid) -> Session {
    let now = Utc::now();
    Session {
        token: auth::new_session_token(),
        user_id,
        created_at: now,
        expires_at: now + Duration::days(auth::SESSION_TTL_DAYS),
    }
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    }
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let req = json_body(payload)?;

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest(
            "a valid email address is required".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest(
            "email is already registered".to_string(),
        ));
    }

    let require_confirmation = state.config.require_email_confirmation;
    let verify_token = require_confirmation.then(|| auth::random_token(32));
    let user = User {
        id: Uuid::new_v4(),
        email,
        name: name.to_string(),
        password_hash: auth::hash_password(&req.password),
        email_verified: !require_confirmation,
        verify_token: verify_token.clone(),
        created_at: Utc::now(),
    };
    state.store.create_user(user.clone()).await?;

    if let Some(token) = &verify_token {
        // Email delivery is an external concern; the link is only logged.
        tracing::info!(
            email = %user.email,
            verify_url = %format!("{}/api/auth/verify-email?token={token}", state.config.public_url),
            "verification email queued"
        );
        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "user": UserPublic::from(&user),
                "requires_email_confirmation": true,
            })),
        ));
    }

    let session = new_session(user.id);
    state.store.create_session(session.clone()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user": UserPublic::from(&user),
            "token": session.token,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = json_body(payload)?;
    let email = req.email.trim().to_lowercase();

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .filter(|u| auth::verify_password(&req.password, &u.password_hash))
        .ok_or(ApiError::Unauthenticated("invalid email or password"))?;

    let session = new_session(user.id);
    state.store.create_session(session.clone()).await?;
    Ok(Json(json!({
        "user": UserPublic::from(&user),
        "token": session.token,
    })))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers).ok_or_else(ApiError::unauthenticated)?;
    state.store.delete_session(token).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "email_verified": user.email_verified,
    })))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let token = params
        .get("token")
        .map(String::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("token is required".to_string()))?;

    match state.store.verify_email(token).await? {
        Some(_) => Ok(Json(json!({ "success": true }))),
        None => Err(ApiError::BadRequest(
            "invalid or expired verification token".to_string(),
        )),
    }
}
