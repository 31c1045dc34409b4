use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth;
use crate::models::{PersonalLog, PersonalLogPatch, PersonalPortfolio};
use crate::stats::{self, AggregateReport, LogEntry};

use super::auth::json_body;
use super::{require_user, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreatePersonalLogRequest {
    pub content: String,
    pub log_date: String,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePersonalPortfolioRequest {
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub achievements: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

fn parse_log_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest("log_date must be formatted YYYY-MM-DD".to_string()))
}

pub async fn create_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreatePersonalLogRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PersonalLog>), ApiError> {
    let user = require_user(&state, &headers).await?;
    let req = json_body(payload)?;

    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content is required".to_string()));
    }
    let log_date = parse_log_date(&req.log_date)?;

    let log = PersonalLog {
        id: Uuid::new_v4(),
        user_id: user.id,
        content: req.content,
        log_date,
        tags: req.tags.filter(|tags| !tags.is_empty()),
        created_at: Utc::now(),
    };
    state.store.create_personal_log(log.clone()).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn list_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<PersonalLog>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let logs = state.store.list_personal_logs(user.id).await?;
    Ok(Json(logs))
}

pub async fn update_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(log_id): Path<Uuid>,
    payload: Result<Json<PersonalLogPatch>, JsonRejection>,
) -> Result<Json<PersonalLog>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let patch = json_body(payload)?;

    if let Some(content) = &patch.content {
        if content.trim().is_empty() {
            return Err(ApiError::BadRequest("content is required".to_string()));
        }
    }

    let updated = state
        .store
        .update_personal_log(user.id, log_id, patch)
        .await?
        .ok_or(ApiError::NotFound("learning log not found"))?;
    Ok(Json(updated))
}

pub async fn delete_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(log_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let deleted = state.store.delete_personal_log(user.id, log_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("learning log not found"));
    }
    Ok(Json(json!({ "success": true })))
}

/// Aggregate statistics over the caller's personal logs, computed fresh on
/// every request.
pub async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AggregateReport>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let logs = state.store.list_personal_logs(user.id).await?;
    let entries: Vec<LogEntry> = logs
        .into_iter()
        .map(|log| LogEntry {
            id: log.id,
            content: log.content,
            log_date: log.log_date,
            tags: log.tags.unwrap_or_default(),
        })
        .collect();

    let report = stats::compute_stats(&entries, Utc::now().date_naive());
    Ok(Json(report))
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<PersonalPortfolio>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let portfolio = state.store.find_personal_portfolio(user.id).await?;
    Ok(Json(portfolio))
}

pub async fn update_portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UpdatePersonalPortfolioRequest>, JsonRejection>,
) -> Result<Json<PersonalPortfolio>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let req = json_body(payload)?;

    let existing = state.store.find_personal_portfolio(user.id).await?;
    let slug = match &existing {
        Some(portfolio) => portfolio.slug.clone(),
        None => {
            let base = auth::slug_from_email(&user.email);
            let mut candidate = base.clone();
            let mut counter = 0;
            while state.store.is_slug_taken(&candidate, user.id).await? {
                counter += 1;
                candidate = format!("{base}-{counter}");
            }
            candidate
        }
    };

    let now = Utc::now();
    let fresh = PersonalPortfolio {
        id: existing.as_ref().map(|p| p.id).unwrap_or_else(Uuid::new_v4),
        user_id: user.id,
        bio: req
            .bio
            .or_else(|| existing.as_ref().and_then(|p| p.bio.clone())),
        skills: req
            .skills
            .unwrap_or_else(|| existing.as_ref().map(|p| p.skills.clone()).unwrap_or_default()),
        achievements: req.achievements.unwrap_or_else(|| {
            existing
                .as_ref()
                .map(|p| p.achievements.clone())
                .unwrap_or_default()
        }),
        is_public: req
            .is_public
            .unwrap_or_else(|| existing.as_ref().map(|p| p.is_public).unwrap_or(false)),
        slug,
        created_at: existing.as_ref().map(|p| p.created_at).unwrap_or(now),
        updated_at: now,
    };

    let stored = state.store.upsert_personal_portfolio(fresh).await?;
    Ok(Json(stored))
}
