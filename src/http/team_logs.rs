use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz;
use crate::models::{Team, TeamLog, TeamLogPatch, TeamLogWithAuthor, UserPublic};
use crate::store::LogOrder;

use super::auth::json_body;
use super::{require_user, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub title: String,
    pub description: Option<String>,
    pub what_learned: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

async fn viewable_team(
    state: &AppState,
    team_id: Uuid,
    user_id: Uuid,
) -> Result<Team, ApiError> {
    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user_id).await?;
    if !authz::can_view(&team, membership.as_ref(), user_id) {
        return Err(ApiError::Forbidden("you do not have access to this team"));
    }
    Ok(team)
}

pub async fn list_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<TeamLogWithAuthor>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    viewable_team(&state, team_id, user.id).await?;

    let logs = state
        .store
        .list_team_logs(team_id, LogOrder::CreatedDesc)
        .await?;
    Ok(Json(logs))
}

pub async fn create_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
    payload: Result<Json<CreateLogRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TeamLogWithAuthor>), ApiError> {
    let user = require_user(&state, &headers).await?;
    let req = json_body(payload)?;

    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let what_learned: Vec<String> = req
        .what_learned
        .into_iter()
        .filter(|item| !item.trim().is_empty())
        .collect();
    if what_learned.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one what_learned item is required".to_string(),
        ));
    }

    viewable_team(&state, team_id, user.id).await?;

    let now = Utc::now();
    let log = TeamLog {
        id: Uuid::new_v4(),
        team_id,
        created_by: user.id,
        title: req.title.trim().to_string(),
        description: req.description.filter(|d| !d.trim().is_empty()),
        what_learned,
        improvements: req.improvements,
        next_steps: req.next_steps,
        tags: req.tags,
        created_at: now,
        updated_at: now,
    };
    state.store.create_team_log(log.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(TeamLogWithAuthor {
            log,
            author: Some(UserPublic::from(&user)),
        }),
    ))
}

pub async fn get_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((team_id, log_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TeamLogWithAuthor>, ApiError> {
    let user = require_user(&state, &headers).await?;
    viewable_team(&state, team_id, user.id).await?;

    let log = state
        .store
        .find_team_log(team_id, log_id)
        .await?
        .ok_or(ApiError::NotFound("learning log not found"))?;
    Ok(Json(log))
}

pub async fn update_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((team_id, log_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<TeamLogPatch>, JsonRejection>,
) -> Result<Json<TeamLogWithAuthor>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let patch = json_body(payload)?;

    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(ApiError::BadRequest("title is required".to_string()));
        }
    }
    if let Some(what_learned) = &patch.what_learned {
        if what_learned.iter().all(|item| item.trim().is_empty()) {
            return Err(ApiError::BadRequest(
                "at least one what_learned item is required".to_string(),
            ));
        }
    }

    let log = state
        .store
        .find_team_log(team_id, log_id)
        .await?
        .ok_or(ApiError::NotFound("learning log not found"))?;
    if log.log.created_by != user.id {
        return Err(ApiError::Forbidden("only the author can update this log"));
    }

    let updated = state
        .store
        .update_team_log(log_id, patch)
        .await?
        .ok_or(ApiError::NotFound("learning log not found"))?;
    Ok(Json(updated))
}

pub async fn delete_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((team_id, log_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let log = state
        .store
        .find_team_log(team_id, log_id)
        .await?
        .ok_or(ApiError::NotFound("learning log not found"))?;
    if log.log.created_by != user.id {
        return Err(ApiError::Forbidden("only the author can delete this log"));
    }

    state.store.delete_team_log(log_id).await?;
    Ok(Json(json!({ "success": true })))
}
