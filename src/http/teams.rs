use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth;
use crate::authz;
use crate::models::{MemberRole, Team, TeamInvite, TeamMember};

use super::auth::json_body;
use super::{require_user, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinTeamRequest {
    pub code: String,
}

pub async fn list_teams(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let teams = state.store.list_teams_for_user(user.id).await?;

    let mut out = Vec::with_capacity(teams.len());
    for team in teams {
        let members = state.store.list_members(team.id).await?;
        out.push(json!({
            "team": team,
            "members": members,
        }));
    }
    Ok(Json(Value::Array(out)))
}

pub async fn create_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Team>), ApiError> {
    let user = require_user(&state, &headers).await?;
    let req = json_body(payload)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("team name is required".to_string()));
    }

    let now = Utc::now();
    let team = Team {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: req.description.filter(|d| !d.trim().is_empty()),
        created_by: user.id,
        created_at: now,
        updated_at: now,
    };
    let leader = TeamMember {
        id: Uuid::new_v4(),
        team_id: team.id,
        user_id: user.id,
        role: MemberRole::Leader,
        joined_at: now,
    };

    state
        .store
        .create_team_with_leader(team.clone(), leader)
        .await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_view(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden("you do not have access to this team"));
    }

    let members = state.store.list_members(team_id).await?;
    let week_ago = Utc::now() - Duration::days(7);
    let recent_log_count = state.store.count_team_logs_since(team_id, week_ago).await?;

    Ok(Json(json!({
        "team": team,
        "members": members,
        "stats": {
            "member_count": members.len(),
            "logs_last_7_days": recent_log_count,
        },
    })))
}

pub async fn update_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
    payload: Result<Json<UpdateTeamRequest>, JsonRejection>,
) -> Result<Json<Team>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let req = json_body(payload)?;

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(ApiError::BadRequest("team name is required".to_string()));
        }
    }

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_modify(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden("only the team leader can update the team"));
    }

    let updated = state
        .store
        .update_team(team_id, req.name, req.description)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    Ok(Json(updated))
}

pub async fn delete_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    if team.created_by != user.id {
        return Err(ApiError::Forbidden("only the team creator can delete the team"));
    }

    state.store.delete_team(team_id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn create_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_modify(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden(
            "only the team leader can create invite links",
        ));
    }

    let now = Utc::now();
    let invite = match state.store.active_invite_for_team(team_id, now).await? {
        Some(existing) => existing,
        None => {
            let invite = TeamInvite {
                id: Uuid::new_v4(),
                team_id,
                invite_code: auth::new_invite_code(),
                created_by: user.id,
                expires_at: now + Duration::days(auth::INVITE_TTL_DAYS),
                created_at: now,
            };
            state.store.create_invite(invite.clone()).await?;
            invite
        }
    };

    Ok(Json(json!({
        "invite_code": invite.invite_code,
        "invite_link": format!("{}/teams/join?code={}", state.config.public_url, invite.invite_code),
        "expires_at": invite.expires_at,
    })))
}

pub async fn join_team(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<JoinTeamRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let req = json_body(payload)?;

    let code = req.code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("invite code is required".to_string()));
    }

    let invite = state
        .store
        .active_invite_by_code(code, Utc::now())
        .await?
        .ok_or_else(|| ApiError::BadRequest("invalid or expired invite code".to_string()))?;

    if state
        .store
        .find_membership(invite.team_id, user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest("already a team member".to_string()));
    }

    let member = TeamMember {
        id: Uuid::new_v4(),
        team_id: invite.team_id,
        user_id: user.id,
        role: MemberRole::Member,
        joined_at: Utc::now(),
    };
    state.store.add_member(member).await?;

    let team = state.store.find_team(invite.team_id).await?;
    Ok(Json(json!({
        "success": true,
        "team_id": invite.team_id,
        "team": team,
    })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((team_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_modify(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden("only the team leader can remove members"));
    }

    let target = state
        .store
        .find_member(team_id, member_id)
        .await?
        .ok_or(ApiError::NotFound("team member not found"))?;
    if target.role == MemberRole::Leader {
        return Err(ApiError::BadRequest(
            "the team leader cannot be removed".to_string(),
        ));
    }

    state.store.remove_member(member_id).await?;
    Ok(Json(json!({ "success": true })))
}
