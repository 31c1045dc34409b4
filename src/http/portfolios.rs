use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz;
use crate::models::{Portfolio, PortfolioPatch};
use crate::portfolio as renderer;
use crate::store::LogOrder;

use super::auth::json_body;
use super::{require_user, ApiError, AppState};

pub async fn list_portfolios(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<Portfolio>>, ApiError> {
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

    let portfolios = state.store.list_portfolios(team_id).await?;
    Ok(Json(portfolios))
}

pub async fn generate_portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(team_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Portfolio>), ApiError> {
    let user = require_user(&state, &headers).await?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_view(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden(
            "only team members can generate the portfolio",
        ));
    }

    let logs = state
        .store
        .list_team_logs(team_id, LogOrder::CreatedAsc)
        .await?;
    let members = state.store.list_members(team_id).await?;

    let now = Utc::now();
    let rendered = renderer::render_portfolio(&team, &logs, members.len(), now);

    let id = Uuid::new_v4();
    let fresh = Portfolio {
        id,
        team_id,
        title: format!("{} Portfolio", team.name),
        summary: rendered.summary,
        content: rendered.markdown,
        public_url: Some(format!("{}/portfolio/{id}", state.config.public_url)),
        is_public: false,
        created_at: now,
        updated_at: now,
    };
    let stored = state.store.upsert_team_portfolio(fresh).await?;

    tracing::info!(team_id = %team_id, portfolio_id = %stored.id, "portfolio generated");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn get_portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((team_id, portfolio_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Portfolio>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let portfolio = state
        .store
        .find_portfolio(team_id, portfolio_id)
        .await?
        .ok_or(ApiError::NotFound("portfolio not found"))?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_view(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden("you do not have access to this team"));
    }

    Ok(Json(portfolio))
}

pub async fn update_portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((team_id, portfolio_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<PortfolioPatch>, JsonRejection>,
) -> Result<Json<Portfolio>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let patch = json_body(payload)?;

    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            return Err(ApiError::BadRequest("title is required".to_string()));
        }
    }

    state
        .store
        .find_portfolio(team_id, portfolio_id)
        .await?
        .ok_or(ApiError::NotFound("portfolio not found"))?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_modify(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden(
            "only the team leader can update the portfolio",
        ));
    }

    let updated = state
        .store
        .update_portfolio(team_id, portfolio_id, patch)
        .await?
        .ok_or(ApiError::NotFound("portfolio not found"))?;
    Ok(Json(updated))
}

pub async fn delete_portfolio(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((team_id, portfolio_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers).await?;

    state
        .store
        .find_portfolio(team_id, portfolio_id)
        .await?
        .ok_or(ApiError::NotFound("portfolio not found"))?;

    let team = state
        .store
        .find_team(team_id)
        .await?
        .ok_or(ApiError::NotFound("team not found"))?;
    let membership = state.store.find_membership(team_id, user.id).await?;
    if !authz::can_modify(&team, membership.as_ref(), user.id) {
        return Err(ApiError::Forbidden(
            "only the team leader can delete the portfolio",
        ));
    }

    state.store.delete_portfolio(portfolio_id).await?;
    Ok(Json(json!({ "success": true })))
}
