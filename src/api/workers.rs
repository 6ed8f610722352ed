use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{ApiResult, AppState, AuthUser};
use crate::applications::{ApplicationManager, ApplicationWithJob};
use crate::contracts::{ContractLedger, ContractPage, Party};
use crate::database::models::{ApplicationStatus, ContractStatus, JobApplication, PortfolioItem, WorkerProfile};
use crate::error::MarketplaceError;
use crate::jobs::saved::SavedJobView;
use crate::jobs::SavedJobs;
use crate::profiles::{Portfolio, PortfolioInput, WorkerOnboarding, WorkerProfileUpdate, WorkerProfileView, WorkerProfiles};
use crate::storage::delete_urls_best_effort;

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn onboarding(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<WorkerOnboarding>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    let profile = WorkerProfiles::new(state.pool()).onboard(user.id(), input).await?;
    Ok(Json(json!({ "success": true, "workerProfile": profile })))
}

pub async fn get_profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<WorkerProfileView>> {
    let profiles = WorkerProfiles::new(state.pool());
    let profile = profiles.require_by_user(user.id()).await?;
    Ok(Json(profiles.view(profile, false).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<WorkerProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<WorkerProfile>> {
    let Json(update) = payload?;
    let profile = WorkerProfiles::new(state.pool()).update(user.id(), update).await?;
    Ok(Json(profile))
}

/// Any signed-in user may view a worker; sensitive license fields are hidden.
pub async fn public_profile(
    State(state): State<AppState>,
    _viewer: AuthUser,
    Path(worker_id): Path<String>,
) -> ApiResult<Json<WorkerProfileView>> {
    let profiles = WorkerProfiles::new(state.pool());
    let profile = profiles
        .find(&worker_id)
        .await?
        .ok_or_else(MarketplaceError::worker_profile_missing)?;
    Ok(Json(profiles.view(profile, true).await?))
}

pub async fn list_portfolio(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<PortfolioItem>>> {
    let worker = user.worker_profile(&state).await?;
    let items = Portfolio::new(state.pool()).list(&worker.id).await?;
    Ok(Json(items))
}

pub async fn create_portfolio_item(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<PortfolioInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PortfolioItem>)> {
    let Json(input) = payload?;
    let worker = user.worker_profile(&state).await?;
    let item = Portfolio::new(state.pool()).create(&worker.id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_portfolio_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> ApiResult<Json<PortfolioItem>> {
    let worker = user.worker_profile(&state).await?;
    let item = Portfolio::new(state.pool()).get(&worker.id, &item_id).await?;
    Ok(Json(item))
}

pub async fn update_portfolio_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
    payload: Result<Json<PortfolioInput>, JsonRejection>,
) -> ApiResult<Json<PortfolioItem>> {
    let Json(input) = payload?;
    let worker = user.worker_profile(&state).await?;
    let item = Portfolio::new(state.pool()).update(&worker.id, &item_id, input).await?;
    Ok(Json(item))
}

pub async fn delete_portfolio_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let worker = user.worker_profile(&state).await?;
    let image_urls = Portfolio::new(state.pool()).delete(&worker.id, &item_id).await?;

    match &state.store {
        Some(store) => delete_urls_best_effort(store.as_ref(), &image_urls).await,
        None => debug!("No object store configured; leaving {} images in place", image_urls.len()),
    }

    Ok(Json(json!({ "success": true })))
}

pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ApplicationFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<ApplicationWithJob>>> {
    let Query(filter) = query?;
    let worker = user.worker_profile(&state).await?;
    let applications = ApplicationManager::new(state.pool())
        .list_for_worker(&worker.id, filter.status)
        .await?;
    Ok(Json(applications))
}

pub async fn withdraw_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(application_id): Path<String>,
) -> ApiResult<Json<JobApplication>> {
    let worker = user.worker_profile(&state).await?;
    let application = ApplicationManager::new(state.pool())
        .withdraw(&application_id, &worker.id)
        .await?;
    Ok(Json(application))
}

pub async fn list_contracts(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ContractFilter>, QueryRejection>,
) -> ApiResult<Json<ContractPage>> {
    let Query(filter) = query?;
    let worker = user.worker_profile(&state).await?;
    let page = ContractLedger::new(state.pool())
        .list(Party::Worker(&worker.id), filter.status, filter.page, filter.limit)
        .await?;
    Ok(Json(page))
}

pub async fn saved_jobs(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<SavedJobView>>> {
    let worker = user.worker_profile(&state).await?;
    let saved = SavedJobs::new(state.pool()).list(&worker.id).await?;
    Ok(Json(saved))
}
