use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiResult, AppState, AuthUser};
use crate::applications::{ApplicationManager, ApplicationWithWorker};
use crate::contracts::{ContractLedger, ContractPage, Party};
use crate::database::models::{ApplicationStatus, Contract, ContractStatus, JobApplication, JobStatus};
use crate::jobs::{JobBoard, JobRow};
use crate::profiles::{BusinessDashboard, BusinessOnboarding, BusinessProfiles};

#[derive(Debug, Default, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationStatusChange {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct ContractStatusChange {
    pub status: ContractStatus,
}

pub async fn onboarding(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<BusinessOnboarding>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    let profile = BusinessProfiles::new(state.pool()).onboard(user.id(), input).await?;
    Ok(Json(json!({ "success": true, "businessProfile": profile })))
}

pub async fn dashboard(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<BusinessDashboard>> {
    let business = user.business_profile(&state).await?;
    let dashboard = BusinessProfiles::new(state.pool()).dashboard(&business.id).await?;
    Ok(Json(dashboard))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<JobFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<JobRow>>> {
    let Query(filter) = query?;
    let business = user.business_profile(&state).await?;
    let jobs = JobBoard::new(state.pool())
        .list_for_business(&business.id, filter.status)
        .await?;
    Ok(Json(jobs))
}

pub async fn job_applications(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Vec<ApplicationWithWorker>>> {
    let business = user.business_profile(&state).await?;
    let applications = ApplicationManager::new(state.pool())
        .list_for_job(&job_id, &business.id)
        .await?;
    Ok(Json(applications))
}

pub async fn update_application(
    State(state): State<AppState>,
    user: AuthUser,
    Path(application_id): Path<String>,
    payload: Result<Json<ApplicationStatusChange>, JsonRejection>,
) -> ApiResult<Json<JobApplication>> {
    let Json(change) = payload?;
    let business = user.business_profile(&state).await?;
    let application = ApplicationManager::new(state.pool())
        .update_status(&application_id, &business.id, change.status)
        .await?;
    Ok(Json(application))
}

pub async fn list_contracts(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ContractFilter>, QueryRejection>,
) -> ApiResult<Json<ContractPage>> {
    let Query(filter) = query?;
    let business = user.business_profile(&state).await?;
    let page = ContractLedger::new(state.pool())
        .list(Party::Business(&business.id), filter.status, filter.page, filter.limit)
        .await?;
    Ok(Json(page))
}

pub async fn update_contract(
    State(state): State<AppState>,
    user: AuthUser,
    Path(contract_id): Path<String>,
    payload: Result<Json<ContractStatusChange>, JsonRejection>,
) -> ApiResult<Json<Contract>> {
    let Json(change) = payload?;
    let business = user.business_profile(&state).await?;
    let contract = ContractLedger::new(state.pool())
        .update_status(&contract_id, &business.id, change.status)
        .await?;
    Ok(Json(contract))
}
