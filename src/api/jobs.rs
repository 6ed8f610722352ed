use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use super::{ApiResult, AppState, AuthUser};
use crate::applications::{ApplicationManager, ApplyInput};
use crate::catalog::SkillCatalog;
use crate::database::models::{JobApplication, JobPost, SavedJob, Skill};
use crate::jobs::{JobBoard, JobDetail, JobInput, JobPage, JobSearch, SavedJobs};
use crate::profiles::WorkerProfiles;

pub async fn list_skills(State(state): State<AppState>) -> ApiResult<Json<Vec<Skill>>> {
    let skills = SkillCatalog::new(state.pool()).list().await?;
    Ok(Json(skills))
}

pub async fn search_jobs(
    State(state): State<AppState>,
    query: Result<Query<JobSearch>, QueryRejection>,
) -> ApiResult<Json<JobPage>> {
    let Query(search) = query?;
    let page = JobBoard::new(state.pool()).search(&search).await?;
    Ok(Json(page))
}

pub async fn create_job(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<JobInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobPost>)> {
    let Json(input) = payload?;
    let business = user.business_profile(&state).await?;
    let job = JobBoard::new(state.pool()).create(&business.id, input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_job(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobDetail>> {
    // Only workers get the applied/saved flags.
    let worker = match &viewer {
        Some(user) => WorkerProfiles::new(state.pool()).find_by_user(user.id()).await?,
        None => None,
    };
    let detail = JobBoard::new(state.pool())
        .get(&job_id, worker.as_ref().map(|w| w.id.as_str()))
        .await?;
    Ok(Json(detail))
}

pub async fn update_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
    payload: Result<Json<JobInput>, JsonRejection>,
) -> ApiResult<Json<JobPost>> {
    let Json(input) = payload?;
    let business = user.business_profile(&state).await?;
    let job = JobBoard::new(state.pool()).update(&job_id, &business.id, input).await?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let business = user.business_profile(&state).await?;
    JobBoard::new(state.pool()).delete(&job_id, &business.id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn apply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
    payload: Result<Json<ApplyInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobApplication>)> {
    let Json(input) = payload?;
    let worker = user.worker_profile(&state).await?;
    let application = ApplicationManager::new(state.pool())
        .apply(&worker, &job_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn save_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SavedJob>)> {
    let worker = user.worker_profile(&state).await?;
    let saved = SavedJobs::new(state.pool()).save(&worker.id, &job_id).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn unsave_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let worker = user.worker_profile(&state).await?;
    SavedJobs::new(state.pool()).unsave(&worker.id, &job_id).await?;
    Ok(Json(json!({ "success": true })))
}
