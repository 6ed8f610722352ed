//! Contracts created when a business accepts an application

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::database::models::*;
use crate::error::MarketplaceError;
use crate::notifications::NewNotification;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractJob {
    pub id: String,
    pub title: String,
    pub job_type: JobType,
    pub payment_type: PaymentType,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractParty {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractView {
    #[serde(flatten)]
    pub contract: Contract,
    pub job_post: ContractJob,
    pub business: BusinessSummary,
    pub worker: ContractParty,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPage {
    pub contracts: Vec<ContractView>,
    pub pagination: Pagination,
}

#[derive(sqlx::FromRow)]
struct ContractRow {
    #[sqlx(flatten)]
    contract: Contract,
    job_title: String,
    job_type: JobType,
    payment_type: PaymentType,
    budget_min: Option<f64>,
    budget_max: Option<f64>,
    job_start_date: Option<DateTime<Utc>>,
    job_end_date: Option<DateTime<Utc>>,
    company_name: String,
    logo_url: Option<String>,
    location_city: Option<String>,
    location_state: Option<String>,
    verification_status: VerificationStatus,
    worker_first_name: String,
    worker_last_name: String,
    worker_user_id: String,
}

impl From<ContractRow> for ContractView {
    fn from(row: ContractRow) -> Self {
        ContractView {
            job_post: ContractJob {
                id: row.contract.job_post_id.clone(),
                title: row.job_title,
                job_type: row.job_type,
                payment_type: row.payment_type,
                budget_min: row.budget_min,
                budget_max: row.budget_max,
                start_date: row.job_start_date,
                end_date: row.job_end_date,
            },
            business: BusinessSummary {
                id: row.contract.business_id.clone(),
                company_name: row.company_name,
                logo_url: row.logo_url,
                location_city: row.location_city,
                location_state: row.location_state,
                verification_status: row.verification_status,
            },
            worker: ContractParty {
                id: row.contract.worker_id.clone(),
                first_name: row.worker_first_name,
                last_name: row.worker_last_name,
            },
            contract: row.contract,
        }
    }
}

const CONTRACT_SELECT: &str = r#"
    SELECT c.*,
           j.title AS job_title, j.job_type, j.payment_type, j.budget_min, j.budget_max,
           j.start_date AS job_start_date, j.end_date AS job_end_date,
           b.company_name, b.logo_url, b.location_city, b.location_state, b.verification_status,
           w.first_name AS worker_first_name, w.last_name AS worker_last_name,
           w.user_id AS worker_user_id
    FROM contracts c
    JOIN job_posts j ON j.id = c.job_post_id
    JOIN business_profiles b ON b.id = c.business_id
    JOIN worker_profiles w ON w.id = c.worker_id
"#;

/// Which side of the contract is asking.
#[derive(Debug, Clone, Copy)]
pub enum Party<'a> {
    Worker(&'a str),
    Business(&'a str),
}

impl Party<'_> {
    fn push_scope(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        let (column, id) = match self {
            Party::Worker(id) => ("c.worker_id", *id),
            Party::Business(id) => ("c.business_id", *id),
        };
        query.push(" WHERE ");
        query.push(column);
        query.push(" = ");
        query.push_bind(id.to_string());
    }
}

pub struct ContractLedger {
    pool: SqlitePool,
}

impl ContractLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Contracts for one party, newest first.
    pub async fn list(
        &self,
        party: Party<'_>,
        status: Option<ContractStatus>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<ContractPage, MarketplaceError> {
        let (page, limit) = Pagination::window(page, limit, DEFAULT_PAGE_SIZE);

        let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM contracts c");
        party.push_scope(&mut count);
        if let Some(status) = status {
            count.push(" AND c.status = ");
            count.push_bind(status);
        }
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;
        let pagination = Pagination::new(page, limit, total);

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(CONTRACT_SELECT);
        party.push_scope(&mut query);
        if let Some(status) = status {
            query.push(" AND c.status = ");
            query.push_bind(status);
        }
        query.push(" ORDER BY c.created_at DESC, c.rowid DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let rows = query.build_query_as::<ContractRow>().fetch_all(&self.pool).await?;
        Ok(ContractPage {
            contracts: rows.into_iter().map(ContractView::from).collect(),
            pagination,
        })
    }

    pub async fn get(&self, contract_id: &str) -> Result<ContractView, MarketplaceError> {
        self.row(contract_id).await.map(ContractView::from)
    }

    async fn row(&self, contract_id: &str) -> Result<ContractRow, MarketplaceError> {
        sqlx::query_as::<_, ContractRow>(&format!("{} WHERE c.id = ?", CONTRACT_SELECT))
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MarketplaceError::not_found("Contract"))
    }

    /// Business-side status change. Completion credits the worker and
    /// notifies them.
    pub async fn update_status(
        &self,
        contract_id: &str,
        business_id: &str,
        next: ContractStatus,
    ) -> Result<Contract, MarketplaceError> {
        let row = self.row(contract_id).await?;
        if row.contract.business_id != business_id {
            return Err(MarketplaceError::forbidden());
        }
        let current = row.contract.status;
        if !current.can_transition_to(next) {
            return Err(MarketplaceError::ConflictError(format!(
                "Cannot change contract status from {:?} to {:?}",
                current, next
            )));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let end_date = match next {
            ContractStatus::Completed | ContractStatus::Cancelled => Some(row.contract.end_date.unwrap_or(now)),
            _ => row.contract.end_date,
        };

        let contract = sqlx::query_as::<_, Contract>(
            "UPDATE contracts SET status = ?, end_date = ?, updated_at = ? WHERE id = ? AND status = ? RETURNING *",
        )
        .bind(next)
        .bind(end_date)
        .bind(now)
        .bind(contract_id)
        .bind(current)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            MarketplaceError::ConflictError("Contract status changed, reload and try again".to_string())
        })?;

        match next {
            ContractStatus::Completed => {
                sqlx::query(
                    "UPDATE worker_profiles SET total_jobs_completed = total_jobs_completed + 1, updated_at = ? WHERE id = ?",
                )
                .bind(now)
                .bind(&contract.worker_id)
                .execute(&mut *tx)
                .await?;

                NewNotification::new(
                    &row.worker_user_id,
                    NotificationType::ContractCompleted,
                    "Contract Completed",
                    format!(
                        "Your contract for {} with {} has been marked as completed.",
                        row.job_title, row.company_name
                    ),
                )
                .link("/contracts")
                .insert(&mut *tx)
                .await?;
            }
            ContractStatus::Cancelled => {
                NewNotification::new(
                    &row.worker_user_id,
                    NotificationType::System,
                    "Contract Cancelled",
                    format!(
                        "Your contract for {} with {} has been cancelled.",
                        row.job_title, row.company_name
                    ),
                )
                .link("/contracts")
                .insert(&mut *tx)
                .await?;
            }
            _ => {}
        }

        tx.commit().await?;
        info!("Contract {} moved {:?} -> {:?}", contract_id, current, next);
        Ok(contract)
    }
}
