//! Public job search
//!
//! Filters are pushed into one `WHERE` clause that is shared by the count
//! and page queries, so `total` always reflects every filter.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::database::models::{JobType, LocationType, PaymentType, Urgency};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSort {
    #[default]
    Newest,
    Oldest,
    BudgetHigh,
    BudgetLow,
    Urgency,
}

impl JobSort {
    fn order_by(self) -> &'static str {
        match self {
            JobSort::Newest => " ORDER BY j.published_at DESC, j.created_at DESC, j.rowid DESC",
            JobSort::Oldest => " ORDER BY j.published_at ASC, j.created_at ASC, j.rowid ASC",
            JobSort::BudgetHigh => {
                " ORDER BY j.budget_max IS NULL, j.budget_max DESC, j.published_at DESC, j.rowid DESC"
            }
            JobSort::BudgetLow => {
                " ORDER BY j.budget_min IS NULL, j.budget_min ASC, j.published_at DESC, j.rowid DESC"
            }
            JobSort::Urgency => {
                " ORDER BY CASE j.urgency WHEN 'URGENT' THEN 3 WHEN 'HIGH' THEN 2 WHEN 'MEDIUM' THEN 1 ELSE 0 END DESC, j.published_at DESC, j.rowid DESC"
            }
        }
    }
}

/// Query-string parameters accepted by `GET /api/jobs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSearch {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    /// Comma-separated skill ids; a job matches when it requires any of them.
    pub skills: Option<String>,
    pub job_type: Option<JobType>,
    pub location_type: Option<LocationType>,
    pub payment_type: Option<PaymentType>,
    pub urgency: Option<Urgency>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    #[serde(default)]
    pub sort_by: JobSort,
}

impl JobSearch {
    pub fn skill_ids(&self) -> Vec<String> {
        self.skills
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn push_filters(&self, query: &mut QueryBuilder<'_, Sqlite>, now: DateTime<Utc>) {
        query.push(" WHERE j.status = 'ACTIVE' AND (j.expires_at IS NULL OR j.expires_at > ");
        query.push_bind(now);
        query.push(")");

        if let Some(text) = non_blank(&self.search) {
            let pattern = like_pattern(text);
            query.push(" AND (LOWER(j.title) LIKE ");
            query.push_bind(pattern.clone());
            query.push(" ESCAPE '\\' OR LOWER(j.description) LIKE ");
            query.push_bind(pattern);
            query.push(" ESCAPE '\\')");
        }

        let skill_ids = self.skill_ids();
        if !skill_ids.is_empty() {
            query.push(" AND EXISTS (SELECT 1 FROM json_each(j.required_skills) rs WHERE rs.value IN (");
            let mut separated = query.separated(", ");
            for id in skill_ids {
                separated.push_bind(id);
            }
            separated.push_unseparated("))");
        }

        if let Some(job_type) = self.job_type {
            query.push(" AND j.job_type = ");
            query.push_bind(job_type);
        }
        if let Some(location_type) = self.location_type {
            query.push(" AND j.location_type = ");
            query.push_bind(location_type);
        }
        if let Some(payment_type) = self.payment_type {
            query.push(" AND j.payment_type = ");
            query.push_bind(payment_type);
        }
        if let Some(urgency) = self.urgency {
            query.push(" AND j.urgency = ");
            query.push_bind(urgency);
        }
        if let Some(city) = non_blank(&self.city) {
            query.push(" AND LOWER(j.job_location_city) LIKE ");
            query.push_bind(like_pattern(city));
            query.push(" ESCAPE '\\'");
        }
        if let Some(state) = non_blank(&self.state) {
            query.push(" AND LOWER(j.job_location_state) LIKE ");
            query.push_bind(like_pattern(state));
            query.push(" ESCAPE '\\'");
        }
        if let Some(min_budget) = self.min_budget {
            query.push(" AND j.budget_max >= ");
            query.push_bind(min_budget);
        }
        if let Some(max_budget) = self.max_budget {
            query.push(" AND j.budget_min <= ");
            query.push_bind(max_budget);
        }
    }

    pub(crate) fn push_order(&self, query: &mut QueryBuilder<'_, Sqlite>) {
        query.push(self.sort_by.order_by());
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Case-insensitive substring pattern with LIKE wildcards escaped.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
