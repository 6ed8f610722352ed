//! Skill catalog and seed data

pub mod seed;

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::database::models::Skill;
use crate::error::MarketplaceError;

pub struct SkillCatalog {
    pool: SqlitePool,
}

impl SkillCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Skill>, MarketplaceError> {
        let skills = sqlx::query_as::<_, Skill>("SELECT id, name, category FROM skills ORDER BY category, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(skills)
    }

    /// Look up skills by id; unknown ids are simply absent from the map.
    pub async fn resolve<'a, I>(&self, ids: I) -> Result<HashMap<String, Skill>, MarketplaceError>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut ids: Vec<&String> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, name, category FROM skills WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let skills = query.build_query_as::<Skill>().fetch_all(&self.pool).await?;
        Ok(skills.into_iter().map(|s| (s.id.clone(), s)).collect())
    }

    /// Skills in the order of `ids`, dropping ids that no longer exist.
    pub fn ordered(ids: &[String], resolved: &HashMap<String, Skill>) -> Vec<Skill> {
        ids.iter().filter_map(|id| resolved.get(id).cloned()).collect()
    }
}
