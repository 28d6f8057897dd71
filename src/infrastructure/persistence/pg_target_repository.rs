//! PostgreSQL implementation of targeting rule repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

use crate::domain::entities::{LinkTarget, NewLinkTarget, TargetType};
use crate::domain::repositories::TargetRepository;
use crate::error::AppError;

const TARGET_COLUMNS: &str =
    "id, link_id, target_type, value, target_url, priority, is_active, created_at";

/// Evaluation order shared by every listing.
const TARGET_ORDER: &str = "ORDER BY priority DESC, created_at ASC, id ASC";

#[derive(Debug, sqlx::FromRow)]
struct TargetRow {
    id: i64,
    link_id: i64,
    target_type: String,
    value: String,
    target_url: String,
    priority: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TargetRow {
    fn into_target(self) -> Option<LinkTarget> {
        let target_type = match self.target_type.parse::<TargetType>() {
            Ok(t) => t,
            Err(_) => {
                warn!(
                    target_id = self.id,
                    target_type = %self.target_type,
                    "Skipping targeting rule with unknown type"
                );
                return None;
            }
        };

        Some(LinkTarget {
            id: self.id,
            link_id: self.link_id,
            target_type,
            value: self.value,
            target_url: self.target_url,
            priority: self.priority,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

pub struct PgTargetRepository {
    pool: Arc<PgPool>,
}

impl PgTargetRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str, link_id: i64) -> Result<Vec<LinkTarget>, AppError> {
        let rows = sqlx::query_as::<_, TargetRow>(sql)
            .bind(link_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().filter_map(TargetRow::into_target).collect())
    }
}

#[async_trait]
impl TargetRepository for PgTargetRepository {
    async fn list_active(&self, link_id: i64) -> Result<Vec<LinkTarget>, AppError> {
        let sql = format!(
            "SELECT {TARGET_COLUMNS} FROM link_targets \
             WHERE link_id = $1 AND is_active {TARGET_ORDER}"
        );
        self.fetch(&sql, link_id).await
    }

    async fn list(&self, link_id: i64) -> Result<Vec<LinkTarget>, AppError> {
        let sql = format!(
            "SELECT {TARGET_COLUMNS} FROM link_targets WHERE link_id = $1 {TARGET_ORDER}"
        );
        self.fetch(&sql, link_id).await
    }

    async fn create(&self, new_target: NewLinkTarget) -> Result<LinkTarget, AppError> {
        let sql = format!(
            "INSERT INTO link_targets (link_id, target_type, value, target_url, priority) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {TARGET_COLUMNS}"
        );

        let row = sqlx::query_as::<_, TargetRow>(&sql)
            .bind(new_target.link_id)
            .bind(new_target.target_type.as_str())
            .bind(&new_target.value)
            .bind(&new_target.target_url)
            .bind(new_target.priority)
            .fetch_one(self.pool.as_ref())
            .await?;

        row.into_target()
            .ok_or_else(|| AppError::internal("Stored rule has an unknown type", serde_json::json!({})))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM link_targets WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
