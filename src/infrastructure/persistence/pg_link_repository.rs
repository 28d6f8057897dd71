//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

use crate::domain::entities::{CloakType, CloakingConfig, Link};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "id, short_code, custom_alias, original_url, is_active, \
     expires_at, password_hash, cloak_type, cloak_title, cloak_favicon, created_at";

#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    id: i64,
    short_code: String,
    custom_alias: Option<String>,
    original_url: String,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    password_hash: Option<String>,
    cloak_type: Option<String>,
    cloak_title: Option<String>,
    cloak_favicon: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        let cloaking = row.cloak_type.and_then(|raw| match raw.parse::<CloakType>() {
            Ok(cloak_type) => Some(CloakingConfig {
                cloak_type,
                title: row.cloak_title,
                favicon: row.cloak_favicon,
            }),
            Err(_) => {
                warn!(link_id = row.id, cloak_type = %raw, "Ignoring unknown cloak type");
                None
            }
        });

        Link {
            id: row.id,
            short_code: row.short_code,
            custom_alias: row.custom_alias,
            original_url: row.original_url,
            is_active: row.is_active,
            expires_at: row.expires_at,
            password_hash: row.password_hash,
            cloaking,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL repository for link lookups.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn find_by_code_or_alias(&self, code: &str) -> Result<Option<Link>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM links \
             WHERE short_code = $1 OR custom_alias = $1 \
             ORDER BY (short_code = $1) DESC \
             LIMIT 1"
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Link::from))
    }
}
