//! PostgreSQL implementation of the click sink.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;
use crate::utils::db_error::is_foreign_key_violation;

pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn record_click(&self, event: ClickEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO link_clicks (link_id, variant_id, ip, user_agent, referrer, clicked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.link_id)
        .bind(event.variant_id)
        .bind(event.ip.as_deref())
        .bind(event.user_agent.as_deref())
        .bind(event.referrer.as_deref())
        .bind(event.clicked_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::bad_request(
                    "Link no longer exists",
                    json!({ "link_id": event.link_id }),
                )
            } else {
                AppError::from(e)
            }
        })?;

        Ok(())
    }
}
