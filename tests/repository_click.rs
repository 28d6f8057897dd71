mod common;

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use smartlink::domain::click_event::ClickEvent;
use smartlink::domain::repositories::ClickRepository;
use smartlink::error::AppError;
use smartlink::infrastructure::persistence::PgClickRepository;

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_record_click(pool: PgPool) {
    let link_id = common::insert_pg_link(&pool, "promo", None).await;
    let repo = PgClickRepository::new(Arc::new(pool.clone()));

    let mut event = ClickEvent::new(link_id, Utc::now());
    event.ip = Some("203.0.113.7".to_string());
    event.user_agent = Some("curl/8.0".to_string());
    repo.record_click(event).await.unwrap();

    let (count, ip): (i64, Option<String>) =
        sqlx::query_as("SELECT COUNT(*), MAX(ip) FROM link_clicks WHERE link_id = $1")
            .bind(link_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
    assert_eq!(ip.as_deref(), Some("203.0.113.7"));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_click_for_deleted_link(pool: PgPool) {
    let repo = PgClickRepository::new(Arc::new(pool));

    let result = repo.record_click(ClickEvent::new(9999, Utc::now())).await;

    assert!(matches!(result, Err(AppError::Validation { .. })));
}
