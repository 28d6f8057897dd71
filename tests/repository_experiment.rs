mod common;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use smartlink::domain::entities::{
    ConversionOutcome, NewAbTest, NewAbVariant, VariantDeletion, VariantPatch,
};
use smartlink::domain::repositories::ExperimentRepository;
use smartlink::error::AppError;
use smartlink::infrastructure::persistence::PgExperimentRepository;

fn new_test(link_id: i64) -> NewAbTest {
    NewAbTest {
        link_id,
        name: "hero".to_string(),
        variants: vec![
            NewAbVariant {
                name: "control".to_string(),
                url: "https://example.com/a".to_string(),
                weight: 50,
            },
            NewAbVariant {
                name: "bold".to_string(),
                url: "https://example.com/b".to_string(),
                weight: 50,
            },
        ],
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_find_active(pool: PgPool) {
    let link_id = common::insert_pg_link(&pool, "launch", None).await;
    let repo = PgExperimentRepository::new(Arc::new(pool));

    let created = repo.create(new_test(link_id)).await.unwrap();
    let found = repo.find_active_for_link(link_id).await.unwrap().unwrap();

    assert_eq!(found.id, created.id);
    assert_eq!(found.variants.len(), 2);
    assert_eq!(found.variants[0].name, "control");
    assert_eq!(found.variants[0].clicks, 0);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_one_active_test_per_link(pool: PgPool) {
    let link_id = common::insert_pg_link(&pool, "launch", None).await;
    let repo = PgExperimentRepository::new(Arc::new(pool));
    let first = repo.create(new_test(link_id)).await.unwrap();

    let result = repo.create(new_test(link_id)).await;
    assert!(matches!(result, Err(AppError::Conflict { .. })));

    assert!(repo.deactivate(first.id).await.unwrap());
    assert!(repo.find_active_for_link(link_id).await.unwrap().is_none());
    assert!(repo.create(new_test(link_id)).await.is_ok());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_counters_and_reset(pool: PgPool) {
    let link_id = common::insert_pg_link(&pool, "launch", None).await;
    let repo = PgExperimentRepository::new(Arc::new(pool));
    let test = repo.create(new_test(link_id)).await.unwrap();
    let variant_id = test.variants[0].id;

    for _ in 0..3 {
        assert!(repo.increment_clicks(variant_id).await.unwrap());
    }
    assert_eq!(
        repo.increment_conversions(variant_id).await.unwrap(),
        ConversionOutcome::Counted
    );
    assert!(!repo.increment_clicks(-1).await.unwrap());

    let variant = repo.find_variant(variant_id).await.unwrap().unwrap();
    assert_eq!(variant.clicks, 3);
    assert_eq!(variant.conversions, 1);

    let restarted = test.created_at + Duration::days(3);
    assert!(repo.reset_counters(test.id, restarted).await.unwrap());
    let variant = repo.find_variant(variant_id).await.unwrap().unwrap();
    assert_eq!(variant.clicks, 0);
    assert_eq!(variant.conversions, 0);
    let reloaded = repo.find_by_id(test.id).await.unwrap().unwrap();
    assert_eq!(reloaded.started_at, restarted);
    assert_eq!(reloaded.created_at, test.created_at);

    assert!(!repo.reset_counters(-1, Utc::now()).await.unwrap());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_conversions_are_guarded(pool: PgPool) {
    let link_id = common::insert_pg_link(&pool, "launch", None).await;
    let repo = PgExperimentRepository::new(Arc::new(pool));
    let test = repo.create(new_test(link_id)).await.unwrap();
    let variant_id = test.variants[0].id;

    assert_eq!(
        repo.increment_conversions(variant_id).await.unwrap(),
        ConversionOutcome::NotEligible
    );

    repo.increment_clicks(variant_id).await.unwrap();
    assert_eq!(
        repo.increment_conversions(variant_id).await.unwrap(),
        ConversionOutcome::Counted
    );
    assert_eq!(
        repo.increment_conversions(variant_id).await.unwrap(),
        ConversionOutcome::NotEligible
    );

    repo.increment_clicks(variant_id).await.unwrap();
    repo.deactivate(test.id).await.unwrap();
    assert_eq!(
        repo.increment_conversions(variant_id).await.unwrap(),
        ConversionOutcome::NotEligible
    );
    assert_eq!(
        repo.increment_conversions(-1).await.unwrap(),
        ConversionOutcome::UnknownVariant
    );

    let variant = repo.find_variant(variant_id).await.unwrap().unwrap();
    assert_eq!((variant.clicks, variant.conversions), (2, 1));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_variant_keeps_omitted_fields(pool: PgPool) {
    let link_id = common::insert_pg_link(&pool, "launch", None).await;
    let repo = PgExperimentRepository::new(Arc::new(pool));
    let test = repo.create(new_test(link_id)).await.unwrap();

    let updated = repo
        .update_variant(
            test.variants[1].id,
            VariantPatch {
                name: None,
                url: None,
                weight: Some(20),
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.weight, 20);
    assert_eq!(updated.name, "bold");
    assert_eq!(updated.url, "https://example.com/b");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_variant_respects_minimum(pool: PgPool) {
    let link_id = common::insert_pg_link(&pool, "launch", None).await;
    let repo = PgExperimentRepository::new(Arc::new(pool));
    let test = repo.create(new_test(link_id)).await.unwrap();
    let extra = repo
        .add_variant(
            test.id,
            NewAbVariant {
                name: "minimal".to_string(),
                url: "https://example.com/c".to_string(),
                weight: 10,
            },
        )
        .await
        .unwrap();

    assert_eq!(repo.delete_variant(extra.id, 2).await.unwrap(), VariantDeletion::Deleted);
    assert_eq!(
        repo.delete_variant(test.variants[0].id, 2).await.unwrap(),
        VariantDeletion::BelowMinimum
    );
    assert_eq!(repo.delete_variant(extra.id, 2).await.unwrap(), VariantDeletion::NotFound);
}
