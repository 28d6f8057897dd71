//! PostgreSQL implementation of A/B test repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use crate::domain::entities::{
    AbTest, AbVariant, ConversionOutcome, NewAbTest, NewAbVariant, VariantDeletion, VariantPatch,
};
use crate::domain::repositories::ExperimentRepository;
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on;

const ACTIVE_TEST_INDEX: &str = "ab_tests_one_active_per_link";

const TEST_COLUMNS: &str = "id, link_id, name, is_active, created_at, started_at";

const VARIANT_COLUMNS: &str = "id, test_id, name, url, weight, clicks, conversions, created_at";

#[derive(Debug, sqlx::FromRow)]
struct TestRow {
    id: i64,
    link_id: i64,
    name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    started_at: DateTime<Utc>,
}

impl TestRow {
    fn with_variants(self, variants: Vec<AbVariant>) -> AbTest {
        AbTest {
            id: self.id,
            link_id: self.link_id,
            name: self.name,
            is_active: self.is_active,
            created_at: self.created_at,
            started_at: self.started_at,
            variants,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i64,
    test_id: i64,
    name: String,
    url: String,
    weight: i32,
    clicks: i64,
    conversions: i64,
    created_at: DateTime<Utc>,
}

impl From<VariantRow> for AbVariant {
    fn from(row: VariantRow) -> Self {
        AbVariant {
            id: row.id,
            test_id: row.test_id,
            name: row.name,
            url: row.url,
            weight: row.weight,
            clicks: row.clicks,
            conversions: row.conversions,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL repository for A/B tests.
///
/// Click and conversion counters are bumped with single `UPDATE ... SET x = x + 1`
/// statements so concurrent requests never lose increments.
pub struct PgExperimentRepository {
    pool: Arc<PgPool>,
}

impl PgExperimentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn variants_of(&self, test_id: i64) -> Result<Vec<AbVariant>, AppError> {
        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM ab_variants WHERE test_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(test_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows.into_iter().map(AbVariant::from).collect())
    }

    async fn insert_variant(
        tx: &mut Transaction<'_, Postgres>,
        test_id: i64,
        variant: &NewAbVariant,
    ) -> Result<AbVariant, sqlx::Error> {
        let sql = format!(
            "INSERT INTO ab_variants (test_id, name, url, weight) VALUES ($1, $2, $3, $4) \
             RETURNING {VARIANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(test_id)
            .bind(&variant.name)
            .bind(&variant.url)
            .bind(variant.weight)
            .fetch_one(&mut **tx)
            .await?;

        Ok(row.into())
    }
}

#[async_trait]
impl ExperimentRepository for PgExperimentRepository {
    async fn find_active_for_link(&self, link_id: i64) -> Result<Option<AbTest>, AppError> {
        let sql = format!("SELECT {TEST_COLUMNS} FROM ab_tests WHERE link_id = $1 AND is_active");
        let row = sqlx::query_as::<_, TestRow>(&sql)
            .bind(link_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        match row {
            Some(row) => {
                let variants = self.variants_of(row.id).await?;
                Ok(Some(row.with_variants(variants)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, test_id: i64) -> Result<Option<AbTest>, AppError> {
        let sql = format!("SELECT {TEST_COLUMNS} FROM ab_tests WHERE id = $1");
        let row = sqlx::query_as::<_, TestRow>(&sql)
            .bind(test_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        match row {
            Some(row) => {
                let variants = self.variants_of(row.id).await?;
                Ok(Some(row.with_variants(variants)))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, new_test: NewAbTest) -> Result<AbTest, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO ab_tests (link_id, name) VALUES ($1, $2) RETURNING {TEST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TestRow>(&sql)
            .bind(new_test.link_id)
            .bind(&new_test.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation_on(&e, ACTIVE_TEST_INDEX) {
                    AppError::conflict(
                        "Link already has an active A/B test",
                        json!({ "link_id": new_test.link_id }),
                    )
                } else {
                    AppError::from(e)
                }
            })?;

        let mut variants = Vec::with_capacity(new_test.variants.len());
        for variant in &new_test.variants {
            variants.push(Self::insert_variant(&mut tx, row.id, variant).await?);
        }

        tx.commit().await?;

        Ok(row.with_variants(variants))
    }

    async fn deactivate(&self, test_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE ab_tests SET is_active = FALSE WHERE id = $1")
            .bind(test_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_variant(
        &self,
        test_id: i64,
        variant: NewAbVariant,
    ) -> Result<AbVariant, AppError> {
        let mut tx = self.pool.begin().await?;
        let created = Self::insert_variant(&mut tx, test_id, &variant).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_variant(&self, variant_id: i64) -> Result<Option<AbVariant>, AppError> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM ab_variants WHERE id = $1");
        let row = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(variant_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(AbVariant::from))
    }

    async fn update_variant(
        &self,
        variant_id: i64,
        patch: VariantPatch,
    ) -> Result<Option<AbVariant>, AppError> {
        let sql = format!(
            "UPDATE ab_variants SET \
                 name = COALESCE($2, name), \
                 url = COALESCE($3, url), \
                 weight = COALESCE($4, weight) \
             WHERE id = $1 \
             RETURNING {VARIANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(variant_id)
            .bind(patch.name)
            .bind(patch.url)
            .bind(patch.weight)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(AbVariant::from))
    }

    async fn delete_variant(
        &self,
        variant_id: i64,
        min_remaining: i64,
    ) -> Result<VariantDeletion, AppError> {
        let mut tx = self.pool.begin().await?;

        // Locking the parent test serializes concurrent deletes on the same test.
        let test_id: Option<i64> = sqlx::query_scalar(
            "SELECT t.id FROM ab_tests t \
             JOIN ab_variants v ON v.test_id = t.id \
             WHERE v.id = $1 \
             FOR UPDATE OF t",
        )
        .bind(variant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(test_id) = test_id else {
            return Ok(VariantDeletion::NotFound);
        };

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ab_variants WHERE test_id = $1")
            .bind(test_id)
            .fetch_one(&mut *tx)
            .await?;

        if count - 1 < min_remaining {
            return Ok(VariantDeletion::BelowMinimum);
        }

        sqlx::query("DELETE FROM ab_variants WHERE id = $1")
            .bind(variant_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(VariantDeletion::Deleted)
    }

    async fn increment_clicks(&self, variant_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE ab_variants SET clicks = clicks + 1 WHERE id = $1")
            .bind(variant_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_conversions(
        &self,
        variant_id: i64,
    ) -> Result<ConversionOutcome, AppError> {
        // A conversion needs a live test and a click it can be attributed to.
        let (counted, exists): (bool, bool) = sqlx::query_as(
            "WITH upd AS ( \
                 UPDATE ab_variants v SET conversions = v.conversions + 1 \
                 FROM ab_tests t \
                 WHERE v.id = $1 AND v.test_id = t.id \
                   AND t.is_active AND v.conversions < v.clicks \
                 RETURNING v.id \
             ) \
             SELECT EXISTS(SELECT 1 FROM upd), \
                    EXISTS(SELECT 1 FROM ab_variants WHERE id = $1)",
        )
        .bind(variant_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(match (counted, exists) {
            (true, _) => ConversionOutcome::Counted,
            (false, true) => ConversionOutcome::NotEligible,
            (false, false) => ConversionOutcome::UnknownVariant,
        })
    }

    async fn reset_counters(
        &self,
        test_id: i64,
        started_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let found: i64 = sqlx::query_scalar(
            "WITH t AS (UPDATE ab_tests SET started_at = $2 WHERE id = $1 RETURNING id), \
                  reset AS ( \
                      UPDATE ab_variants SET clicks = 0, conversions = 0 \
                      WHERE test_id IN (SELECT id FROM t) \
                  ) \
             SELECT COUNT(*) FROM t",
        )
        .bind(test_id)
        .bind(started_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(found > 0)
    }
}
