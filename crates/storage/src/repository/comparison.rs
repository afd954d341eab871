use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{ComparisonResult, NewComparison, ProsCons, RecordedComparison};
use crate::repository::lock_task;

#[derive(FromRow)]
struct ComparisonRow {
    comparison_id: Uuid,
    run_id: Uuid,
    submission_low: Uuid,
    submission_high: Uuid,
    winner_id: Option<Uuid>,
    rationale: String,
    feedback_low: String,
    feedback_high: String,
    pros_cons_low: Json<Value>,
    pros_cons_high: Json<Value>,
    degraded: bool,
    attempts: i32,
    created_at: chrono::NaiveDateTime,
}

impl From<ComparisonRow> for ComparisonResult {
    fn from(row: ComparisonRow) -> Self {
        Self {
            comparison_id: row.comparison_id,
            run_id: row.run_id,
            submission_low: row.submission_low,
            submission_high: row.submission_high,
            winner_id: row.winner_id,
            rationale: row.rationale,
            feedback_low: row.feedback_low,
            feedback_high: row.feedback_high,
            pros_cons_low: ProsCons::from_value_lenient(&row.pros_cons_low.0),
            pros_cons_high: ProsCons::from_value_lenient(&row.pros_cons_high.0),
            degraded: row.degraded,
            attempts: row.attempts,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CountersRow {
    completed_pairs: i32,
    degraded_pairs: i32,
}

pub struct ComparisonRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ComparisonRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record the outcome of one pair exactly once.
    ///
    /// A second write for the same unordered pair is ignored and leaves the run
    /// counters unchanged.
    pub async fn record(&self, run_id: Uuid, comparison: &NewComparison) -> Result<RecordedComparison> {
        if comparison.submission_low >= comparison.submission_high {
            return Err(StorageError::ConstraintViolation(
                "Comparison pair must be stored in canonical order".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let task_id: Uuid =
            sqlx::query_scalar("SELECT task_id FROM evaluation_runs WHERE run_id = $1")
                .bind(run_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StorageError::NotFound)?;

        lock_task(&mut *tx, task_id).await?;

        let pros_cons_low = serde_json::to_value(&comparison.pros_cons_low)
            .map_err(|e| StorageError::InvalidValue(e.to_string()))?;
        let pros_cons_high = serde_json::to_value(&comparison.pros_cons_high)
            .map_err(|e| StorageError::InvalidValue(e.to_string()))?;

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO comparison_results (
                run_id, submission_low, submission_high, winner_id, rationale,
                feedback_low, feedback_high, pros_cons_low, pros_cons_high, degraded, attempts
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (run_id, submission_low, submission_high) DO NOTHING
            RETURNING comparison_id
            "#,
        )
        .bind(run_id)
        .bind(comparison.submission_low)
        .bind(comparison.submission_high)
        .bind(comparison.winner_id)
        .bind(&comparison.rationale)
        .bind(&comparison.feedback_low)
        .bind(&comparison.feedback_high)
        .bind(Json(pros_cons_low))
        .bind(Json(pros_cons_high))
        .bind(comparison.degraded)
        .bind(comparison.attempts)
        .fetch_optional(&mut *tx)
        .await?;

        let counters = if inserted.is_some() {
            sqlx::query_as::<_, CountersRow>(
                r#"
                UPDATE evaluation_runs
                SET completed_pairs = completed_pairs + 1,
                    degraded_pairs = degraded_pairs + CASE WHEN $2 THEN 1 ELSE 0 END
                WHERE run_id = $1
                RETURNING completed_pairs, degraded_pairs
                "#,
            )
            .bind(run_id)
            .bind(comparison.degraded)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, CountersRow>(
                "SELECT completed_pairs, degraded_pairs FROM evaluation_runs WHERE run_id = $1",
            )
            .bind(run_id)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;

        Ok(RecordedComparison {
            inserted: inserted.is_some(),
            completed_pairs: counters.completed_pairs,
            degraded_pairs: counters.degraded_pairs,
        })
    }

    pub async fn list_for_run(&self, run_id: Uuid) -> Result<Vec<ComparisonResult>> {
        let rows = sqlx::query_as::<_, ComparisonRow>(
            r#"
            SELECT comparison_id, run_id, submission_low, submission_high, winner_id, rationale,
                   feedback_low, feedback_high, pros_cons_low, pros_cons_high, degraded,
                   attempts, created_at
            FROM comparison_results
            WHERE run_id = $1
            ORDER BY submission_low, submission_high
            "#,
        )
        .bind(run_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ComparisonResult::from).collect())
    }
}
