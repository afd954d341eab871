use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{EvaluationRun, RankingEntry, RunStatus};
use crate::repository::lock_task;
use crate::repository::submission::SubmissionRepository;

const RUN_COLUMNS: &str = r#"
    run_id, task_id, status, failure_reason, message, total_pairs, completed_pairs,
    degraded_pairs, started_at, finished_at
"#;

#[derive(FromRow)]
struct RunRow {
    run_id: Uuid,
    task_id: Uuid,
    status: String,
    failure_reason: Option<String>,
    message: String,
    total_pairs: i32,
    completed_pairs: i32,
    degraded_pairs: i32,
    started_at: chrono::NaiveDateTime,
    finished_at: Option<chrono::NaiveDateTime>,
}

impl TryFrom<RunRow> for EvaluationRun {
    type Error = StorageError;

    fn try_from(row: RunRow) -> Result<Self> {
        Ok(Self {
            run_id: row.run_id,
            task_id: row.task_id,
            status: row.status.parse()?,
            failure_reason: row.failure_reason,
            message: row.message,
            total_pairs: row.total_pairs,
            completed_pairs: row.completed_pairs,
            degraded_pairs: row.degraded_pairs,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

/// Repository for EvaluationRun database operations
pub struct EvaluationRunRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EvaluationRunRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a new running run for the task.
    ///
    /// Fails with `ConstraintViolation` if the task already has a running run.
    pub async fn create(&self, task_id: Uuid, total_pairs: i32, message: &str) -> Result<EvaluationRun> {
        let mut tx = self.pool.begin().await?;
        lock_task(&mut *tx, task_id).await?;

        let active: Option<Uuid> = sqlx::query_scalar(
            "SELECT run_id FROM evaluation_runs WHERE task_id = $1 AND status = 'running'",
        )
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;

        if active.is_some() {
            return Err(StorageError::ConstraintViolation(
                "Evaluation already in progress".to_string(),
            ));
        }

        let row = sqlx::query_as::<_, RunRow>(&format!(
            r#"
            INSERT INTO evaluation_runs (task_id, status, message, total_pairs)
            VALUES ($1, 'running', $2, $3)
            RETURNING {}
            "#,
            RUN_COLUMNS
        ))
        .bind(task_id)
        .bind(message)
        .bind(total_pairs)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.code().as_deref() == Some("23505") {
                    return StorageError::ConstraintViolation(
                        "Evaluation already in progress".to_string(),
                    );
                }
            }
            StorageError::from(e)
        })?;

        tx.commit().await?;

        row.try_into()
    }

    pub async fn find_by_id(&self, run_id: Uuid) -> Result<EvaluationRun> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {} FROM evaluation_runs WHERE run_id = $1",
            RUN_COLUMNS
        ))
        .bind(run_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    /// Most recently started run for the task, whatever its status
    pub async fn latest_for_task(&self, task_id: Uuid) -> Result<Option<EvaluationRun>> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {} FROM evaluation_runs WHERE task_id = $1 ORDER BY started_at DESC LIMIT 1",
            RUN_COLUMNS
        ))
        .bind(task_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(EvaluationRun::try_from).transpose()
    }

    pub async fn update_message(&self, run_id: Uuid, message: &str) -> Result<()> {
        sqlx::query("UPDATE evaluation_runs SET message = $2 WHERE run_id = $1")
            .bind(run_id)
            .bind(message)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Mark the run completed and overwrite the task's ranking projection atomically.
    pub async fn complete(
        &self,
        run_id: Uuid,
        rankings: &[RankingEntry],
        message: &str,
    ) -> Result<()> {
        let run = self.find_by_id(run_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_task(&mut *tx, run.task_id).await?;

        SubmissionRepository::overwrite_rankings(&mut *tx, run.task_id, rankings).await?;

        sqlx::query(
            r#"
            UPDATE evaluation_runs
            SET status = $2, message = $3, finished_at = NOW()
            WHERE run_id = $1
            "#,
        )
        .bind(run_id)
        .bind(RunStatus::Completed.as_str())
        .bind(message)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Terminate the run. Submissions still marked as evaluating are marked failed;
    /// the previous ranking projection is left untouched.
    pub async fn fail(&self, run_id: Uuid, reason: &str) -> Result<()> {
        let run = self.find_by_id(run_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_task(&mut *tx, run.task_id).await?;

        sqlx::query(
            r#"
            UPDATE evaluation_runs
            SET status = $2, failure_reason = $3, message = $4, finished_at = NOW()
            WHERE run_id = $1
            "#,
        )
        .bind(run_id)
        .bind(RunStatus::Failed.as_str())
        .bind(reason)
        .bind(format!("Evaluation failed: {}", reason))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE submissions
            SET evaluation_status = 'failed'
            WHERE task_id = $1 AND evaluation_status = 'evaluating'
            "#,
        )
        .bind(run.task_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Fail every run still marked running, together with its evaluating submissions.
    /// Meant for startup, when no run of this process can be in flight yet.
    pub async fn fail_running_runs(&self, reason: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let task_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE evaluation_runs
            SET status = $1, failure_reason = $2, message = $3, finished_at = NOW()
            WHERE status = 'running'
            RETURNING task_id
            "#,
        )
        .bind(RunStatus::Failed.as_str())
        .bind(reason)
        .bind(format!("Evaluation failed: {}", reason))
        .fetch_all(&mut *tx)
        .await?;

        if !task_ids.is_empty() {
            sqlx::query(
                r#"
                UPDATE submissions
                SET evaluation_status = 'failed'
                WHERE task_id = ANY($1) AND evaluation_status = 'evaluating'
                "#,
            )
            .bind(&task_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(task_ids.len() as u64)
    }
}
