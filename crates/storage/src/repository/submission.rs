use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{EvaluationStatus, ExtractionStatus, ProsCons, RankingEntry, Submission};

const SUBMISSION_COLUMNS: &str = r#"
    submission_id, task_id, applicant_email, applicant_name, video_path, artifact_path,
    extraction_status, extraction_error, evaluation_status, rank, percentile, feedback,
    pros_cons, submitted_at
"#;

#[derive(FromRow)]
struct SubmissionRow {
    submission_id: Uuid,
    task_id: Uuid,
    applicant_email: String,
    applicant_name: String,
    video_path: String,
    artifact_path: Option<String>,
    extraction_status: String,
    extraction_error: Option<String>,
    evaluation_status: String,
    rank: Option<i32>,
    percentile: Option<i32>,
    feedback: Option<String>,
    pros_cons: Option<Json<Value>>,
    submitted_at: chrono::NaiveDateTime,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StorageError;

    fn try_from(row: SubmissionRow) -> Result<Self> {
        Ok(Self {
            submission_id: row.submission_id,
            task_id: row.task_id,
            applicant_email: row.applicant_email,
            applicant_name: row.applicant_name,
            video_path: row.video_path,
            artifact_path: row.artifact_path,
            extraction_status: row.extraction_status.parse()?,
            extraction_error: row.extraction_error,
            evaluation_status: row.evaluation_status.parse()?,
            rank: row.rank,
            percentile: row.percentile,
            feedback: row.feedback,
            pros_cons: row
                .pros_cons
                .map(|Json(value)| ProsCons::from_value_lenient(&value)),
            submitted_at: row.submitted_at,
        })
    }
}

/// Repository for Submission database operations
pub struct SubmissionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubmissionRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a task's submissions in submission order
    pub async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM submissions WHERE task_id = $1 ORDER BY submitted_at, submission_id",
            SUBMISSION_COLUMNS
        ))
        .bind(task_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Submission::try_from).collect()
    }

    pub async fn find_by_id(&self, submission_id: Uuid) -> Result<Submission> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM submissions WHERE submission_id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(submission_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        row.try_into()
    }

    pub async fn set_extraction_status(
        &self,
        submission_id: Uuid,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET extraction_status = $2, extraction_error = $3
            WHERE submission_id = $1
            "#,
        )
        .bind(submission_id)
        .bind(status.as_str())
        .bind(error)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    pub async fn set_evaluation_status(
        &self,
        task_id: Uuid,
        submission_ids: &[Uuid],
        status: EvaluationStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET evaluation_status = $3
            WHERE task_id = $1 AND submission_id = ANY($2)
            "#,
        )
        .bind(task_id)
        .bind(submission_ids)
        .bind(status.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace the ranking projection of every submission of the task.
    ///
    /// Must run inside the transaction that completes the run so readers never see
    /// a half-written ranking.
    pub(crate) async fn overwrite_rankings(
        conn: &mut PgConnection,
        task_id: Uuid,
        rankings: &[RankingEntry],
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE submissions
            SET rank = NULL, percentile = NULL, feedback = NULL, pros_cons = NULL
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .execute(&mut *conn)
        .await?;

        for entry in rankings {
            let pros_cons = serde_json::to_value(&entry.pros_cons)
                .map_err(|e| StorageError::InvalidValue(e.to_string()))?;

            sqlx::query(
                r#"
                UPDATE submissions
                SET rank = $3, percentile = $4, feedback = $5, pros_cons = $6,
                    evaluation_status = 'completed'
                WHERE task_id = $1 AND submission_id = $2
                "#,
            )
            .bind(task_id)
            .bind(entry.submission_id)
            .bind(entry.rank)
            .bind(entry.percentile)
            .bind(&entry.feedback)
            .bind(Json(pros_cons))
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}
