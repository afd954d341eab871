use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Frame, NewFrame};

pub struct FrameRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FrameRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Evidence set of a submission, in temporal order
    pub async fn list_for_submission(&self, submission_id: Uuid) -> Result<Vec<Frame>> {
        let frames = sqlx::query_as::<_, Frame>(
            r#"
            SELECT frame_id, submission_id, position, path, timestamp_ms, created_at
            FROM frames
            WHERE submission_id = $1
            ORDER BY position
            "#,
        )
        .bind(submission_id)
        .fetch_all(self.pool)
        .await?;

        Ok(frames)
    }

    /// Swap the evidence set of a submission in one transaction and hand back the rows
    /// that were replaced, so the caller can remove their files afterwards.
    pub async fn replace(&self, submission_id: Uuid, frames: &[NewFrame]) -> Result<Vec<Frame>> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, Frame>(
            r#"
            DELETE FROM frames
            WHERE submission_id = $1
            RETURNING frame_id, submission_id, position, path, timestamp_ms, created_at
            "#,
        )
        .bind(submission_id)
        .fetch_all(&mut *tx)
        .await?;

        for frame in frames {
            sqlx::query(
                r#"
                INSERT INTO frames (submission_id, position, path, timestamp_ms)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(submission_id)
            .bind(frame.position)
            .bind(&frame.path)
            .bind(frame.timestamp_ms)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(previous)
    }
}
