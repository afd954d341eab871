use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::Task;

#[derive(FromRow)]
struct TaskRow {
    task_id: Uuid,
    title: String,
    description: String,
    criteria: Json<Vec<String>>,
    created_at: chrono::NaiveDateTime,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            task_id: row.task_id,
            title: row.title,
            description: row.description,
            criteria: row.criteria.0,
            created_at: row.created_at,
        }
    }
}

pub struct TaskRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TaskRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, task_id: Uuid) -> Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT task_id, title, description, criteria, created_at
            FROM tasks
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(row.into())
    }
}
