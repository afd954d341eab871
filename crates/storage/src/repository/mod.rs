pub mod comparison;
pub mod evaluation_run;
pub mod frame;
pub mod submission;
pub mod task;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::Result;

/// Serialises writes scoped to one task until the surrounding transaction ends.
pub(crate) async fn lock_task(conn: &mut PgConnection, task_id: Uuid) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(task_id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}
