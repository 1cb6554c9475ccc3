//! Relational source client using sqlx.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::PgPool;

/// Read-mostly client for the relational source of truth.
///
/// Table names are always taken from the static `TABLES` mapping, never from
/// user input, so interpolating them into SQL is safe.
#[derive(Clone, Debug)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(4).connect(database_url).await?;
        tracing::info!("PgSource connected");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Unfiltered row count, used by dry-run reporting.
    pub async fn count_rows(&self, table: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// One page of a full table scan, ordered by primary key for
    /// deterministic pagination.
    pub async fn fetch_page(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<PgRow>> {
        let rows = sqlx::query(&format!("SELECT * FROM {table} ORDER BY id ASC LIMIT $1 OFFSET $2"))
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// One page of rows changed since `since`. Rows that were never updated
    /// fall back to their creation time.
    pub async fn fetch_changed_page(
        &self,
        table: &str,
        since: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PgRow>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM {table} \
             WHERE COALESCE(updated_at, created_at) > $1 \
             ORDER BY id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(since)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Seed a `not_started` progress row for every (student, lesson) pair
    /// that has none yet. Students are the distinct holders of the
    /// `student` role. Returns the number of rows inserted.
    pub async fn backfill_lesson_progress(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"INSERT INTO lesson_progress (lesson_id, student_id, status, created_at, updated_at)
               SELECT l.id, u.user_id, 'not_started', NOW(), NOW()
               FROM module_lessons l
               CROSS JOIN (SELECT DISTINCT user_id FROM user_roles WHERE role = 'student') u
               WHERE NOT EXISTS (
                   SELECT 1 FROM lesson_progress p
                   WHERE p.lesson_id = l.id AND p.student_id = u.user_id
               )"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Attach lessons that predate the module system to their module via the
    /// legacy gamified-map node they were created under. Returns the number
    /// of lessons updated.
    pub async fn backfill_map_modules(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE module_lessons l
               SET module_id = n.module_id, updated_at = NOW()
               FROM map_nodes n
               WHERE l.map_node_id = n.id
                 AND l.module_id IS NULL
                 AND n.module_id IS NOT NULL"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
