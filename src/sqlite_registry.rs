//! SQLite-backed [`RegistryBackend`] over the `translations` table.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use scripture_harness_core::models::Translation;
use scripture_harness_core::registry::RegistryBackend;

pub struct SqliteRegistryBackend {
    pool: SqlitePool,
}

impl SqliteRegistryBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistryBackend for SqliteRegistryBackend {
    async fn load(&self) -> Result<Vec<Translation>> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at, chunk_count FROM translations ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let created: i64 = row.get("created_at");
                let chunk_count: i64 = row.get("chunk_count");
                Translation {
                    id: row.get("id"),
                    name: row.get("name"),
                    description: row.get("description"),
                    created_at: DateTime::<Utc>::from_timestamp(created, 0).unwrap_or_default(),
                    chunk_count: chunk_count.max(0) as u64,
                }
            })
            .collect())
    }

    async fn save(&self, translation: &Translation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO translations (id, name, description, created_at, chunk_count)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                chunk_count = excluded.chunk_count
            "#,
        )
        .bind(&translation.id)
        .bind(&translation.name)
        .bind(&translation.description)
        .bind(translation.created_at.timestamp())
        .bind(translation.chunk_count as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM translations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
