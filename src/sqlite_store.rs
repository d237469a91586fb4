//! SQLite-backed [`PassageStore`] and [`StoreProvider`].
//!
//! All translations share the `passages` table; a partition is the set of
//! rows with one `translation_id`. Embeddings are stored as little-endian
//! `f32` BLOBs and ranked by brute-force cosine distance in process.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use scripture_harness_core::embedding::{blob_to_vec, cosine_distance, embed_one, vec_to_blob, Embedder};
use scripture_harness_core::filter::{FilterValue, MetadataField, MetadataFilter};
use scripture_harness_core::models::{Passage, PassageChunk, PassageMetadata, ScoredPassage};
use scripture_harness_core::store::{PassageStore, StoreProvider};

const SELECT_COLUMNS: &str =
    "source, translation_id, book, chapter, verse_start, verse_end, content, embedding";

/// One translation's rows in the `passages` table.
pub struct SqlitePassageStore {
    pool: SqlitePool,
    translation_id: String,
    embedder: Arc<dyn Embedder>,
}

impl SqlitePassageStore {
    pub fn new(pool: SqlitePool, translation_id: &str, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            pool,
            translation_id: translation_id.to_string(),
            embedder,
        }
    }

    /// Rank `rows` by cosine distance to `text`, ascending, and keep `k`.
    async fn rank(&self, text: &str, rows: Vec<SqliteRow>, k: usize) -> Result<Vec<ScoredPassage>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = embed_one(self.embedder.as_ref(), text).await?;
        let mut scored: Vec<ScoredPassage> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                ScoredPassage {
                    score: cosine_distance(&query_vec, &blob_to_vec(&blob)),
                    passage: row_to_passage(row),
                }
            })
            .collect();
        scored.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

fn opt_u32(row: &SqliteRow, column: &str) -> Option<u32> {
    row.get::<Option<i64>, _>(column)
        .and_then(|v| u32::try_from(v).ok())
}

fn row_to_passage(row: &SqliteRow) -> Passage {
    Passage {
        content: row.get("content"),
        metadata: PassageMetadata {
            source: row.get("source"),
            translation_id: row.get("translation_id"),
            book: row.get("book"),
            chapter: opt_u32(row, "chapter"),
            verse_start: opt_u32(row, "verse_start"),
            verse_end: opt_u32(row, "verse_end"),
        },
    }
}

/// SQL expression for a filter field. A missing `verse_end` means the
/// passage ends where it starts.
fn column_expr(field: MetadataField) -> &'static str {
    match field {
        MetadataField::VerseEnd => "COALESCE(verse_end, verse_start)",
        other => other.as_str(),
    }
}

/// `AND`-joined predicates for `filter`, with `?` placeholders.
fn where_clause(filter: &MetadataFilter) -> String {
    filter
        .clauses
        .iter()
        .map(|c| format!(" AND {} {} ?", column_expr(c.field), c.op.as_sql()))
        .collect()
}

#[async_trait]
impl PassageStore for SqlitePassageStore {
    async fn similarity_search(&self, text: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let sql = format!(
            "SELECT {} FROM passages WHERE translation_id = ?",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&self.translation_id)
            .fetch_all(&self.pool)
            .await?;
        self.rank(text, rows, k).await
    }

    async fn similarity_search_filtered(
        &self,
        text: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Passage>> {
        let sql = format!(
            "SELECT {} FROM passages WHERE translation_id = ?{}",
            SELECT_COLUMNS,
            where_clause(filter)
        );
        let mut query = sqlx::query(&sql).bind(&self.translation_id);
        for clause in &filter.clauses {
            query = match &clause.value {
                FilterValue::Text(s) => query.bind(s.clone()),
                FilterValue::Int(n) => query.bind(i64::from(*n)),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;
        let ranked = self.rank(text, rows, k).await?;
        Ok(ranked.into_iter().map(|sp| sp.passage).collect())
    }

    async fn add(&self, chunks: &[PassageChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            bail!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            );
        }

        let mut tx = self.pool.begin().await?;
        for (chunk, vector) in chunks.iter().zip(&vectors) {
            let meta = &chunk.metadata;
            sqlx::query(
                r#"
                INSERT INTO passages (id, translation_id, source, book, chapter,
                                      verse_start, verse_end, content, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&self.translation_id)
            .bind(&meta.source)
            .bind(&meta.book)
            .bind(meta.chapter.map(i64::from))
            .bind(meta.verse_start.map(i64::from))
            .bind(meta.verse_end.map(i64::from))
            .bind(&chunk.content)
            .bind(&chunk.hash)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(chunks.len())
    }

    async fn remove_source(&self, source: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM passages WHERE translation_id = ? AND source = ?")
            .bind(&self.translation_id)
            .bind(source)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages WHERE translation_id = ?")
            .bind(&self.translation_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}

/// Hands out [`SqlitePassageStore`]s over a shared pool.
pub struct SqliteStoreProvider {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteStoreProvider {
    pub fn new(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Self {
        Self { pool, embedder }
    }
}

#[async_trait]
impl StoreProvider for SqliteStoreProvider {
    /// Partitions are implicit; creating one clears any rows left behind
    /// under the same id.
    async fn create(&self, translation_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM passages WHERE translation_id = ?")
            .bind(translation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn open(&self, translation_id: &str) -> Result<Arc<dyn PassageStore>> {
        Ok(Arc::new(SqlitePassageStore::new(
            self.pool.clone(),
            translation_id,
            self.embedder.clone(),
        )))
    }

    async fn destroy(&self, translation_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM passages WHERE translation_id = ?")
            .bind(translation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
