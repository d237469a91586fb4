//! Database statistics.
//!
//! Used by `scripture stats` to show what each translation holds: the
//! registered chunk count next to the rows actually stored.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct TranslationStats {
    pub id: String,
    pub name: String,
    /// Count recorded in the registry after the last ingestion.
    pub registered_chunks: i64,
    pub stored_chunks: i64,
    pub sources: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub db_path: String,
    pub db_size_bytes: u64,
    pub total_chunks: i64,
    pub translations: Vec<TranslationStats>,
}

pub async fn collect_stats(pool: &SqlitePool, db_path: &Path) -> Result<Stats> {
    let rows = sqlx::query(
        r#"
        SELECT
            t.id,
            t.name,
            t.chunk_count,
            COUNT(p.id) AS stored,
            COUNT(DISTINCT p.source) AS sources
        FROM translations t
        LEFT JOIN passages p ON p.translation_id = t.id
        GROUP BY t.id, t.name, t.chunk_count
        ORDER BY t.name, t.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let translations: Vec<TranslationStats> = rows
        .iter()
        .map(|row| TranslationStats {
            id: row.get("id"),
            name: row.get("name"),
            registered_chunks: row.get("chunk_count"),
            stored_chunks: row.get("stored"),
            sources: row.get("sources"),
        })
        .collect();

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages")
        .fetch_one(pool)
        .await?;

    let db_size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    Ok(Stats {
        db_path: db_path.display().to_string(),
        db_size_bytes,
        total_chunks,
        translations,
    })
}

pub fn print_stats(stats: &Stats) {
    println!("Scripture Harness: Database Stats");
    println!("=================================");
    println!();
    println!("  Database:    {}", stats.db_path);
    println!("  Size:        {}", format_bytes(stats.db_size_bytes));
    println!();
    println!("  Translations: {}", stats.translations.len());
    println!("  Chunks:       {}", stats.total_chunks);

    if !stats.translations.is_empty() {
        println!();
        println!("  By translation:");
        println!(
            "  {:<12} {:<28} {:>8} {:>8}",
            "ID", "NAME", "SOURCES", "CHUNKS"
        );
        println!("  {}", "-".repeat(59));
        for t in &stats.translations {
            let chunks = if t.registered_chunks == t.stored_chunks {
                t.stored_chunks.to_string()
            } else {
                format!("{}*", t.stored_chunks)
            };
            println!(
                "  {:<12} {:<28} {:>8} {:>8}",
                t.id, t.name, t.sources, chunks
            );
        }
        if stats
            .translations
            .iter()
            .any(|t| t.registered_chunks != t.stored_chunks)
        {
            println!();
            println!("  * registry count differs from stored rows; re-run ingest to refresh");
        }
    }

    println!();
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
