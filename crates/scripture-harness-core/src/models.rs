//! Core data models shared by the store, retrieval, and comparison layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to every stored passage.
///
/// `book`, `chapter`, and the verse bounds are only present for chunks cut
/// from Bible text. Generic uploaded documents carry `source` and
/// `translation_id` alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub source: String,
    pub translation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse_end: Option<u32>,
}

impl PassageMetadata {
    /// Inclusive verse bounds, if this passage carries verse numbers.
    ///
    /// A passage with a start verse but no end covers that single verse.
    pub fn verse_bounds(&self) -> Option<(u32, u32)> {
        let start = self.verse_start?;
        Some((start, self.verse_end.unwrap_or(start).max(start)))
    }

    /// `Book C:V` or `Book C:V-W` display label, when fully tagged.
    pub fn label(&self) -> Option<String> {
        let book = self.book.as_deref()?;
        let chapter = self.chapter?;
        Some(match self.verse_bounds() {
            Some((s, e)) if s == e => format!("{} {}:{}", book, chapter, s),
            Some((s, e)) => format!("{} {}:{}-{}", book, chapter, s, e),
            None => format!("{} {}", book, chapter),
        })
    }
}

/// An immutable unit of indexed text, as handed to [`PassageStore::add`].
///
/// The embedding is computed and owned by the store.
///
/// [`PassageStore::add`]: crate::store::PassageStore::add
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageChunk {
    pub id: String,
    pub content: String,
    /// SHA-256 of `content`.
    pub hash: String,
    pub metadata: PassageMetadata,
}

/// A passage as returned by a store lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub content: String,
    pub metadata: PassageMetadata,
}

/// A passage returned by similarity search with its store-native score.
///
/// Lower is more similar. The scale is store-defined; only the ordering
/// within one result list is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f64,
}

/// How a retrieved passage was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Metadata-filtered lookup of the requested verse range.
    Exact,
    /// Similarity search over the raw query text.
    Semantic,
}

/// One entry of a retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub content: String,
    /// `1.0` for exact matches, otherwise the store's similarity score.
    pub score: f64,
    pub metadata: PassageMetadata,
    pub kind: MatchKind,
}

/// A registered translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub chunk_count: u64,
}

impl Translation {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            chunk_count: 0,
        }
    }
}
