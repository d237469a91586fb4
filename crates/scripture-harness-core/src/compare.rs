//! Side-by-side passage comparison across translations.
//!
//! Two strategies:
//!
//! - **Exact**: the query names a verse reference. That reference is looked
//!   up in every translation and a single row is produced.
//! - **Topical**: no reference. The anchor (first) translation is searched
//!   by similarity for up to `min(k, 3)` passages; each passage's verse
//!   coordinates are then fetched from every translation, one row each.
//!
//! Per-translation lookups run concurrently with `join_all`, which keeps
//! entries in request order. A failing translation becomes an
//! [`Cell::Error`] entry; it never removes the entry or the row.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Passage, PassageMetadata};
use crate::reference::VerseReference;
use crate::retrieve::{reference_of, Retriever};
use crate::store::PassageStore;

/// Most anchor passages a topical comparison expands into rows.
pub const MAX_TOPICAL_PASSAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStrategy {
    Exact,
    Topical,
}

/// One translation's slot in a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Cell {
    Found {
        content: String,
        /// Verse label of the matched passages, when tagged.
        #[serde(skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    NotFound,
    Error {
        message: String,
    },
}

impl Cell {
    pub fn is_found(&self) -> bool {
        matches!(self, Cell::Found { .. })
    }

    /// Join passages (already in verse order) into one cell.
    fn from_passages(passages: &[Passage]) -> Cell {
        if passages.is_empty() {
            return Cell::NotFound;
        }
        let content = passages
            .iter()
            .map(|p| p.content.trim())
            .collect::<Vec<_>>()
            .join(" ");
        Cell::Found {
            content,
            reference: span_label(passages),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub translation_id: String,
    #[serde(flatten)]
    pub cell: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Display reference of the row, e.g. `John 3:16`.
    pub reference: String,
    /// Exactly one entry per requested translation, in request order.
    pub entries: Vec<ComparisonEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub query: String,
    pub strategy: ComparisonStrategy,
    pub translations: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

/// Rows plus the generated summary, which may have failed independently.
#[derive(Debug)]
pub struct ComparisonOutcome {
    pub comparison: ComparisonResult,
    pub summary: Result<String>,
}

/// A translation taking part in a comparison.
///
/// `store` is `Err` when its partition could not be opened; the
/// translation then contributes error entries.
pub struct CompareTarget {
    pub translation_id: String,
    pub store: std::result::Result<Arc<dyn PassageStore>, String>,
}

/// Build the comparison rows for `query` across `targets`.
///
/// `targets[0]` is the anchor for topical comparisons. Callers validate the
/// translation list beforehand.
pub async fn build_comparison(
    retriever: &Retriever,
    targets: &[CompareTarget],
    query: &str,
    k: usize,
) -> Result<ComparisonResult> {
    let translations: Vec<String> = targets.iter().map(|t| t.translation_id.clone()).collect();

    if let Some(reference) = retriever.parser().parse(query) {
        debug!(reference = %reference, "exact comparison");
        let entries = lookup_everywhere(retriever, targets, &reference, k).await;
        return Ok(ComparisonResult {
            query: query.to_string(),
            strategy: ComparisonStrategy::Exact,
            translations,
            rows: vec![ComparisonRow {
                reference: reference.reference.clone(),
                entries,
            }],
        });
    }

    let anchor = targets
        .first()
        .ok_or(Error::TooFewTranslations(targets.len()))?;
    let anchor_store = anchor
        .store
        .as_ref()
        .map_err(|e| Error::Upstream(anyhow::anyhow!("{}: {}", anchor.translation_id, e)))?;

    let found = anchor_store
        .similarity_search(query, k.clamp(1, MAX_TOPICAL_PASSAGES))
        .await?;
    if found.is_empty() {
        return Err(Error::NoRelevantPassages(query.to_string()));
    }

    let catalog = retriever.parser().catalog();
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for scored in found {
        match reference_of(&scored.passage.metadata, catalog) {
            Some(reference) => {
                if !seen.insert(reference.reference.clone()) {
                    continue;
                }
                let entries = lookup_everywhere(retriever, targets, &reference, k).await;
                rows.push(ComparisonRow {
                    reference: reference.reference.clone(),
                    entries,
                });
            }
            None => rows.push(untagged_row(&scored.passage, &translations)),
        }
    }

    Ok(ComparisonResult {
        query: query.to_string(),
        strategy: ComparisonStrategy::Topical,
        translations,
        rows,
    })
}

/// Look `reference` up in every target concurrently, in target order.
async fn lookup_everywhere(
    retriever: &Retriever,
    targets: &[CompareTarget],
    reference: &VerseReference,
    k: usize,
) -> Vec<ComparisonEntry> {
    let lookups = targets.iter().map(|target| async move {
        let cell = match &target.store {
            Ok(store) => match retriever.exact_lookup(store.as_ref(), reference, k).await {
                Ok(passages) => Cell::from_passages(&passages),
                Err(e) => {
                    warn!(translation = %target.translation_id, error = %e, "lookup failed");
                    Cell::Error {
                        message: e.to_string(),
                    }
                }
            },
            Err(message) => {
                warn!(translation = %target.translation_id, error = %message, "store unavailable");
                Cell::Error {
                    message: message.clone(),
                }
            }
        };
        ComparisonEntry {
            translation_id: target.translation_id.clone(),
            cell,
        }
    });
    join_all(lookups).await
}

/// Row for an anchor passage without verse coordinates.
fn untagged_row(passage: &Passage, translations: &[String]) -> ComparisonRow {
    let entries = translations
        .iter()
        .enumerate()
        .map(|(i, id)| ComparisonEntry {
            translation_id: id.clone(),
            cell: if i == 0 {
                Cell::Found {
                    content: passage.content.clone(),
                    reference: None,
                }
            } else {
                Cell::NotFound
            },
        })
        .collect();
    ComparisonRow {
        reference: passage.metadata.source.clone(),
        entries,
    }
}

fn span_label(passages: &[Passage]) -> Option<String> {
    let first: &PassageMetadata = &passages.first()?.metadata;
    let last: &PassageMetadata = &passages.last()?.metadata;
    let book = first.book.as_deref()?;
    let chapter = first.chapter?;
    let (start, _) = first.verse_bounds()?;
    let (_, end) = last.verse_bounds()?;
    Some(if start == end {
        format!("{} {}:{}", book, chapter, start)
    } else {
        format!("{} {}:{}-{}", book, chapter, start, end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::make_chunk;
    use crate::models::{PassageChunk, ScoredPassage};
    use crate::filter::MetadataFilter;
    use crate::store::InMemoryPassageStore;
    use async_trait::async_trait;

    fn verse(tid: &str, book: &str, chapter: u32, v: u32, text: &str) -> PassageChunk {
        make_chunk(
            text,
            PassageMetadata {
                source: format!("{}.txt", tid),
                translation_id: tid.into(),
                book: Some(book.into()),
                chapter: Some(chapter),
                verse_start: Some(v),
                verse_end: Some(v),
            },
        )
    }

    async fn store(chunks: Vec<PassageChunk>) -> Arc<dyn PassageStore> {
        let store = InMemoryPassageStore::default();
        store.add(&chunks).await.unwrap();
        Arc::new(store)
    }

    fn target(id: &str, store: Arc<dyn PassageStore>) -> CompareTarget {
        CompareTarget {
            translation_id: id.into(),
            store: Ok(store),
        }
    }

    struct FailingStore;

    #[async_trait]
    impl PassageStore for FailingStore {
        async fn similarity_search(&self, _: &str, _: usize) -> anyhow::Result<Vec<ScoredPassage>> {
            anyhow::bail!("index offline")
        }
        async fn similarity_search_filtered(
            &self,
            _: &str,
            _: usize,
            _: &MetadataFilter,
        ) -> anyhow::Result<Vec<Passage>> {
            anyhow::bail!("index offline")
        }
        async fn add(&self, _: &[PassageChunk]) -> anyhow::Result<usize> {
            anyhow::bail!("index offline")
        }
        async fn remove_source(&self, _: &str) -> anyhow::Result<usize> {
            anyhow::bail!("index offline")
        }
        async fn count(&self) -> anyhow::Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_exact_comparison_single_row_in_request_order() {
        let kjv = store(vec![
            verse("kjv", "John", 3, 17, "For God sent not his Son"),
            verse("kjv", "John", 3, 16, "For God so loved the world"),
        ])
        .await;
        let web = store(vec![verse("web", "John", 3, 16, "For God so loved the world, that he gave")]).await;
        let empty = store(vec![verse("bbe", "Genesis", 1, 1, "At the first God made")]).await;

        let targets = vec![target("web", web), target("kjv", kjv), target("bbe", empty)];
        let result = build_comparison(&Retriever::default(), &targets, "John 3:16-17", 3)
            .await
            .unwrap();

        assert_eq!(result.strategy, ComparisonStrategy::Exact);
        assert_eq!(result.rows.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.reference, "John 3:16-17");
        let ids: Vec<_> = row.entries.iter().map(|e| e.translation_id.as_str()).collect();
        assert_eq!(ids, vec!["web", "kjv", "bbe"]);
        assert_eq!(
            row.entries[1].cell,
            Cell::Found {
                content: "For God so loved the world For God sent not his Son".into(),
                reference: Some("John 3:16-17".into()),
            }
        );
        assert_eq!(row.entries[2].cell, Cell::NotFound);
    }

    #[tokio::test]
    async fn test_failing_translation_becomes_error_entry() {
        let kjv = store(vec![verse("kjv", "John", 3, 16, "For God so loved the world")]).await;
        let targets = vec![
            target("kjv", kjv),
            target("broken", Arc::new(FailingStore)),
            CompareTarget {
                translation_id: "missing".into(),
                store: Err("partition not found".into()),
            },
        ];
        let result = build_comparison(&Retriever::default(), &targets, "John 3:16", 3)
            .await
            .unwrap();
        let entries = &result.rows[0].entries;
        assert_eq!(entries.len(), 3);
        assert!(entries[0].cell.is_found());
        assert!(matches!(entries[1].cell, Cell::Error { .. }));
        assert!(matches!(entries[2].cell, Cell::Error { .. }));
    }

    #[tokio::test]
    async fn test_topical_rows_follow_anchor_passages() {
        let kjv = store(vec![
            verse("kjv", "Psalms", 23, 1, "The LORD is my shepherd; I shall not want."),
            verse("kjv", "John", 10, 11, "I am the good shepherd"),
        ])
        .await;
        let web = store(vec![
            verse("web", "Psalm", 23, 1, "Yahweh is my shepherd: I shall lack nothing."),
        ])
        .await;
        let targets = vec![target("kjv", kjv), target("web", web)];
        let result = build_comparison(&Retriever::default(), &targets, "the good shepherd", 5)
            .await
            .unwrap();

        assert_eq!(result.strategy, ComparisonStrategy::Topical);
        assert_eq!(result.rows.len(), 2);
        for row in &result.rows {
            assert_eq!(row.entries.len(), 2);
            assert!(row.entries[0].cell.is_found());
        }
        let psalm = result
            .rows
            .iter()
            .find(|r| r.reference == "Psalms 23:1")
            .unwrap();
        assert!(psalm.entries[1].cell.is_found());
        let john = result.rows.iter().find(|r| r.reference == "John 10:11").unwrap();
        assert_eq!(john.entries[1].cell, Cell::NotFound);
    }

    #[tokio::test]
    async fn test_topical_untagged_anchor_passage() {
        let notes = InMemoryPassageStore::default();
        notes
            .add(&[make_chunk(
                "Notes on grace",
                PassageMetadata {
                    source: "notes.md".into(),
                    translation_id: "kjv".into(),
                    ..Default::default()
                },
            )])
            .await
            .unwrap();
        let other = store(vec![]).await;
        let targets = vec![target("kjv", Arc::new(notes)), target("web", other)];
        let result = build_comparison(&Retriever::default(), &targets, "grace", 3)
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].reference, "notes.md");
        assert!(result.rows[0].entries[0].cell.is_found());
        assert_eq!(result.rows[0].entries[1].cell, Cell::NotFound);
    }

    #[tokio::test]
    async fn test_empty_anchor_is_no_relevant_passages() {
        let targets = vec![target("kjv", store(vec![]).await), target("web", store(vec![]).await)];
        let err = build_comparison(&Retriever::default(), &targets, "grace", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRelevantPassages(_)));
    }
}
