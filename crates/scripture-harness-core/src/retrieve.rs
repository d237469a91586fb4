//! Retrieval engine: exact verse lookups first, similarity search second.
//!
//! # Algorithm
//!
//! 1. Parse the query with the [`ReferenceParser`]. On a hit:
//!    a. For each label from the [`BookVariants`] table, run a filtered
//!       search for `book == label AND chapter == C` (plus verse bounds for
//!       ranges), over-fetching `cap × overfetch_factor` candidates.
//!    b. Keep only chunks whose `[verse_start, verse_end]` lies inside the
//!       requested span. The first label with any such chunk wins.
//!    c. Sort by `verse_start`, truncate, score `1.0`, kind `Exact`.
//! 2. Otherwise (or when no label hits), similarity search for `k` passages
//!    with the store's own score, kind `Semantic`.
//!
//! Truncation is `k` for verse ranges and `max(k, whole_chapter_limit)` for
//! whole chapters, so "John 3" returns the chapter rather than three verses.

use tracing::debug;

use crate::books::BookCatalog;
use crate::error::Result;
use crate::filter::MetadataFilter;
use crate::models::{MatchKind, Passage, PassageMetadata, RetrievedPassage};
use crate::reference::{ReferenceParser, VerseReference, VerseSpan};
use crate::store::PassageStore;
use crate::variants::BookVariants;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalParams {
    /// Candidates fetched per filtered query, as a multiple of `k`.
    pub overfetch_factor: usize,
    /// Minimum result cap for whole-chapter references.
    pub whole_chapter_limit: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            overfetch_factor: 5,
            whole_chapter_limit: 30,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Retriever {
    parser: ReferenceParser,
    variants: BookVariants,
    params: RetrievalParams,
}

impl Retriever {
    pub fn new(parser: ReferenceParser, variants: BookVariants, params: RetrievalParams) -> Self {
        Self {
            parser,
            variants,
            params,
        }
    }

    pub fn parser(&self) -> &ReferenceParser {
        &self.parser
    }

    pub fn params(&self) -> RetrievalParams {
        self.params
    }

    /// Result cap for `reference` at requested size `k`.
    pub fn cap(&self, reference: &VerseReference, k: usize) -> usize {
        match reference.span {
            VerseSpan::WholeChapter => k.max(self.params.whole_chapter_limit),
            VerseSpan::Range { .. } => k,
        }
    }

    /// Ordered relevant passages for `query`. Empty when `store` is `None`.
    pub async fn retrieve(
        &self,
        store: Option<&dyn PassageStore>,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let Some(store) = store else {
            return Ok(Vec::new());
        };

        if let Some(reference) = self.parser.parse(query) {
            let exact = self.exact_lookup(store, &reference, k).await?;
            if !exact.is_empty() {
                return Ok(exact
                    .into_iter()
                    .map(|p| RetrievedPassage {
                        content: p.content,
                        score: 1.0,
                        metadata: p.metadata,
                        kind: MatchKind::Exact,
                    })
                    .collect());
            }
            debug!(reference = %reference, "no exact match, falling back to similarity search");
        }

        let scored = store.similarity_search(query, k).await?;
        Ok(scored
            .into_iter()
            .map(|sp| RetrievedPassage {
                content: sp.passage.content,
                score: sp.score,
                metadata: sp.passage.metadata,
                kind: MatchKind::Semantic,
            })
            .collect())
    }

    /// Passages of `reference` in `store`, in verse order.
    ///
    /// Tries each book label in turn and returns the in-range hits of the
    /// first label that has any. Empty when no label matches.
    pub async fn exact_lookup(
        &self,
        store: &dyn PassageStore,
        reference: &VerseReference,
        k: usize,
    ) -> Result<Vec<Passage>> {
        let fetch = self.cap(reference, k).max(1) * self.params.overfetch_factor.max(1);

        for label in self.variants.for_reference(reference) {
            let filter = MetadataFilter::for_reference(&label, reference);
            let hits = store
                .similarity_search_filtered(&reference.reference, fetch, &filter)
                .await?;
            let mut in_range: Vec<Passage> = hits
                .into_iter()
                .filter(|p| within(&p.metadata, reference))
                .collect();
            if in_range.is_empty() {
                continue;
            }
            debug!(reference = %reference, label = %label, hits = in_range.len(), "exact match");
            in_range.sort_by_key(|p| p.metadata.verse_bounds().map(|(s, _)| s).unwrap_or(0));
            in_range.truncate(self.cap(reference, k));
            return Ok(in_range);
        }

        Ok(Vec::new())
    }
}

/// True if the passage's verse bounds lie entirely inside the reference.
fn within(meta: &PassageMetadata, reference: &VerseReference) -> bool {
    match meta.verse_bounds() {
        Some((start, end)) => {
            meta.chapter == Some(reference.chapter) && reference.span.contains(start, end)
        }
        None => false,
    }
}

/// The verse reference a stored passage occupies, if it is fully tagged.
///
/// The stored label is resolved to its canonical name when the catalog
/// knows it; otherwise the label is used as-is.
pub fn reference_of(meta: &PassageMetadata, catalog: &BookCatalog) -> Option<VerseReference> {
    let label = meta.book.as_deref()?;
    let chapter = meta.chapter?;
    let (start, end) = meta.verse_bounds()?;
    let canonical = catalog.resolve(label).unwrap_or(label);
    Some(VerseReference::new(
        canonical,
        label,
        chapter,
        VerseSpan::range(start, end),
    ))
}
