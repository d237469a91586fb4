//! The [`Harness`]: one explicit context object for asking, comparing and
//! ingesting.
//!
//! It owns the [`TranslationRegistry`], the [`Retriever`], and the
//! [`AnswerGenerator`]. Front ends (the CLI, tests, an embedding host) build
//! one harness and call its entry points; nothing is global.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::chunk::{chunk_document, ChunkOptions};
use crate::compare::{build_comparison, CompareTarget, ComparisonOutcome};
use crate::error::{Error, Result};
use crate::generate::{build_answer_prompt, build_comparison_prompt, AnswerGenerator};
use crate::models::{MatchKind, PassageMetadata};
use crate::registry::TranslationRegistry;
use crate::retrieve::Retriever;

/// Chunks handed to the store per `add` call during ingestion.
pub const INGEST_BATCH_SIZE: usize = 100;

/// Largest `k` accepted by [`Harness::ask`] and [`Harness::compare`].
pub const MAX_K: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct HarnessSettings {
    /// Passages retrieved when the caller does not say.
    pub default_k: usize,
    /// Characters of each source kept in `ask` responses.
    pub source_preview_chars: usize,
    pub chunking: ChunkOptions,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            default_k: 3,
            source_preview_chars: 200,
            chunking: ChunkOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcePreview {
    pub content: String,
    pub score: f64,
    pub metadata: PassageMetadata,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub translation_id: String,
    pub num_chunks_used: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourcePreview>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub translation_id: String,
    pub source: String,
    pub chunks_added: usize,
    /// Store count after ingestion.
    pub total_chunks: u64,
}

pub struct Harness {
    registry: Arc<TranslationRegistry>,
    retriever: Retriever,
    generator: Arc<dyn AnswerGenerator>,
    settings: HarnessSettings,
}

impl Harness {
    pub fn new(registry: Arc<TranslationRegistry>, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            registry,
            retriever: Retriever::default(),
            generator,
            settings: HarnessSettings::default(),
        }
    }

    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_settings(mut self, settings: HarnessSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &TranslationRegistry {
        &self.registry
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Answer `question` from one translation.
    ///
    /// Uses `translation_id` when given, otherwise the current selection.
    pub async fn ask(
        &self,
        question: &str,
        translation_id: Option<&str>,
        k: Option<usize>,
        include_sources: bool,
    ) -> Result<AskResponse> {
        let (translation_id, store) = match translation_id {
            Some(id) => (id.to_string(), self.registry.open_store(id).await?),
            None => {
                let store = self.registry.current_store()?;
                let id = self
                    .registry
                    .current_id()
                    .ok_or(Error::NoActiveTranslation)?;
                (id, store)
            }
        };
        let k = self.resolve_k(k);

        let passages = self
            .retriever
            .retrieve(Some(store.as_ref()), question, k)
            .await?;
        if passages.is_empty() {
            return Err(Error::NoRelevantPassages(question.to_string()));
        }
        debug!(translation = %translation_id, passages = passages.len(), "retrieved context");

        let prompt = build_answer_prompt(question, &passages);
        let answer = self.generator.complete(&prompt).await?;

        let sources = include_sources.then(|| {
            passages
                .iter()
                .map(|p| SourcePreview {
                    content: preview(&p.content, self.settings.source_preview_chars),
                    score: p.score,
                    metadata: p.metadata.clone(),
                    kind: p.kind,
                })
                .collect()
        });

        Ok(AskResponse {
            question: question.to_string(),
            answer: answer.trim().to_string(),
            translation_id,
            num_chunks_used: passages.len(),
            sources,
        })
    }

    /// Compare `question` across `translation_ids` and summarise.
    ///
    /// Repeated ids are collapsed to their first occurrence.
    pub async fn compare(
        &self,
        question: &str,
        translation_ids: &[String],
        k: Option<usize>,
    ) -> Result<ComparisonOutcome> {
        let mut ids: Vec<&str> = Vec::new();
        for id in translation_ids {
            if !ids.contains(&id.as_str()) {
                ids.push(id.as_str());
            }
        }
        if ids.len() < 2 {
            return Err(Error::TooFewTranslations(ids.len()));
        }
        if let Some(unknown) = ids.iter().find(|id| !self.registry.contains(id)) {
            return Err(Error::UnknownTranslation(unknown.to_string()));
        }

        let targets: Vec<CompareTarget> = join_all(ids.iter().map(|id| async move {
            CompareTarget {
                translation_id: id.to_string(),
                store: self
                    .registry
                    .open_store(id)
                    .await
                    .map_err(|e| e.to_string()),
            }
        }))
        .await;

        let k = self.resolve_k(k);
        let comparison = build_comparison(&self.retriever, &targets, question, k).await?;

        let prompt = build_comparison_prompt(&comparison);
        let summary = self
            .generator
            .complete(&prompt)
            .await
            .map(|s| s.trim().to_string())
            .map_err(Error::from);

        Ok(ComparisonOutcome {
            comparison,
            summary,
        })
    }

    /// Requested `k`, or the default, kept within `1..=MAX_K`.
    fn resolve_k(&self, k: Option<usize>) -> usize {
        k.unwrap_or(self.settings.default_k).clamp(1, MAX_K)
    }

    /// Chunk `text` into `translation_id` and refresh its chunk count.
    ///
    /// Chunks stored earlier under the same `source` are replaced.
    pub async fn add_document(
        &self,
        translation_id: &str,
        source: &str,
        text: &str,
    ) -> Result<IngestReport> {
        if !self.registry.contains(translation_id) {
            return Err(Error::NotFound(translation_id.to_string()));
        }

        let chunks = chunk_document(
            translation_id,
            source,
            text,
            &self.settings.chunking,
            self.retriever.parser().catalog(),
        );
        if chunks.is_empty() {
            return Err(Error::EmptyDocument(source.to_string()));
        }

        let store = self.registry.open_store(translation_id).await?;
        let replaced = store.remove_source(source).await?;
        if replaced > 0 {
            debug!(translation = translation_id, source, replaced, "replacing earlier chunks");
        }
        let mut added = 0;
        for batch in chunks.chunks(INGEST_BATCH_SIZE) {
            added += store.add(batch).await?;
        }
        let total = store.count().await? as u64;
        self.registry
            .update_chunk_count(translation_id, total)
            .await?;

        info!(translation = translation_id, source, added, total, "ingested document");
        Ok(IngestReport {
            translation_id: translation_id.to_string(),
            source: source.to_string(),
            chunks_added: added,
            total_chunks: total,
        })
    }
}

/// First `max_chars` characters of `text`, with "..." when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
