//! In-memory [`PassageStore`] and [`StoreProvider`] for tests and embedding.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock`. Similarity search is
//! brute-force cosine distance over all stored vectors.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_distance, embed_one, Embedder, HashingEmbedder};
use crate::filter::MetadataFilter;
use crate::models::{Passage, PassageChunk, ScoredPassage};

use super::{PassageStore, StoreProvider};

struct StoredPassage {
    chunk: PassageChunk,
    vector: Vec<f32>,
}

/// In-memory passage index for one translation.
pub struct InMemoryPassageStore {
    embedder: Arc<dyn Embedder>,
    passages: RwLock<Vec<StoredPassage>>,
}

impl InMemoryPassageStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            passages: RwLock::new(Vec::new()),
        }
    }

    /// Rank every stored passage accepted by `keep` by distance to `text`.
    async fn ranked(
        &self,
        text: &str,
        keep: impl Fn(&PassageChunk) -> bool,
    ) -> Result<Vec<ScoredPassage>> {
        let query_vec = embed_one(self.embedder.as_ref(), text).await?;
        let passages = self.passages.read().unwrap();
        let mut scored: Vec<(usize, ScoredPassage)> = passages
            .iter()
            .enumerate()
            .filter(|(_, sp)| keep(&sp.chunk))
            .map(|(i, sp)| {
                (
                    i,
                    ScoredPassage {
                        passage: Passage {
                            content: sp.chunk.content.clone(),
                            metadata: sp.chunk.metadata.clone(),
                        },
                        score: cosine_distance(&query_vec, &sp.vector),
                    },
                )
            })
            .collect();
        scored.sort_by(|(ia, a), (ib, b)| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        });
        Ok(scored.into_iter().map(|(_, sp)| sp).collect())
    }
}

impl Default for InMemoryPassageStore {
    fn default() -> Self {
        Self::new(Arc::new(HashingEmbedder::default()))
    }
}

#[async_trait]
impl PassageStore for InMemoryPassageStore {
    async fn similarity_search(&self, text: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let mut ranked = self.ranked(text, |_| true).await?;
        ranked.truncate(k);
        Ok(ranked)
    }

    async fn similarity_search_filtered(
        &self,
        text: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Passage>> {
        let mut ranked = self.ranked(text, |c| filter.matches(&c.metadata)).await?;
        ranked.truncate(k);
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
        let mut passages = self.passages.write().unwrap();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            passages.push(StoredPassage {
                chunk: chunk.clone(),
                vector,
            });
        }
        Ok(chunks.len())
    }

    async fn remove_source(&self, source: &str) -> Result<usize> {
        let mut passages = self.passages.write().unwrap();
        let before = passages.len();
        passages.retain(|sp| sp.chunk.metadata.source != source);
        Ok(before - passages.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.passages.read().unwrap().len())
    }
}

/// Partitions kept in a map keyed by translation id.
///
/// `open` hands out the same `Arc` every time, so data added through one
/// handle is visible through all of them.
pub struct InMemoryStoreProvider {
    embedder: Arc<dyn Embedder>,
    partitions: RwLock<HashMap<String, Arc<InMemoryPassageStore>>>,
}

impl InMemoryStoreProvider {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.read().unwrap().len()
    }
}

impl Default for InMemoryStoreProvider {
    fn default() -> Self {
        Self::new(Arc::new(HashingEmbedder::default()))
    }
}

#[async_trait]
impl StoreProvider for InMemoryStoreProvider {
    /// Replaces any partition left under the same id.
    async fn create(&self, translation_id: &str) -> Result<()> {
        self.partitions.write().unwrap().insert(
            translation_id.to_string(),
            Arc::new(InMemoryPassageStore::new(self.embedder.clone())),
        );
        Ok(())
    }

    async fn open(&self, translation_id: &str) -> Result<Arc<dyn PassageStore>> {
        let partitions = self.partitions.read().unwrap();
        match partitions.get(translation_id) {
            Some(store) => Ok(store.clone() as Arc<dyn PassageStore>),
            None => bail!("no store partition for '{}'", translation_id),
        }
    }

    async fn destroy(&self, translation_id: &str) -> Result<()> {
        self.partitions.write().unwrap().remove(translation_id);
        Ok(())
    }
}
