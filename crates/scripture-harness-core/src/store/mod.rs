//! Passage storage abstraction.
//!
//! A [`PassageStore`] is one translation's partition of the nearest-neighbour
//! index. A [`StoreProvider`] creates, opens, and destroys partitions by
//! translation id. Both traits are object-safe and `Send + Sync` so handles
//! can be shared across tasks as `Arc<dyn PassageStore>`.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`similarity_search`](PassageStore::similarity_search) | Ranked passages for free text |
//! | [`similarity_search_filtered`](PassageStore::similarity_search_filtered) | Passages matching a [`MetadataFilter`] |
//! | [`add`](PassageStore::add) | Embed and store chunks |
//! | [`remove_source`](PassageStore::remove_source) | Drop every chunk of one document |
//! | [`count`](PassageStore::count) | Number of stored chunks |

pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::filter::MetadataFilter;
use crate::models::{Passage, PassageChunk, ScoredPassage};

pub use memory::{InMemoryPassageStore, InMemoryStoreProvider};

/// One translation's passage index.
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// Up to `k` passages ranked by similarity to `text`, most similar first.
    ///
    /// Scores are store-native; lower means more similar.
    async fn similarity_search(&self, text: &str, k: usize) -> Result<Vec<ScoredPassage>>;

    /// Up to `k` passages satisfying every clause of `filter`.
    ///
    /// Implementations may rank by similarity to `text`; callers that need a
    /// particular order sort the result themselves.
    async fn similarity_search_filtered(
        &self,
        text: &str,
        k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<Passage>>;

    /// Embed and store `chunks`. Returns the number stored.
    async fn add(&self, chunks: &[PassageChunk]) -> Result<usize>;

    /// Delete every chunk whose metadata `source` equals `source`.
    /// Returns the number deleted.
    async fn remove_source(&self, source: &str) -> Result<usize>;

    /// Total number of chunks in this partition.
    async fn count(&self) -> Result<usize>;
}

/// Lifecycle of per-translation partitions.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Create an empty partition for `translation_id`.
    async fn create(&self, translation_id: &str) -> Result<()>;

    /// Open a handle to an existing partition.
    async fn open(&self, translation_id: &str) -> Result<Arc<dyn PassageStore>>;

    /// Destroy the partition and everything in it.
    async fn destroy(&self, translation_id: &str) -> Result<()>;
}
