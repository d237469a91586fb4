//! Translation registry: known translations and the current selection.
//!
//! # Locking
//!
//! Mutations (`create`, `delete`, `switch`, `update_chunk_count`) take a
//! single async writer lock for their whole duration, including backend and
//! store-partition I/O, so they are applied one at a time. Readers only touch
//! the in-memory snapshot behind a `std::sync::RwLock` that is never held
//! across an `.await`, so `list()` and `current()` never wait on I/O.
//!
//! Translations are persisted through a [`RegistryBackend`]. The current
//! selection is process state and starts empty.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use futures::lock::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::Translation;
use crate::store::{PassageStore, StoreProvider};

/// Persistence for translation entries.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    async fn load(&self) -> AnyResult<Vec<Translation>>;
    /// Insert or replace `translation`.
    async fn save(&self, translation: &Translation) -> AnyResult<()>;
    async fn remove(&self, id: &str) -> AnyResult<()>;
}

/// Backend keeping entries in memory only.
#[derive(Default)]
pub struct InMemoryRegistryBackend {
    entries: RwLock<HashMap<String, Translation>>,
}

impl InMemoryRegistryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryBackend for InMemoryRegistryBackend {
    async fn load(&self) -> AnyResult<Vec<Translation>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("registry backend lock poisoned"))?;
        Ok(entries.values().cloned().collect())
    }

    async fn save(&self, translation: &Translation) -> AnyResult<()> {
        self.entries
            .write()
            .map_err(|_| anyhow::anyhow!("registry backend lock poisoned"))?
            .insert(translation.id.clone(), translation.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> AnyResult<()> {
        self.entries
            .write()
            .map_err(|_| anyhow::anyhow!("registry backend lock poisoned"))?
            .remove(id);
        Ok(())
    }
}

/// True if `id` is non-empty and only `[A-Za-z0-9_]`.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Selection {
    id: String,
    store: Arc<dyn PassageStore>,
}

#[derive(Default)]
struct Snapshot {
    translations: HashMap<String, Translation>,
    current: Option<Selection>,
}

pub struct TranslationRegistry {
    backend: Arc<dyn RegistryBackend>,
    stores: Arc<dyn StoreProvider>,
    write_lock: Mutex<()>,
    snapshot: RwLock<Snapshot>,
}

impl TranslationRegistry {
    /// Load persisted translations from `backend`.
    pub async fn open(
        backend: Arc<dyn RegistryBackend>,
        stores: Arc<dyn StoreProvider>,
    ) -> Result<Self> {
        let translations = backend
            .load()
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
        Ok(Self {
            backend,
            stores,
            write_lock: Mutex::new(()),
            snapshot: RwLock::new(Snapshot {
                translations,
                current: None,
            }),
        })
    }

    /// Registry backed entirely by memory.
    pub async fn in_memory(stores: Arc<dyn StoreProvider>) -> Result<Self> {
        Self::open(Arc::new(InMemoryRegistryBackend::new()), stores).await
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new translation with an empty store partition.
    pub async fn create(&self, id: &str, name: &str, description: &str) -> Result<Translation> {
        if !is_valid_id(id) {
            return Err(Error::InvalidId(id.to_string()));
        }
        let _guard = self.write_lock.lock().await;
        if self.contains(id) {
            return Err(Error::AlreadyExists(id.to_string()));
        }

        let translation = Translation::new(id, name, description);
        self.stores.create(id).await?;
        if let Err(e) = self.backend.save(&translation).await {
            if let Err(cleanup) = self.stores.destroy(id).await {
                warn!(translation = id, error = %cleanup, "failed to drop partition after save error");
            }
            return Err(e.into());
        }

        self.write()
            .translations
            .insert(id.to_string(), translation.clone());
        info!(translation = id, name, "created translation");
        Ok(translation)
    }

    /// Remove a translation and its partition. Clears the selection if it
    /// pointed at `id`.
    ///
    /// The entry goes first: if the backend fails, the translation and its
    /// partition are untouched. A partition that then fails to drop is only
    /// logged, since `create` starts every partition empty.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if !self.contains(id) {
            return Err(Error::NotFound(id.to_string()));
        }

        self.backend.remove(id).await?;

        let mut snapshot = self.write();
        snapshot.translations.remove(id);
        if snapshot.current.as_ref().is_some_and(|c| c.id == id) {
            snapshot.current = None;
        }
        drop(snapshot);

        if let Err(e) = self.stores.destroy(id).await {
            warn!(translation = id, error = %e, "failed to drop partition of deleted translation");
        }
        info!(translation = id, "deleted translation");
        Ok(())
    }

    /// Make `id` current. Switching to the current translation does nothing.
    pub async fn switch(&self, id: &str) -> Result<Translation> {
        let _guard = self.write_lock.lock().await;
        let translation = self
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if self.current_id().as_deref() == Some(id) {
            return Ok(translation);
        }

        let store = self.stores.open(id).await?;
        self.write().current = Some(Selection {
            id: id.to_string(),
            store,
        });
        info!(translation = id, "switched translation");
        Ok(translation)
    }

    /// Record the number of chunks stored for `id`.
    pub async fn update_chunk_count(&self, id: &str, count: u64) -> Result<Translation> {
        let _guard = self.write_lock.lock().await;
        let mut translation = self
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        translation.chunk_count = count;
        self.backend.save(&translation).await?;
        self.write()
            .translations
            .insert(id.to_string(), translation.clone());
        Ok(translation)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().translations.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Translation> {
        self.read().translations.get(id).cloned()
    }

    /// All translations sorted by name, then id.
    pub fn list(&self) -> Vec<Translation> {
        let mut all: Vec<Translation> = self.read().translations.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn current(&self) -> Option<Translation> {
        let snapshot = self.read();
        let id = &snapshot.current.as_ref()?.id;
        snapshot.translations.get(id).cloned()
    }

    pub fn current_id(&self) -> Option<String> {
        self.read().current.as_ref().map(|c| c.id.clone())
    }

    /// Store of the current translation.
    pub fn current_store(&self) -> Result<Arc<dyn PassageStore>> {
        self.read()
            .current
            .as_ref()
            .map(|c| c.store.clone())
            .ok_or(Error::NoActiveTranslation)
    }

    /// A transient handle to `id`'s partition; the selection is untouched.
    pub async fn open_store(&self, id: &str) -> Result<Arc<dyn PassageStore>> {
        if !self.contains(id) {
            return Err(Error::NotFound(id.to_string()));
        }
        if let Some(store) = self
            .read()
            .current
            .as_ref()
            .filter(|c| c.id == id)
            .map(|c| c.store.clone())
        {
            return Ok(store);
        }
        Ok(self.stores.open(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStoreProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn registry() -> TranslationRegistry {
        TranslationRegistry::in_memory(Arc::new(InMemoryStoreProvider::default()))
            .await
            .unwrap()
    }

    #[test]
    fn test_id_validation() {
        assert!(is_valid_id("kjv"));
        assert!(is_valid_id("NIV_1984"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("king james"));
        assert!(!is_valid_id("kjv-1611"));
    }

    #[tokio::test]
    async fn test_create_and_list_sorted() {
        let reg = registry().await;
        reg.create("web", "World English Bible", "").await.unwrap();
        reg.create("kjv", "King James Version", "1611").await.unwrap();
        reg.create("akjv", "King James Version", "updated").await.unwrap();

        let ids: Vec<_> = reg.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["akjv", "kjv", "web"]);
        assert_eq!(reg.get("kjv").unwrap().chunk_count, 0);
    }

    #[tokio::test]
    async fn test_create_errors() {
        let reg = registry().await;
        assert!(matches!(
            reg.create("bad id", "x", "").await,
            Err(Error::InvalidId(_))
        ));
        reg.create("kjv", "KJV", "").await.unwrap();
        assert!(matches!(
            reg.create("kjv", "KJV", "").await,
            Err(Error::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_switch_delete_clears_current() {
        let reg = registry().await;
        assert!(matches!(reg.current_store(), Err(Error::NoActiveTranslation)));
        assert!(matches!(reg.switch("kjv").await, Err(Error::NotFound(_))));

        reg.create("kjv", "KJV", "").await.unwrap();
        reg.switch("kjv").await.unwrap();
        assert_eq!(reg.current().unwrap().id, "kjv");
        assert!(reg.current_store().is_ok());

        reg.delete("kjv").await.unwrap();
        assert!(reg.current().is_none());
        assert!(matches!(reg.delete("kjv").await, Err(Error::NotFound(_))));
    }

    struct CountingProvider {
        inner: InMemoryStoreProvider,
        opens: AtomicUsize,
    }

    #[async_trait]
    impl StoreProvider for CountingProvider {
        async fn create(&self, id: &str) -> AnyResult<()> {
            self.inner.create(id).await
        }
        async fn open(&self, id: &str) -> AnyResult<Arc<dyn PassageStore>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.inner.open(id).await
        }
        async fn destroy(&self, id: &str) -> AnyResult<()> {
            self.inner.destroy(id).await
        }
    }

    struct RemoveFails(InMemoryRegistryBackend);

    #[async_trait]
    impl RegistryBackend for RemoveFails {
        async fn load(&self) -> AnyResult<Vec<Translation>> {
            self.0.load().await
        }
        async fn save(&self, translation: &Translation) -> AnyResult<()> {
            self.0.save(translation).await
        }
        async fn remove(&self, _: &str) -> AnyResult<()> {
            anyhow::bail!("disk full")
        }
    }

    struct DestroyFails(InMemoryStoreProvider);

    #[async_trait]
    impl StoreProvider for DestroyFails {
        async fn create(&self, id: &str) -> AnyResult<()> {
            self.0.create(id).await
        }
        async fn open(&self, id: &str) -> AnyResult<Arc<dyn PassageStore>> {
            self.0.open(id).await
        }
        async fn destroy(&self, _: &str) -> AnyResult<()> {
            anyhow::bail!("database is locked")
        }
    }

    #[tokio::test]
    async fn test_failed_entry_removal_keeps_translation_usable() {
        let reg = TranslationRegistry::open(
            Arc::new(RemoveFails(InMemoryRegistryBackend::new())),
            Arc::new(InMemoryStoreProvider::default()),
        )
        .await
        .unwrap();
        reg.create("kjv", "KJV", "").await.unwrap();
        reg.switch("kjv").await.unwrap();

        let err = reg.delete("kjv").await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(reg.list().len(), 1);
        assert_eq!(reg.current_id().as_deref(), Some("kjv"));
        assert!(reg.open_store("kjv").await.is_ok());
        assert!(reg.current_store().is_ok());
    }

    #[tokio::test]
    async fn test_failed_partition_drop_still_deletes_entry() {
        let reg = TranslationRegistry::in_memory(Arc::new(DestroyFails(
            InMemoryStoreProvider::default(),
        )))
        .await
        .unwrap();
        reg.create("kjv", "KJV", "").await.unwrap();
        reg.switch("kjv").await.unwrap();

        reg.delete("kjv").await.unwrap();
        assert!(reg.list().is_empty());
        assert!(reg.current().is_none());
        assert!(matches!(reg.open_store("kjv").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_switch_to_current_is_noop() {
        let provider = Arc::new(CountingProvider {
            inner: InMemoryStoreProvider::default(),
            opens: AtomicUsize::new(0),
        });
        let reg = TranslationRegistry::in_memory(provider.clone()).await.unwrap();
        reg.create("kjv", "KJV", "").await.unwrap();
        reg.switch("kjv").await.unwrap();
        reg.switch("kjv").await.unwrap();
        assert_eq!(provider.opens.load(Ordering::SeqCst), 1);

        // The selected translation's store is reused rather than reopened.
        reg.open_store("kjv").await.unwrap();
        assert_eq!(provider.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_create() {
        let reg = registry().await;
        let (a, b) = futures::join!(
            reg.create("kjv", "KJV", ""),
            reg.create("kjv", "KJV", "")
        );
        let already = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(Error::AlreadyExists(_))))
            .count();
        assert_eq!(already, 1);
        assert!(a.is_ok() || b.is_ok());
        assert_eq!(reg.list().len(), 1);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let backend = Arc::new(InMemoryRegistryBackend::new());
        let provider: Arc<dyn StoreProvider> = Arc::new(InMemoryStoreProvider::default());
        let reg = TranslationRegistry::open(backend.clone(), provider.clone())
            .await
            .unwrap();
        reg.create("kjv", "KJV", "King James").await.unwrap();
        reg.switch("kjv").await.unwrap();
        reg.update_chunk_count("kjv", 42).await.unwrap();
        drop(reg);

        let reopened = TranslationRegistry::open(backend, provider).await.unwrap();
        let kjv = reopened.get("kjv").unwrap();
        assert_eq!(kjv.chunk_count, 42);
        assert_eq!(kjv.description, "King James");
        assert!(reopened.current().is_none());
    }
}
