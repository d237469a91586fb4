//! Wiring from [`Config`] to a ready [`Harness`].
//!
//! Opens the SQLite pool, applies the schema, builds the embedder and
//! generator named in the config, and loads the translation registry.
//! When `[retrieval] default_translation` names a registered translation it
//! becomes the current selection.

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use scripture_harness_core::embedding::Embedder;
use scripture_harness_core::generate::AnswerGenerator;
use scripture_harness_core::registry::TranslationRegistry;
use scripture_harness_core::retrieve::Retriever;
use scripture_harness_core::Harness;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::llm::create_generator;
use crate::sqlite_registry::SqliteRegistryBackend;
use crate::sqlite_store::SqliteStoreProvider;
use crate::{db, migrate};

pub struct App {
    pub harness: Harness,
    pub pool: SqlitePool,
}

pub async fn open(config: &Config) -> Result<App> {
    let embedder = create_embedder(&config.embedding)?;
    let generator = create_generator(&config.llm)?;
    open_with(config, embedder, generator).await
}

/// Like [`open`], with caller-supplied embedder and generator.
pub async fn open_with(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
) -> Result<App> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    debug!(
        embedder = embedder.model_name(),
        generator = generator.model_name(),
        "opening harness"
    );

    let backend = Arc::new(SqliteRegistryBackend::new(pool.clone()));
    let stores = Arc::new(SqliteStoreProvider::new(pool.clone(), embedder));
    let registry = Arc::new(TranslationRegistry::open(backend, stores).await?);

    if let Some(id) = &config.retrieval.default_translation {
        match registry.switch(id).await {
            Ok(_) => debug!(translation = %id, "selected default translation"),
            Err(e) => warn!(translation = %id, error = %e, "default translation unavailable"),
        }
    }

    let retriever = Retriever::new(
        Default::default(),
        Default::default(),
        config.retrieval_params(),
    );
    let harness = Harness::new(registry, generator)
        .with_retriever(retriever)
        .with_settings(config.harness_settings());

    Ok(App { harness, pool })
}
