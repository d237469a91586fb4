//! Error taxonomy for the core.
//!
//! Failures of pluggable collaborators (stores, embedders, generators) arrive
//! as [`anyhow::Error`] and are wrapped in [`Error::Upstream`]. Everything else
//! is a caller-visible condition with its own variant.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Translation id contains characters outside `[A-Za-z0-9_]` or is empty.
    #[error("invalid translation id '{0}': use letters, digits and underscores only")]
    InvalidId(String),

    #[error("translation '{0}' already exists")]
    AlreadyExists(String),

    #[error("translation '{0}' not found")]
    NotFound(String),

    /// A query was issued with no translation selected.
    #[error("no translation selected; switch to a translation first")]
    NoActiveTranslation,

    /// A translation is selected but nothing relevant was retrieved.
    #[error("no relevant passages found for '{0}'")]
    NoRelevantPassages(String),

    /// A comparison named a translation that is not registered.
    #[error("unknown translation '{0}' in comparison")]
    UnknownTranslation(String),

    #[error("comparison needs at least two distinct translations, got {0}")]
    TooFewTranslations(usize),

    #[error("document '{0}' produced no passages")]
    EmptyDocument(String),

    /// A store, embedder, or generator call failed.
    #[error("upstream failure: {0:#}")]
    Upstream(#[from] anyhow::Error),
}

impl Error {
    /// True for failures caused by an external service rather than the request.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Upstream(_))
    }
}
