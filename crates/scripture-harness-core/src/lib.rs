//! # Scripture Harness Core
//!
//! Storage-agnostic logic for Scripture Harness: verse-reference parsing,
//! the passage store abstraction, exact-range retrieval, the translation
//! registry, and the multi-translation comparison engine.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP clients.
//! Concrete stores, embedders, and language-model clients are supplied by
//! the application through the traits in [`store`], [`embedding`],
//! [`registry`], and [`generate`].

pub mod books;
pub mod chunk;
pub mod compare;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod generate;
pub mod harness;
pub mod models;
pub mod reference;
pub mod registry;
pub mod retrieve;
pub mod store;
pub mod variants;

pub use error::{Error, Result};
pub use harness::Harness;
pub use reference::{parse_reference, VerseReference, VerseSpan};
