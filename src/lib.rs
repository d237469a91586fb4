//! # Scripture Harness
//!
//! Question answering and side-by-side comparison over multiple Bible
//! translations, backed by SQLite.
//!
//! The retrieval, comparison and registry logic lives in
//! [`scripture_harness_core`]; this crate supplies the persistent stores,
//! network embedders and generators, document extraction, and the
//! `scripture` CLI.
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  ingest    │──▶│ core chunker │──▶│ SQLite store │
//! │ txt/pdf/.. │   │ verse-aware  │   │ per-transl.  │
//! └────────────┘   └──────────────┘   └──────┬───────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │   ask    │       │ compare  │
//!                   └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite passage store and partitions |
//! | [`sqlite_registry`] | SQLite translation registry backend |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Answer generators |
//! | [`extract`] | PDF/DOCX/text extraction |
//! | [`ingest`] | File and directory ingestion |
//! | [`app`] | Harness wiring from config |
//! | [`output`] | CLI rendering |
//! | [`chat`] | Interactive session |
//! | [`stats`] | Database statistics |

pub mod app;
pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod output;
pub mod sqlite_registry;
pub mod sqlite_store;
pub mod stats;
