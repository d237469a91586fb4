//! TOML configuration.
//!
//! Every section except `[db]` is optional and falls back to defaults.
//! See `config/scripture.example.toml` for a complete file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use scripture_harness_core::chunk::ChunkOptions;
use scripture_harness_core::harness::{HarnessSettings, MAX_K};
use scripture_harness_core::retrieve::RetrievalParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_verses_per_chunk")]
    pub verses_per_chunk: usize,
    /// Characters repeated between consecutive paragraph chunks.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            verses_per_chunk: default_verses_per_chunk(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_tokens() -> usize {
    700
}
fn default_verses_per_chunk() -> usize {
    1
}
fn default_overlap_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
    #[serde(default = "default_whole_chapter_limit")]
    pub whole_chapter_limit: usize,
    #[serde(default = "default_source_preview_chars")]
    pub source_preview_chars: usize,
    /// Translation used by `ask` when `--translation` is not given.
    #[serde(default)]
    pub default_translation: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            overfetch_factor: default_overfetch_factor(),
            whole_chapter_limit: default_whole_chapter_limit(),
            source_preview_chars: default_source_preview_chars(),
            default_translation: None,
        }
    }
}

fn default_k() -> usize {
    3
}
fn default_overfetch_factor() -> usize {
    5
}
fn default_whole_chapter_limit() -> usize {
    30
}
fn default_source_preview_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for Ollama.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_network(&self) -> bool {
        matches!(self.provider.as_str(), "openai" | "ollama")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            temperature: default_temperature(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "disabled".to_string()
}
fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
        "**/*.pdf".to_string(),
        "**/*.docx".to_string(),
    ]
}
fn default_max_upload_mb() -> u64 {
    10
}

impl IngestConfig {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

impl Config {
    /// Settings handed to the core [`Harness`](scripture_harness_core::Harness).
    pub fn harness_settings(&self) -> HarnessSettings {
        HarnessSettings {
            default_k: self.retrieval.k,
            source_preview_chars: self.retrieval.source_preview_chars,
            chunking: ChunkOptions {
                max_tokens: self.chunking.max_tokens,
                verses_per_chunk: self.chunking.verses_per_chunk,
                overlap_chars: self.chunking.overlap_chars,
            },
        }
    }

    pub fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            overfetch_factor: self.retrieval.overfetch_factor,
            whole_chapter_limit: self.retrieval.whole_chapter_limit,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }
    if config.chunking.verses_per_chunk == 0 {
        anyhow::bail!("chunking.verses_per_chunk must be > 0");
    }
    // max_tokens is converted at 4 characters per token.
    if config.chunking.overlap_chars >= config.chunking.max_tokens * 4 {
        anyhow::bail!("chunking.overlap_chars must be smaller than max_tokens * 4");
    }

    if !(1..=MAX_K).contains(&config.retrieval.k) {
        anyhow::bail!("retrieval.k must be in [1, {}]", MAX_K);
    }
    if config.retrieval.overfetch_factor < 1 {
        anyhow::bail!("retrieval.overfetch_factor must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "hash" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hash, openai, or ollama.",
            other
        ),
    }
    if config.embedding.is_network() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse_config("[db]\npath = \"data/scripture.sqlite\"\n").unwrap();
        assert_eq!(cfg.retrieval.k, 3);
        assert_eq!(cfg.retrieval.overfetch_factor, 5);
        assert_eq!(cfg.retrieval.whole_chapter_limit, 30);
        assert_eq!(cfg.retrieval.source_preview_chars, 200);
        assert_eq!(cfg.embedding.provider, "hash");
        assert_eq!(cfg.llm.provider, "disabled");
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
        assert_eq!(cfg.ingest.max_upload_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_rejects_out_of_range_k() {
        let err = parse_config("[db]\npath = \"x\"\n[retrieval]\nk = 11\n").unwrap_err();
        assert!(err.to_string().contains("retrieval.k"));
    }

    #[test]
    fn test_network_embedder_needs_model_and_dims() {
        let err = parse_config("[db]\npath = \"x\"\n[embedding]\nprovider = \"openai\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
        let ok = parse_config(
            "[db]\npath = \"x\"\n[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\ndims = 768\n",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_rejects_unknown_providers_and_temperature() {
        assert!(parse_config("[db]\npath = \"x\"\n[llm]\nprovider = \"bard\"\n").is_err());
        assert!(parse_config("[db]\npath = \"x\"\n[llm]\ntemperature = 3.5\n").is_err());
        assert!(parse_config("[db]\npath = \"x\"\n[embedding]\nprovider = \"local\"\n").is_err());
    }

    #[test]
    fn test_harness_settings_follow_config() {
        let cfg = parse_config(
            "[db]\npath = \"x\"\n[retrieval]\nk = 5\nsource_preview_chars = 80\n[chunking]\nverses_per_chunk = 3\n",
        )
        .unwrap();
        let s = cfg.harness_settings();
        assert_eq!(s.default_k, 5);
        assert_eq!(s.source_preview_chars, 80);
        assert_eq!(s.chunking.verses_per_chunk, 3);
        assert_eq!(s.chunking.overlap_chars, 200);
    }

    #[test]
    fn test_overlap_must_fit_in_chunk() {
        let err = parse_config("[db]\npath = \"x\"\n[chunking]\nmax_tokens = 50\noverlap_chars = 200\n")
            .unwrap_err();
        assert!(err.to_string().contains("overlap_chars"));
        let cfg = parse_config("[db]\npath = \"x\"\n[chunking]\noverlap_chars = 0\n").unwrap();
        assert_eq!(cfg.harness_settings().chunking.overlap_chars, 0);
    }
}
