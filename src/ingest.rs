//! File and directory ingestion into a translation.
//!
//! A file path is ingested directly. A directory is walked with `walkdir`
//! and filtered by `[ingest] include_globs` / `exclude_globs`; files that
//! cannot be read, decoded, or chunked are skipped with a warning so one bad
//! file does not abort the batch. Embedding or storage failures still abort.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use scripture_harness_core::harness::IngestReport;
use scripture_harness_core::{Error as CoreError, Harness};

use crate::config::IngestConfig;
use crate::extract::{extract_text, DocumentKind};

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub reports: Vec<IngestReport>,
    /// `(source, reason)` for every skipped file.
    pub skipped: Vec<(String, String)>,
}

impl IngestSummary {
    pub fn chunks_added(&self) -> usize {
        self.reports.iter().map(|r| r.chunks_added).sum()
    }

    /// Store count after the last successful file.
    pub fn total_chunks(&self) -> Option<u64> {
        self.reports.last().map(|r| r.total_chunks)
    }
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

/// Files under `root` matching the include globs and none of the excludes,
/// sorted by relative path. Each entry is `(absolute, relative)`.
pub fn collect_files(root: &Path, config: &IngestConfig) -> Result<Vec<(PathBuf, String)>> {
    let include_set = build_globset(&config.include_globs)?;

    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        if exclude_set.is_match(&relative) || !include_set.is_match(&relative) {
            continue;
        }
        files.push((path.to_path_buf(), relative));
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

/// Read and extract one file, enforcing the upload size limit.
pub fn read_document(path: &Path, max_bytes: u64) -> Result<String> {
    let kind = DocumentKind::from_path(path)?;
    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    if size > max_bytes {
        bail!(
            "{} is {} bytes, over the {} byte upload limit",
            path.display(),
            size,
            max_bytes
        );
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(extract_text(&bytes, kind)?)
}

/// Ingest `path` (file or directory) into `translation_id`.
pub async fn ingest_path(
    harness: &Harness,
    translation_id: &str,
    path: &Path,
    config: &IngestConfig,
) -> Result<IngestSummary> {
    if !harness.registry().contains(translation_id) {
        return Err(CoreError::NotFound(translation_id.to_string()).into());
    }
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    let max_bytes = config.max_upload_bytes();
    let mut summary = IngestSummary::default();

    if path.is_file() {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let text = read_document(path, max_bytes)?;
        let report = harness.add_document(translation_id, &source, &text).await?;
        summary.reports.push(report);
        return Ok(summary);
    }

    let files = collect_files(path, config)?;
    info!(translation = translation_id, files = files.len(), root = %path.display(), "ingesting directory");

    for (file, source) in files {
        let text = match read_document(&file, max_bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(source = %source, error = %e, "skipping file");
                summary.skipped.push((source, e.to_string()));
                continue;
            }
        };
        match harness.add_document(translation_id, &source, &text).await {
            Ok(report) => summary.reports.push(report),
            Err(CoreError::EmptyDocument(_)) => {
                warn!(source = %source, "skipping file with no passages");
                summary
                    .skipped
                    .push((source, "no passages".to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}
