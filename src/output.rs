//! Human-readable and JSON rendering of CLI results.

use scripture_harness_core::compare::{Cell, ComparisonOutcome};
use scripture_harness_core::harness::{AskResponse, IngestReport};
use scripture_harness_core::models::{MatchKind, Translation};

use crate::ingest::IngestSummary;

pub fn render_ask(response: &AskResponse) -> String {
    let mut out = String::new();
    out.push_str(&format!("[{}] {}\n\n", response.translation_id, response.question));
    out.push_str(&response.answer);
    out.push('\n');

    if let Some(sources) = &response.sources {
        out.push_str(&format!("\nSources ({}):\n", response.num_chunks_used));
        for (i, source) in sources.iter().enumerate() {
            let label = source
                .metadata
                .label()
                .unwrap_or_else(|| source.metadata.source.clone());
            let kind = match source.kind {
                MatchKind::Exact => "exact",
                MatchKind::Semantic => "semantic",
            };
            out.push_str(&format!(
                "{}. {} ({}, {:.2})\n   {}\n",
                i + 1,
                label,
                kind,
                source.score,
                source.content.replace('\n', " ")
            ));
        }
    }
    out
}

pub fn render_comparison(outcome: &ComparisonOutcome) -> String {
    let comparison = &outcome.comparison;
    let mut out = String::new();
    out.push_str(&format!(
        "Comparison of \"{}\" across {}\n",
        comparison.query,
        comparison.translations.join(", ")
    ));

    if comparison.rows.is_empty() {
        out.push_str("\nNo passages found.\n");
    }
    for row in &comparison.rows {
        out.push_str(&format!("\n{}\n", row.reference));
        for entry in &row.entries {
            let text = match &entry.cell {
                Cell::Found { content, .. } => content.clone(),
                Cell::NotFound => "(not found)".to_string(),
                Cell::Error { message } => format!("(error: {})", message),
            };
            out.push_str(&format!("  {:<8} {}\n", entry.translation_id, text));
        }
    }

    out.push_str("\nSummary:\n");
    match &outcome.summary {
        Ok(summary) => out.push_str(summary),
        Err(e) => out.push_str(&format!("(unavailable: {})", e)),
    }
    out.push('\n');
    out
}

/// The comparison with `summary` or `summary_error` attached.
pub fn comparison_json(outcome: &ComparisonOutcome) -> serde_json::Result<serde_json::Value> {
    let mut value = serde_json::to_value(&outcome.comparison)?;
    if let Some(obj) = value.as_object_mut() {
        match &outcome.summary {
            Ok(summary) => {
                obj.insert("summary".into(), summary.clone().into());
            }
            Err(e) => {
                obj.insert("summary".into(), serde_json::Value::Null);
                obj.insert("summary_error".into(), e.to_string().into());
            }
        }
    }
    Ok(value)
}

pub fn render_translations(translations: &[Translation], current: Option<&str>) -> String {
    if translations.is_empty() {
        return "No translations registered.\n".to_string();
    }
    let mut out = format!(
        "  {:<12} {:<28} {:>8}  {}\n",
        "ID", "NAME", "CHUNKS", "CREATED"
    );
    for t in translations {
        let marker = if Some(t.id.as_str()) == current { "*" } else { " " };
        out.push_str(&format!(
            "{} {:<12} {:<28} {:>8}  {}\n",
            marker,
            t.id,
            t.name,
            t.chunk_count,
            t.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    out
}

pub fn render_ingest(summary: &IngestSummary) -> String {
    let mut out = String::new();
    for IngestReport {
        source,
        chunks_added,
        ..
    } in &summary.reports
    {
        out.push_str(&format!("  {:<40} {:>6} chunks\n", source, chunks_added));
    }
    for (source, reason) in &summary.skipped {
        out.push_str(&format!("  {:<40} skipped: {}\n", source, reason));
    }
    out.push_str(&format!(
        "files: {}  skipped: {}  chunks added: {}",
        summary.reports.len(),
        summary.skipped.len(),
        summary.chunks_added()
    ));
    if let Some(total) = summary.total_chunks() {
        out.push_str(&format!("  total: {}", total));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scripture_harness_core::compare::{ComparisonEntry, ComparisonResult, ComparisonRow, ComparisonStrategy};
    use scripture_harness_core::Error;

    fn outcome(summary: scripture_harness_core::Result<String>) -> ComparisonOutcome {
        ComparisonOutcome {
            comparison: ComparisonResult {
                query: "John 3:16".into(),
                strategy: ComparisonStrategy::Exact,
                translations: vec!["KJV".into(), "WEB".into()],
                rows: vec![ComparisonRow {
                    reference: "John 3:16".into(),
                    entries: vec![
                        ComparisonEntry {
                            translation_id: "KJV".into(),
                            cell: Cell::Found {
                                content: "For God so loved the world".into(),
                                reference: Some("John 3:16".into()),
                            },
                        },
                        ComparisonEntry {
                            translation_id: "WEB".into(),
                            cell: Cell::NotFound,
                        },
                    ],
                }],
            },
            summary,
        }
    }

    #[test]
    fn test_render_comparison_marks_missing_cells() {
        let text = render_comparison(&outcome(Ok("Only KJV has it.".into())));
        assert!(text.contains("KJV      For God so loved the world"));
        assert!(text.contains("WEB      (not found)"));
        assert!(text.ends_with("Only KJV has it.\n"));
    }

    #[test]
    fn test_comparison_json_keeps_rows_when_summary_fails() {
        let failed = outcome(Err(Error::Upstream(anyhow::anyhow!("model down"))));
        let json = comparison_json(&failed).unwrap();
        assert!(json["summary"].is_null());
        assert!(json["summary_error"].as_str().unwrap().contains("model down"));
        assert_eq!(json["strategy"], "exact");
        assert_eq!(json["rows"][0]["entries"][0]["status"], "found");
        assert_eq!(json["rows"][0]["entries"][1]["status"], "not_found");
    }

    #[test]
    fn test_render_translations_marks_current() {
        let list = vec![
            Translation::new("KJV", "King James Version", ""),
            Translation::new("WEB", "World English Bible", ""),
        ];
        let text = render_translations(&list, Some("WEB"));
        assert!(text.contains("* WEB"));
        assert!(text.contains("  KJV"));
        assert_eq!(render_translations(&[], None), "No translations registered.\n");
    }
}
