//! Ingestion of PDF, DOCX and legacy-encoded text files.

use std::fs;
use std::sync::Arc;

use scripture_harness::app::{self, App};
use scripture_harness::config::parse_config;
use scripture_harness_core::embedding::HashingEmbedder;
use scripture_harness_core::generate::StaticGenerator;
use scripture_harness::extract::{extract_text, DocumentKind};
use scripture_harness::ingest::ingest_path;
use tempfile::TempDir;

/// Minimal valid PDF showing `phrase`, with correct xref offsets so
/// pdf-extract can parse it.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Minimal docx with one `w:p` per entry of `paragraphs`.
fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

async fn open_app(tmp: &TempDir, extra: &str) -> App {
    let config = parse_config(&format!(
        "[db]\npath = \"{}/scripture.sqlite\"\n{}",
        tmp.path().display(),
        extra
    ))
    .unwrap();
    app::open_with(
        &config,
        Arc::new(HashingEmbedder::new(64)),
        Arc::new(StaticGenerator::failing()),
    )
    .await
    .unwrap()
}

#[test]
fn test_pdf_text_is_extracted() {
    let text = extract_text(&minimal_pdf_with_phrase("the good shepherd"), DocumentKind::Pdf)
        .unwrap();
    assert!(text.contains("the good shepherd"), "got: {:?}", text);
}

#[tokio::test]
async fn test_docx_paragraphs_become_verse_chunks() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ruth.docx");
    fs::write(
        &path,
        minimal_docx(&[
            "Ruth",
            "1:16 Intreat me not to leave thee.",
            "1:17 Where thou diest, will I die.",
        ]),
    )
    .unwrap();

    let app = open_app(&tmp, "").await;
    app.harness.registry().create("KJV", "KJV", "").await.unwrap();
    let summary = ingest_path(&app.harness, "KJV", &path, &Default::default())
        .await
        .unwrap();
    assert_eq!(summary.chunks_added(), 2);
    assert_eq!(summary.reports[0].source, "ruth.docx");

    let store = app.harness.registry().open_store("KJV").await.unwrap();
    let passages = app
        .harness
        .retriever()
        .retrieve(Some(store.as_ref()), "Ruth 1:17", 3)
        .await
        .unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].content, "Where thou diest, will I die.");
    assert_eq!(passages[0].metadata.book.as_deref(), Some("Ruth"));
}

#[tokio::test]
async fn test_directory_skips_bad_and_oversized_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("texts");
    fs::create_dir_all(&dir).unwrap();
    // Latin-1 encoded accents.
    fs::write(
        dir.join("genesis.txt"),
        b"Genesis 1:1 En el principio cre\xf3 Dios los cielos y la tierra.\n",
    )
    .unwrap();
    fs::write(dir.join("broken.docx"), b"not a zip archive").unwrap();
    fs::write(dir.join("big.txt"), "John 1:1 word ".repeat(100_000)).unwrap();
    fs::write(dir.join("blank.md"), "\n\n   \n").unwrap();

    let app = open_app(&tmp, "").await;
    app.harness.registry().create("RVR", "Reina-Valera", "").await.unwrap();
    let config = scripture_harness::config::IngestConfig {
        max_upload_mb: 1,
        ..Default::default()
    };
    let summary = ingest_path(&app.harness, "RVR", &dir, &config)
        .await
        .unwrap();

    let ingested: Vec<&str> = summary.reports.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(ingested, vec!["genesis.txt"]);
    let mut skipped: Vec<&str> = summary.skipped.iter().map(|(s, _)| s.as_str()).collect();
    skipped.sort_unstable();
    assert_eq!(skipped, vec!["big.txt", "blank.md", "broken.docx"]);

    let store = app.harness.registry().open_store("RVR").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(app.harness.registry().get("RVR").unwrap().chunk_count, 1);

    let passages = app
        .harness
        .retriever()
        .retrieve(Some(store.as_ref()), "Genesis 1:1", 3)
        .await
        .unwrap();
    assert!(passages[0].content.contains("creó Dios"));
}
