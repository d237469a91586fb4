//! Document chunking.
//!
//! Bible text is cut into verse chunks that carry book, chapter, and verse
//! metadata so exact reference lookups can find them. Anything else falls
//! back to paragraph-boundary chunks sized by `max_tokens`.
//!
//! # Verse lines
//!
//! Two line shapes are recognised:
//!
//! ```text
//! John 3:16 For God so loved the world, ...
//!
//! Genesis
//! 1:1 In the beginning God created the heaven and the earth.
//! 1:2 And the earth was without form, and void; ...
//! ```
//!
//! A line whose whole text resolves to a book (via the [`BookCatalog`]) sets
//! the book for following `C:V text` lines. `CHAPTER 3` and `PSALM 23` style
//! headings are dropped. A line directly below a verse continues that verse.
//! Other text (a preface, notes after a blank line) becomes untagged
//! paragraph chunks. Stored book labels are the canonical catalog names.
//!
//! # Paragraph algorithm
//!
//! 1. Convert `max_tokens` to `max_chars` using a 4 chars/token ratio.
//! 2. Split text on `\n\n` paragraph boundaries.
//! 3. Accumulate paragraphs until adding the next would exceed `max_chars`,
//!    then flush.
//! 4. Hard-split single paragraphs longer than `max_chars` at the nearest
//!    newline or space.
//! 5. Prefix every chunk after the first with the last `overlap_chars` of
//!    the chunk before it, starting at a word boundary.
//!
//! # Example
//!
//! ```rust
//! use scripture_harness_core::books::BookCatalog;
//! use scripture_harness_core::chunk::{chunk_document, ChunkOptions};
//!
//! let text = "John 3:16 For God so loved the world.\nJohn 3:17 For God sent not his Son.";
//! let chunks = chunk_document("kjv", "john.txt", text, &ChunkOptions::default(), &BookCatalog::standard());
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].metadata.verse_start, Some(17));
//! ```

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::books::BookCatalog;
use crate::models::{PassageChunk, PassageMetadata};

/// Approximate characters-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    /// Upper bound for paragraph chunks.
    pub max_tokens: usize,
    /// Consecutive verses of one chapter grouped into a single chunk.
    pub verses_per_chunk: usize,
    /// Characters of a paragraph chunk repeated at the start of the next.
    pub overlap_chars: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_tokens: 700,
            verses_per_chunk: 1,
            overlap_chars: 200,
        }
    }
}

fn verse_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<book>(?:[1-3]\s*)?[A-Za-z][A-Za-z.' ]*?)\s+)?(?P<chapter>\d{1,3}):(?P<verse>\d{1,3})\s+(?P<text>\S.*)$",
        )
        .expect("verse line pattern is valid")
    })
}

fn division_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?P<word>chapter|psalms?)\s+(?:\d{1,3}|[ivxlc]+)\.?$")
            .expect("division heading pattern is valid")
    })
}

#[derive(Debug)]
struct Verse {
    book: String,
    chapter: u32,
    verse: u32,
    text: String,
}

/// Verse lines plus the prose paragraphs found around them.
#[derive(Debug, Default)]
struct ParsedText {
    verses: Vec<Verse>,
    prose: Vec<String>,
}

/// Chunk a document for `translation_id`.
///
/// Returns verse chunks when the text contains verse lines, paragraph chunks
/// otherwise. Prose around the verses is kept as paragraph chunks. Blank text
/// yields no chunks.
pub fn chunk_document(
    translation_id: &str,
    source: &str,
    text: &str,
    opts: &ChunkOptions,
    catalog: &BookCatalog,
) -> Vec<PassageChunk> {
    let parsed = parse_verses(text, catalog);
    if parsed.verses.is_empty() {
        return chunk_paragraphs(translation_id, source, text, opts);
    }
    let mut chunks = chunk_paragraphs(translation_id, source, &parsed.prose.join("\n\n"), opts);
    chunks.extend(group_verses(
        translation_id,
        source,
        parsed.verses,
        opts.verses_per_chunk.max(1),
    ));
    chunks
}

fn parse_verses(text: &str, catalog: &BookCatalog) -> ParsedText {
    let mut parsed = ParsedText::default();
    let mut heading: Option<String> = None;
    let mut paragraph = String::new();
    // Whether the previous line was part of a verse.
    let mut continues = false;

    let flush = |paragraph: &mut String, prose: &mut Vec<String>| {
        if !paragraph.is_empty() {
            prose.push(std::mem::take(paragraph));
        }
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut paragraph, &mut parsed.prose);
            continues = false;
            continue;
        }

        if let Some(caps) = verse_line().captures(line) {
            let book = match caps.name("book") {
                Some(m) => catalog.resolve(m.as_str()).map(str::to_string),
                None => heading.clone(),
            };
            let chapter = caps["chapter"].parse::<u32>().ok().filter(|c| *c > 0);
            let verse = caps["verse"].parse::<u32>().ok().filter(|v| *v > 0);
            if let (Some(book), Some(chapter), Some(verse)) = (book, chapter, verse) {
                flush(&mut paragraph, &mut parsed.prose);
                parsed.verses.push(Verse {
                    book,
                    chapter,
                    verse,
                    text: caps["text"].trim().to_string(),
                });
                continues = true;
                continue;
            }
        }

        if let Some(caps) = division_heading().captures(line) {
            // "PSALM 23" also names the book; "CHAPTER 3" does not.
            if let Some(book) = catalog.resolve(&caps["word"]) {
                heading = Some(book.to_string());
            }
            flush(&mut paragraph, &mut parsed.prose);
            continues = false;
            continue;
        }

        if let Some(book) = catalog.resolve(line) {
            heading = Some(book.to_string());
            flush(&mut paragraph, &mut parsed.prose);
            continues = false;
            continue;
        }

        if continues {
            if let Some(last) = parsed.verses.last_mut() {
                last.text.push(' ');
                last.text.push_str(line);
                continue;
            }
        }

        if !paragraph.is_empty() {
            paragraph.push('\n');
        }
        paragraph.push_str(line);
    }
    flush(&mut paragraph, &mut parsed.prose);

    parsed
}

fn group_verses(
    translation_id: &str,
    source: &str,
    verses: Vec<Verse>,
    per_chunk: usize,
) -> Vec<PassageChunk> {
    let mut chunks = Vec::new();
    let mut group: Vec<Verse> = Vec::new();

    let flush = |group: &mut Vec<Verse>, chunks: &mut Vec<PassageChunk>| {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            return;
        };
        let metadata = PassageMetadata {
            source: source.to_string(),
            translation_id: translation_id.to_string(),
            book: Some(first.book.clone()),
            chapter: Some(first.chapter),
            verse_start: Some(first.verse),
            verse_end: Some(last.verse.max(first.verse)),
        };
        let content = group
            .iter()
            .map(|v| v.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        chunks.push(make_chunk(&content, metadata));
        group.clear();
    };

    for verse in verses {
        let breaks = match group.last() {
            Some(prev) => {
                prev.book != verse.book
                    || prev.chapter != verse.chapter
                    || verse.verse != prev.verse + 1
                    || group.len() >= per_chunk
            }
            None => false,
        };
        if breaks {
            flush(&mut group, &mut chunks);
        }
        group.push(verse);
    }
    flush(&mut group, &mut chunks);

    chunks
}

/// Split generic text into chunks on paragraph boundaries.
///
/// Chunks carry only `source` and `translation_id` metadata. Uses
/// `max_tokens` and `overlap_chars` from `opts`.
pub fn chunk_paragraphs(
    translation_id: &str,
    source: &str,
    text: &str,
    opts: &ChunkOptions,
) -> Vec<PassageChunk> {
    let max_chars = opts.max_tokens.max(1) * CHARS_PER_TOKEN;
    let metadata = PassageMetadata {
        source: source.to_string(),
        translation_id: translation_id.to_string(),
        ..Default::default()
    };
    let mut pieces: Vec<String> = Vec::new();
    let mut current_buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !current_buf.is_empty() {
            pieces.push(std::mem::take(&mut current_buf));
        }

        if trimmed.len() > max_chars {
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = hard_split_point(remaining, max_chars);
                let piece = remaining[..split_at].trim();
                if !piece.is_empty() {
                    pieces.push(piece.to_string());
                }
                remaining = &remaining[split_at..];
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        pieces.push(current_buf);
    }

    let mut chunks = Vec::with_capacity(pieces.len());
    for (i, piece) in pieces.iter().enumerate() {
        let tail = match i {
            0 => "",
            _ => overlap_tail(&pieces[i - 1], opts.overlap_chars),
        };
        let content = if tail.is_empty() {
            piece.clone()
        } else {
            format!("{} {}", tail, piece)
        };
        chunks.push(make_chunk(&content, metadata.clone()));
    }

    chunks
}

/// The last `overlap_chars` characters of `s`, trimmed forward to the next
/// word so the overlap never starts mid-word.
fn overlap_tail(s: &str, overlap_chars: usize) -> &str {
    if overlap_chars == 0 {
        return "";
    }
    let start = s
        .char_indices()
        .rev()
        .nth(overlap_chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    if start == 0 {
        return s.trim();
    }
    let tail = &s[start..];
    let tail = match tail.find(char::is_whitespace) {
        Some(pos) if !s[..start].ends_with(char::is_whitespace) => &tail[pos..],
        _ => tail,
    };
    tail.trim()
}

/// Byte offset at which to cut `s` so the head fits in `max_chars`.
///
/// Prefers the last newline or space before the limit and always advances
/// by at least one character.
fn hard_split_point(s: &str, max_chars: usize) -> usize {
    if s.len() <= max_chars {
        return s.len();
    }
    let limit = snap_to_char_boundary(s, max_chars);
    let cut = s[..limit]
        .rfind('\n')
        .or_else(|| s[..limit].rfind(' '))
        .map(|pos| pos + 1)
        .unwrap_or(limit);
    if cut == 0 {
        s.char_indices().nth(1).map(|(i, _)| i).unwrap_or(s.len())
    } else {
        cut
    }
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Build a [`PassageChunk`] with a fresh UUID and SHA-256 content hash.
pub fn make_chunk(text: &str, metadata: PassageMetadata) -> PassageChunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    PassageChunk {
        id: Uuid::new_v4().to_string(),
        content: text.to_string(),
        hash,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, opts: ChunkOptions) -> Vec<PassageChunk> {
        chunk_document("kjv", "bible.txt", text, &opts, &BookCatalog::standard())
    }

    fn sized(max_tokens: usize, overlap_chars: usize) -> ChunkOptions {
        ChunkOptions {
            max_tokens,
            overlap_chars,
            ..Default::default()
        }
    }

    #[test]
    fn test_inline_book_verse_lines() {
        let text = "John 3:16 For God so loved the world.\nJohn 3:17 For God sent not his Son.";
        let chunks = chunk(text, ChunkOptions::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.book.as_deref(), Some("John"));
        assert_eq!(chunks[0].metadata.chapter, Some(3));
        assert_eq!(chunks[0].metadata.verse_start, Some(16));
        assert_eq!(chunks[0].metadata.verse_end, Some(16));
        assert_eq!(chunks[0].content, "For God so loved the world.");
        assert_eq!(chunks[0].metadata.translation_id, "kjv");
        assert_eq!(chunks[0].metadata.source, "bible.txt");
    }

    #[test]
    fn test_heading_sets_book() {
        let text = "Psalm\n23:1 The LORD is my shepherd; I shall not want.\n23:2 He maketh me to lie down";
        let chunks = chunk(text, ChunkOptions::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].metadata.book.as_deref(), Some("Psalms"));
        assert_eq!(chunks[1].metadata.verse_start, Some(2));
    }

    #[test]
    fn test_numbered_book_and_continuation_lines() {
        let text = "1 John 4:8 He that loveth not\nknoweth not God; for God is love.";
        let chunks = chunk(text, ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.book.as_deref(), Some("1 John"));
        assert_eq!(
            chunks[0].content,
            "He that loveth not knoweth not God; for God is love."
        );
    }

    #[test]
    fn test_preface_kept_and_chapter_heading_dropped() {
        let text = "Preface to the reader.\n\nJohn\n\
                    2:25 And needed not that any should testify of man.\n\
                    CHAPTER 3\n\
                    3:1 There was a man of the Pharisees, named Nicodemus.";
        let chunks = chunk(text, ChunkOptions::default());
        assert_eq!(chunks.len(), 3);

        assert_eq!(chunks[0].content, "Preface to the reader.");
        assert!(chunks[0].metadata.book.is_none());
        assert!(chunks[0].metadata.chapter.is_none());

        assert_eq!(chunks[1].metadata.verse_start, Some(25));
        assert_eq!(
            chunks[1].content,
            "And needed not that any should testify of man."
        );
        assert_eq!(chunks[2].metadata.book.as_deref(), Some("John"));
        assert_eq!(chunks[2].metadata.chapter, Some(3));
        assert!(chunks[2].content.starts_with("There was a man"));
    }

    #[test]
    fn test_psalm_title_and_footnote_are_prose() {
        let text = "PSALM 23\nA Psalm of David.\n23:1 The LORD is my shepherd; I shall not want.\n\n\
                    Footnote: shepherd imagery recurs in John 10.";
        let chunks = chunk(text, ChunkOptions::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].content,
            "A Psalm of David.\n\nFootnote: shepherd imagery recurs in John 10."
        );
        assert!(chunks[0].metadata.book.is_none());
        assert_eq!(chunks[1].metadata.book.as_deref(), Some("Psalms"));
        assert_eq!(
            chunks[1].content,
            "The LORD is my shepherd; I shall not want."
        );
    }

    #[test]
    fn test_grouping_stays_within_chapter() {
        let text = "Genesis\n1:30 a\n1:31 b\n2:1 c\n2:2 d\n2:3 e";
        let chunks = chunk(
            text,
            ChunkOptions {
                verses_per_chunk: 2,
                ..Default::default()
            },
        );
        let spans: Vec<_> = chunks
            .iter()
            .map(|c| {
                (
                    c.metadata.chapter.unwrap(),
                    c.metadata.verse_start.unwrap(),
                    c.metadata.verse_end.unwrap(),
                )
            })
            .collect();
        assert_eq!(spans, vec![(1, 30, 31), (2, 1, 2), (2, 3, 3)]);
        assert_eq!(chunks[1].content, "c d");
    }

    #[test]
    fn test_generic_document_falls_back_to_paragraphs() {
        let text = "Sermon notes.\n\nLove your neighbour.";
        let chunks = chunk(text, ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].metadata.book.is_none());
        assert!(chunks[0].content.contains("Love your neighbour."));
    }

    #[test]
    fn test_unknown_book_lines_are_not_verses() {
        let chunks = chunk("Meeting 10:30 in the hall", ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].metadata.chapter.is_none());
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(chunk("  \n\n ", ChunkOptions::default()).is_empty());
    }

    #[test]
    fn test_paragraphs_exceed_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = chunk_paragraphs("web", "notes.md", text, &sized(5, 0));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(!c.content.is_empty());
        }
    }

    #[test]
    fn test_paragraph_chunks_overlap() {
        let text = "alpha beta gamma delta epsilon\n\nzeta eta theta iota kappa lambda";
        let chunks = chunk_paragraphs("web", "notes.md", text, &sized(10, 10));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "alpha beta gamma delta epsilon");
        assert_eq!(
            chunks[1].content,
            "epsilon zeta eta theta iota kappa lambda"
        );

        let plain = chunk_paragraphs("web", "notes.md", text, &sized(10, 0));
        assert_eq!(plain[1].content, "zeta eta theta iota kappa lambda");
    }

    #[test]
    fn test_multibyte_hard_split() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let chunks = chunk_paragraphs("web", "box.txt", text, &sized(3, 0));
        assert!(!chunks.is_empty());
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert!(joined.contains("Hello"));
    }

    #[test]
    fn test_hash_is_content_sha256() {
        let a = make_chunk("In the beginning", PassageMetadata::default());
        let b = make_chunk("In the beginning", PassageMetadata::default());
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.id, b.id);
        assert_eq!(a.hash.len(), 64);
    }
}
