//! Verse-reference parsing.
//!
//! [`ReferenceParser`] runs an ordered list of matcher rules against a free
//! text query and returns the first [`VerseReference`] whose book resolves
//! through the [`BookCatalog`]. Rules go from most to least specific:
//!
//! | # | Rule | Example |
//! |---|------|---------|
//! | 1 | colon | `John 3:16`, `John 3:16-18` |
//! | 2 | natural singular | `John chapter 3 verse 16`, `John 3 verse 16 to 18` |
//! | 3 | natural plural | `John 3 verses 16 to 18`, `John 3 verses 16-18` |
//! | 4 | spaced numeric | `John 3 16`, `John 3 16-18` |
//! | 5 | whole chapter | `John 10`, `Psalm chapter 23` |
//!
//! A query that matches no rule yields `None`; callers fall back to semantic
//! search.

use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::books::BookCatalog;

/// The verse span of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerseSpan {
    /// The whole chapter ("John 10").
    WholeChapter,
    /// An inclusive verse range; `start <= end`.
    Range { start: u32, end: u32 },
}

impl VerseSpan {
    /// Build a range, swapping reversed bounds.
    pub fn range(start: u32, end: u32) -> Self {
        if end < start {
            VerseSpan::Range { start: end, end: start }
        } else {
            VerseSpan::Range { start, end }
        }
    }

    /// True if `[start, end]` lies entirely inside this span.
    pub fn contains(&self, start: u32, end: u32) -> bool {
        match *self {
            VerseSpan::WholeChapter => true,
            VerseSpan::Range { start: s, end: e } => start >= s && end <= e,
        }
    }
}

/// A parsed (book, chapter, verse span) intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseReference {
    /// Canonical book name from the catalog.
    pub book: String,
    /// The book exactly as the user wrote it.
    pub book_as_written: String,
    pub chapter: u32,
    pub span: VerseSpan,
    /// Display form, e.g. `John 3:16-18` or `John 10`.
    pub reference: String,
}

impl VerseReference {
    pub fn new(book: &str, book_as_written: &str, chapter: u32, span: VerseSpan) -> Self {
        let reference = match span {
            VerseSpan::WholeChapter => format!("{} {}", book, chapter),
            VerseSpan::Range { start, end } if start == end => {
                format!("{} {}:{}", book, chapter, start)
            }
            VerseSpan::Range { start, end } => format!("{} {}:{}-{}", book, chapter, start, end),
        };
        Self {
            book: book.to_string(),
            book_as_written: book_as_written.to_string(),
            chapter,
            span,
            reference,
        }
    }

    /// First verse covered; `1` for a whole chapter.
    pub fn verse_start(&self) -> u32 {
        match self.span {
            VerseSpan::WholeChapter => 1,
            VerseSpan::Range { start, .. } => start,
        }
    }

    /// Last verse covered, or `None` for "rest of chapter".
    pub fn verse_end(&self) -> Option<u32> {
        match self.span {
            VerseSpan::WholeChapter => None,
            VerseSpan::Range { end, .. } => Some(end),
        }
    }

    pub fn is_whole_chapter(&self) -> bool {
        matches!(self.span, VerseSpan::WholeChapter)
    }
}

impl fmt::Display for VerseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

/// Which rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Colon,
    NaturalSingular,
    NaturalPlural,
    SpacedNumeric,
    WholeChapter,
}

#[derive(Debug, Clone)]
struct MatcherRule {
    kind: RuleKind,
    pattern: Regex,
}

/// Book prefix shared by every rule: optional leading numeral and up to
/// five words. The catalog later picks the book out of the trailing words.
const BOOK: &str = r"\b(?P<book>(?:[1-3]\s*)?[a-z]+(?:\s+[a-z']+){0,4})";

/// Text right after a whole-chapter match that means a verse was intended.
const VERSE_MARKER: &str = r"^\s*(?::|verses?\b|v\b|vv\b|\d)";

/// Words a greedy book capture may swallow before the chapter number.
const CHAPTER_WORDS: [&str; 3] = ["chapter", "chap", "ch"];

/// Ordered verse-reference matcher.
#[derive(Debug, Clone)]
pub struct ReferenceParser {
    rules: Vec<MatcherRule>,
    verse_marker: Regex,
    catalog: BookCatalog,
}

impl ReferenceParser {
    pub fn new(catalog: BookCatalog) -> Self {
        let rule = |kind, body: &str| MatcherRule {
            kind,
            pattern: Regex::new(&format!("(?i){}{}", BOOK, body))
                .expect("reference rule pattern is valid"),
        };

        let rules = vec![
            rule(
                RuleKind::Colon,
                r"\s+(?P<chapter>\d+)\s*:\s*(?P<start>\d+)(?:\s*[-–]\s*(?P<end>\d+))?",
            ),
            rule(
                RuleKind::NaturalSingular,
                r"\s+(?:chapter\s+)?(?P<chapter>\d+),?\s+verse\s+(?P<start>\d+)(?:\s*(?:to|through|-|–)\s*(?P<end>\d+))?",
            ),
            rule(
                RuleKind::NaturalPlural,
                r"\s+(?:chapter\s+)?(?P<chapter>\d+),?\s+verses\s+(?P<start>\d+)(?:\s*(?:to|through|and|-|–)\s*|\s+)(?P<end>\d+)",
            ),
            rule(
                RuleKind::SpacedNumeric,
                r"\s+(?P<chapter>\d+)\s+(?P<start>\d+)(?:\s*[-–]\s*(?P<end>\d+))?\b",
            ),
            rule(
                RuleKind::WholeChapter,
                r"\s+(?:chapter\s+)?(?P<chapter>\d+)\b",
            ),
        ];

        Self {
            rules,
            verse_marker: Regex::new(VERSE_MARKER).expect("verse marker pattern is valid"),
            catalog,
        }
    }

    pub fn catalog(&self) -> &BookCatalog {
        &self.catalog
    }

    /// Parse `query`, returning the first rule match with a known book.
    pub fn parse(&self, query: &str) -> Option<VerseReference> {
        self.parse_with_rule(query).map(|(reference, _)| reference)
    }

    /// Like [`parse`](Self::parse) but also reports which rule matched.
    pub fn parse_with_rule(&self, query: &str) -> Option<(VerseReference, RuleKind)> {
        for rule in &self.rules {
            if let Some(reference) = self.match_rule(rule, query) {
                tracing::debug!(rule = ?rule.kind, reference = %reference, "parsed verse reference");
                return Some((reference, rule.kind));
            }
        }
        None
    }

    /// Scan every word start so a failed book ("what is in 1") does not hide
    /// a later one ("1 John 4").
    fn match_rule(&self, rule: &MatcherRule, query: &str) -> Option<VerseReference> {
        let mut pos = 0;
        while pos <= query.len() {
            let caps = rule.pattern.captures_at(query, pos)?;
            let whole = caps.get(0)?;

            if let Some(reference) = self.build(rule.kind, &caps, &query[whole.end()..]) {
                return Some(reference);
            }

            pos = next_word_start(query, whole.start());
        }
        None
    }

    fn build(&self, kind: RuleKind, caps: &Captures<'_>, rest: &str) -> Option<VerseReference> {
        if kind == RuleKind::WholeChapter && self.verse_marker.is_match(rest) {
            return None;
        }

        let raw_book = caps.name("book")?.as_str();
        let mut words: Vec<&str> = raw_book.split_whitespace().collect();
        while words
            .last()
            .is_some_and(|w| CHAPTER_WORDS.contains(&w.to_lowercase().as_str()))
        {
            words.pop();
        }
        let canonical = self.catalog.resolve_suffix(&words)?;
        let written = written_suffix(&words, canonical, &self.catalog);

        let chapter: u32 = caps.name("chapter")?.as_str().parse().ok()?;
        if chapter == 0 {
            return None;
        }

        let span = match kind {
            RuleKind::WholeChapter => VerseSpan::WholeChapter,
            _ => {
                let start: u32 = caps.name("start")?.as_str().parse().ok()?;
                let end: u32 = match caps.name("end") {
                    Some(m) => m.as_str().parse().ok()?,
                    None => start,
                };
                if start == 0 {
                    return None;
                }
                VerseSpan::range(start, end)
            }
        };

        Some(VerseReference::new(canonical, &written, chapter, span))
    }
}

impl Default for ReferenceParser {
    fn default() -> Self {
        Self::new(BookCatalog::standard())
    }
}

/// Recover the words the user actually typed for the resolved book.
fn written_suffix(words: &[&str], canonical: &str, catalog: &BookCatalog) -> String {
    (1..=words.len())
        .rev()
        .map(|n| words[words.len() - n..].join(" "))
        .find(|candidate| catalog.resolve(candidate) == Some(canonical))
        .unwrap_or_else(|| canonical.to_string())
}

/// Byte offset of the first word after the one containing `from`.
fn next_word_start(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i == from {
        text.len() + 1
    } else {
        i
    }
}

/// Parse with the shared default parser (standard catalog).
pub fn parse_reference(query: &str) -> Option<VerseReference> {
    static PARSER: OnceLock<ReferenceParser> = OnceLock::new();
    PARSER.get_or_init(ReferenceParser::default).parse(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(q: &str) -> VerseReference {
        parse_reference(q).unwrap_or_else(|| panic!("expected a reference in {:?}", q))
    }

    #[test]
    fn test_equivalent_forms_share_core() {
        for q in [
            "John 3:16",
            "John 3:16-18",
            "John chapter 3 verse 16",
            "John 3 verses 16 to 18",
            "John 3 16",
        ] {
            let r = parse(q);
            assert_eq!(r.book, "John", "{}", q);
            assert_eq!(r.chapter, 3, "{}", q);
            assert_eq!(r.verse_start(), 16, "{}", q);
        }
        assert_eq!(parse("John 3:16").verse_end(), Some(16));
        assert_eq!(parse("John 3:16-18").verse_end(), Some(18));
        assert_eq!(parse("John chapter 3 verse 16").verse_end(), Some(16));
        assert_eq!(parse("John 3 verses 16 to 18").verse_end(), Some(18));
        assert_eq!(parse("John 3 16").verse_end(), Some(16));
    }

    #[test]
    fn test_rule_order() {
        let parser = ReferenceParser::default();
        let kind = |q| parser.parse_with_rule(q).map(|(_, k)| k);
        assert_eq!(kind("John 3:16"), Some(RuleKind::Colon));
        assert_eq!(kind("John chapter 3 verse 16"), Some(RuleKind::NaturalSingular));
        assert_eq!(kind("John 3 verses 16 to 18"), Some(RuleKind::NaturalPlural));
        assert_eq!(kind("John 3 16"), Some(RuleKind::SpacedNumeric));
        assert_eq!(kind("John 10"), Some(RuleKind::WholeChapter));
    }

    #[test]
    fn test_whole_chapter_is_distinct_from_first_verse() {
        let chapter = parse("John 10");
        assert_eq!(chapter.span, VerseSpan::WholeChapter);
        assert_eq!(chapter.verse_start(), 1);
        assert_eq!(chapter.verse_end(), None);
        assert_eq!(chapter.reference, "John 10");

        let verse = parse("John 10:1");
        assert_eq!(verse.span, VerseSpan::Range { start: 1, end: 1 });
        assert_ne!(chapter, verse);
    }

    #[test]
    fn test_numbered_and_multi_word_books() {
        let r = parse("what does 1 John 4:8 say about love?");
        assert_eq!(r.book, "1 John");
        assert_eq!((r.chapter, r.verse_start()), (4, 8));

        let r = parse("Song of Solomon 2:1");
        assert_eq!(r.book, "Song of Solomon");

        let r = parse("What is in 1 John 4");
        assert_eq!(r.book, "1 John");
        assert!(r.is_whole_chapter());

        let r = parse("first corinthians 13:4-7");
        assert_eq!(r.book, "1 Corinthians");
        assert_eq!(r.reference, "1 Corinthians 13:4-7");
    }

    #[test]
    fn test_case_insensitive_and_embedded() {
        let r = parse("explain JOHN 3:16 please");
        assert_eq!(r.book, "John");
        assert_eq!(r.book_as_written, "JOHN");

        let r = parse("What does the Gospel of John 3:16 say?");
        assert_eq!(r.book, "John");
        assert_eq!(r.book_as_written, "Gospel of John");
    }

    #[test]
    fn test_chapter_keyword_forms() {
        let r = parse("Psalm chapter 23");
        assert_eq!(r.book, "Psalms");
        assert_eq!(r.chapter, 23);
        assert!(r.is_whole_chapter());

        let r = parse("Genesis chapter 1 verse 1 through 3");
        assert_eq!((r.verse_start(), r.verse_end()), (1, Some(3)));
    }

    #[test]
    fn test_reversed_range_is_normalised() {
        let r = parse("John 3:18-16");
        assert_eq!(r.span, VerseSpan::Range { start: 16, end: 18 });
    }

    #[test]
    fn test_no_reference() {
        assert!(parse_reference("What is grace?").is_none());
        assert!(parse_reference("Tell me about love and forgiveness").is_none());
        assert!(parse_reference("Top 10 verses").is_none());
        assert!(parse_reference("").is_none());
    }

    #[test]
    fn test_incomplete_colon_is_not_a_chapter() {
        assert!(parse_reference("John 3:").is_none());
    }

    #[test]
    fn test_span_contains() {
        let span = VerseSpan::range(16, 18);
        assert!(span.contains(16, 16));
        assert!(span.contains(16, 18));
        assert!(!span.contains(15, 16));
        assert!(!span.contains(18, 19));
        assert!(VerseSpan::WholeChapter.contains(1, 200));
    }
}
