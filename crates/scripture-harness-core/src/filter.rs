//! Typed metadata filters for exact passage lookups.
//!
//! A [`MetadataFilter`] is a conjunction of `(field, op, value)` clauses.
//! Store implementations translate it into their own query mechanism (SQL
//! `WHERE` clauses, in-memory predicates); [`MetadataFilter::matches`] is the
//! reference semantics.

use serde::Serialize;

use crate::models::PassageMetadata;
use crate::reference::{VerseReference, VerseSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Source,
    TranslationId,
    Book,
    Chapter,
    VerseStart,
    VerseEnd,
}

impl MetadataField {
    /// Column / key name used by stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Source => "source",
            MetadataField::TranslationId => "translation_id",
            MetadataField::Book => "book",
            MetadataField::Chapter => "chapter",
            MetadataField::VerseStart => "verse_start",
            MetadataField::VerseEnd => "verse_end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Int(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterClause {
    pub field: MetadataField,
    pub op: FilterOp,
    pub value: FilterValue,
}

/// Conjunctive metadata filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataFilter {
    pub clauses: Vec<FilterClause>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq_text(mut self, field: MetadataField, value: &str) -> Self {
        self.clauses.push(FilterClause {
            field,
            op: FilterOp::Eq,
            value: FilterValue::Text(value.to_string()),
        });
        self
    }

    pub fn int(mut self, field: MetadataField, op: FilterOp, value: u32) -> Self {
        self.clauses.push(FilterClause {
            field,
            op,
            value: FilterValue::Int(value),
        });
        self
    }

    /// `book == label AND chapter == ref.chapter`, narrowed to
    /// `verse_start >= start AND verse_end <= end` for ranges.
    ///
    /// A chunk without `verse_end` is compared on its `verse_start`.
    pub fn for_reference(book_label: &str, reference: &VerseReference) -> Self {
        let filter = Self::new()
            .eq_text(MetadataField::Book, book_label)
            .int(MetadataField::Chapter, FilterOp::Eq, reference.chapter);
        match reference.span {
            VerseSpan::WholeChapter => filter,
            VerseSpan::Range { start, end } => filter
                .int(MetadataField::VerseStart, FilterOp::Gte, start)
                .int(MetadataField::VerseEnd, FilterOp::Lte, end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True if `meta` satisfies every clause. A missing field never matches.
    pub fn matches(&self, meta: &PassageMetadata) -> bool {
        self.clauses.iter().all(|clause| clause.matches(meta))
    }
}

impl FilterClause {
    pub fn matches(&self, meta: &PassageMetadata) -> bool {
        match (&self.value, self.field) {
            (FilterValue::Text(v), MetadataField::Source) => self.cmp_text(&meta.source, v),
            (FilterValue::Text(v), MetadataField::TranslationId) => {
                self.cmp_text(&meta.translation_id, v)
            }
            (FilterValue::Text(v), MetadataField::Book) => {
                meta.book.as_deref().is_some_and(|b| self.cmp_text(b, v))
            }
            (FilterValue::Int(v), MetadataField::Chapter) => {
                meta.chapter.is_some_and(|c| self.cmp_int(c, *v))
            }
            (FilterValue::Int(v), MetadataField::VerseStart) => {
                meta.verse_start.is_some_and(|s| self.cmp_int(s, *v))
            }
            (FilterValue::Int(v), MetadataField::VerseEnd) => meta
                .verse_bounds()
                .is_some_and(|(_, e)| self.cmp_int(e, *v)),
            _ => false,
        }
    }

    fn cmp_text(&self, actual: &str, expected: &str) -> bool {
        match self.op {
            FilterOp::Eq => actual == expected,
            FilterOp::Gte => actual >= expected,
            FilterOp::Lte => actual <= expected,
        }
    }

    fn cmp_int(&self, actual: u32, expected: u32) -> bool {
        match self.op {
            FilterOp::Eq => actual == expected,
            FilterOp::Gte => actual >= expected,
            FilterOp::Lte => actual <= expected,
        }
    }
}
