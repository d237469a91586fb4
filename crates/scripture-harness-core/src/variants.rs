//! Spelling variants of a book name for exact metadata lookups.
//!
//! Stored passages carry whatever book label the ingested text used
//! ("Psalm" vs "Psalms", "The Gospel of John", "JOHN"). Exact lookups try
//! each variant in turn and stop at the first one that hits. The table is
//! rule-based and can be extended per deployment.

use std::collections::HashMap;

use crate::books::{split_numbered, GOSPELS};
use crate::reference::VerseReference;

/// Extensible table of book-name variants.
#[derive(Debug, Clone)]
pub struct BookVariants {
    /// Extra labels per canonical book, tried after the built-in rules.
    extra: HashMap<String, Vec<String>>,
    gospel_forms: bool,
    case_forms: bool,
}

impl Default for BookVariants {
    fn default() -> Self {
        let mut variants = Self {
            extra: HashMap::new(),
            gospel_forms: true,
            case_forms: true,
        };
        variants.add("Psalms", "Psalm");
        variants.add("Song of Solomon", "Song of Songs");
        variants.add("Revelation", "Revelation of John");
        variants.add("Revelation", "Revelations");
        variants.add("Acts", "Acts of the Apostles");
        variants
    }
}

impl BookVariants {
    /// A table with only the literal and canonical spellings.
    pub fn minimal() -> Self {
        Self {
            extra: HashMap::new(),
            gospel_forms: false,
            case_forms: false,
        }
    }

    /// Register another stored label for `canonical`.
    pub fn add(&mut self, canonical: &str, label: &str) {
        self.extra
            .entry(canonical.to_string())
            .or_default()
            .push(label.to_string());
    }

    pub fn with(mut self, canonical: &str, label: &str) -> Self {
        self.add(canonical, label);
        self
    }

    /// Ordered, de-duplicated labels to try for `reference`.
    ///
    /// Order: canonical name, as written, registered extras, roman/ordinal
    /// forms of numbered books, Gospel phrasings, then case variants of
    /// everything before.
    pub fn for_reference(&self, reference: &VerseReference) -> Vec<String> {
        let canonical = reference.book.as_str();
        let mut out: Vec<String> = Vec::new();
        let push = |label: String, out: &mut Vec<String>| {
            if !label.is_empty() && !out.contains(&label) {
                out.push(label);
            }
        };

        push(canonical.to_string(), &mut out);
        push(reference.book_as_written.trim().to_string(), &mut out);

        if let Some(extra) = self.extra.get(canonical) {
            for label in extra {
                push(label.clone(), &mut out);
            }
        }

        if let Some((number, base)) = split_numbered(canonical) {
            let roman = ["I", "II", "III"][number - 1];
            push(format!("{} {}", roman, base), &mut out);
            push(format!("{}{}", number, base), &mut out);
        }

        if self.gospel_forms && GOSPELS.contains(&canonical) {
            push(format!("Gospel of {}", canonical), &mut out);
            push(format!("The Gospel of {}", canonical), &mut out);
            push(format!("The Gospel According to {}", canonical), &mut out);
            push(format!("{}'s Gospel", canonical), &mut out);
        }

        if self.case_forms {
            let base: Vec<String> = out.clone();
            for label in base {
                push(label.to_uppercase(), &mut out);
                push(label.to_lowercase(), &mut out);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::parse_reference;

    #[test]
    fn test_gospel_variants() {
        let r = parse_reference("john 3:16").unwrap();
        let v = BookVariants::default().for_reference(&r);
        assert_eq!(v[0], "John");
        assert_eq!(v[1], "john");
        assert!(v.contains(&"Gospel of John".to_string()));
        assert!(v.contains(&"John's Gospel".to_string()));
        assert!(v.contains(&"JOHN".to_string()));
    }

    #[test]
    fn test_non_gospel_books_get_no_gospel_forms() {
        let r = parse_reference("Psalm 23:1").unwrap();
        let v = BookVariants::default().for_reference(&r);
        assert_eq!(v[0], "Psalms");
        assert!(v.contains(&"Psalm".to_string()));
        assert!(!v.iter().any(|l| l.contains("Gospel")));
    }

    #[test]
    fn test_numbered_book_forms_and_dedup() {
        let r = parse_reference("1 John 4:8").unwrap();
        let v = BookVariants::default().for_reference(&r);
        assert!(v.contains(&"I John".to_string()));
        assert!(v.contains(&"1John".to_string()));
        let mut sorted = v.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), v.len());
    }

    #[test]
    fn test_extension() {
        let r = parse_reference("Genesis 1:1").unwrap();
        let v = BookVariants::minimal()
            .with("Genesis", "1 Mose")
            .for_reference(&r);
        assert_eq!(v, vec!["Genesis".to_string(), "1 Mose".to_string()]);
    }
}
