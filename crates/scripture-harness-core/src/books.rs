//! Book catalog: canonical names of the 66 books plus accepted spellings.
//!
//! The catalog resolves free text such as `"1 john"`, `"First John"`,
//! `"Ps"`, or `"the Gospel of Mark"` to a canonical book name. It is a
//! plain lookup table, so callers can register extra aliases for
//! translations that use other spellings.

use std::collections::HashMap;

/// Canonical book names in canonical order.
pub const CANONICAL_BOOKS: [&str; 66] = [
    "Genesis",
    "Exodus",
    "Leviticus",
    "Numbers",
    "Deuteronomy",
    "Joshua",
    "Judges",
    "Ruth",
    "1 Samuel",
    "2 Samuel",
    "1 Kings",
    "2 Kings",
    "1 Chronicles",
    "2 Chronicles",
    "Ezra",
    "Nehemiah",
    "Esther",
    "Job",
    "Psalms",
    "Proverbs",
    "Ecclesiastes",
    "Song of Solomon",
    "Isaiah",
    "Jeremiah",
    "Lamentations",
    "Ezekiel",
    "Daniel",
    "Hosea",
    "Joel",
    "Amos",
    "Obadiah",
    "Jonah",
    "Micah",
    "Nahum",
    "Habakkuk",
    "Zephaniah",
    "Haggai",
    "Zechariah",
    "Malachi",
    "Matthew",
    "Mark",
    "Luke",
    "John",
    "Acts",
    "Romans",
    "1 Corinthians",
    "2 Corinthians",
    "Galatians",
    "Ephesians",
    "Philippians",
    "Colossians",
    "1 Thessalonians",
    "2 Thessalonians",
    "1 Timothy",
    "2 Timothy",
    "Titus",
    "Philemon",
    "Hebrews",
    "James",
    "1 Peter",
    "2 Peter",
    "1 John",
    "2 John",
    "3 John",
    "Jude",
    "Revelation",
];

/// The four Gospels, which are also written "Gospel of X" / "X's Gospel".
pub const GOSPELS: [&str; 4] = ["Matthew", "Mark", "Luke", "John"];

/// Extra spellings for unnumbered books (alias, canonical).
const ALIASES: &[(&str, &str)] = &[
    ("gen", "Genesis"),
    ("ex", "Exodus"),
    ("exod", "Exodus"),
    ("lev", "Leviticus"),
    ("num", "Numbers"),
    ("deut", "Deuteronomy"),
    ("josh", "Joshua"),
    ("judg", "Judges"),
    ("neh", "Nehemiah"),
    ("esth", "Esther"),
    ("psalm", "Psalms"),
    ("ps", "Psalms"),
    ("psa", "Psalms"),
    ("prov", "Proverbs"),
    ("eccl", "Ecclesiastes"),
    ("eccles", "Ecclesiastes"),
    ("qoheleth", "Ecclesiastes"),
    ("song of songs", "Song of Solomon"),
    ("canticles", "Song of Solomon"),
    ("isa", "Isaiah"),
    ("jer", "Jeremiah"),
    ("lam", "Lamentations"),
    ("ezek", "Ezekiel"),
    ("dan", "Daniel"),
    ("hos", "Hosea"),
    ("obad", "Obadiah"),
    ("mic", "Micah"),
    ("nah", "Nahum"),
    ("hab", "Habakkuk"),
    ("zeph", "Zephaniah"),
    ("hag", "Haggai"),
    ("zech", "Zechariah"),
    ("mal", "Malachi"),
    ("matt", "Matthew"),
    ("mt", "Matthew"),
    ("mk", "Mark"),
    ("lk", "Luke"),
    ("jn", "John"),
    ("acts of the apostles", "Acts"),
    ("rom", "Romans"),
    ("gal", "Galatians"),
    ("eph", "Ephesians"),
    ("phil", "Philippians"),
    ("col", "Colossians"),
    ("philem", "Philemon"),
    ("heb", "Hebrews"),
    ("jas", "James"),
    ("rev", "Revelation"),
    ("revelations", "Revelation"),
    ("apocalypse", "Revelation"),
];

/// Short forms for the base name of numbered books (alias, base).
const NUMBERED_ALIASES: &[(&str, &str)] = &[
    ("sam", "Samuel"),
    ("kgs", "Kings"),
    ("chron", "Chronicles"),
    ("cor", "Corinthians"),
    ("thess", "Thessalonians"),
    ("tim", "Timothy"),
    ("pet", "Peter"),
    ("jn", "John"),
];

/// Ordinal spellings accepted before a numbered book, indexed by number - 1.
const ORDINALS: [&[&str]; 3] = [
    &["1", "1st", "first", "i"],
    &["2", "2nd", "second", "ii"],
    &["3", "3rd", "third", "iii"],
];

/// Lookup table from normalised spelling to canonical book name.
#[derive(Debug, Clone)]
pub struct BookCatalog {
    lookup: HashMap<String, String>,
    max_words: usize,
}

impl BookCatalog {
    /// An empty catalog. Most callers want [`BookCatalog::standard`].
    pub fn empty() -> Self {
        Self {
            lookup: HashMap::new(),
            max_words: 0,
        }
    }

    /// The 66-book Protestant canon with common abbreviations, ordinal
    /// spellings ("First John", "II Kings"), and Gospel phrasings.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();

        for book in CANONICAL_BOOKS {
            catalog.add_alias(book, book);
            if let Some((number, base)) = split_numbered(book) {
                for ordinal in ORDINALS[number - 1] {
                    catalog.add_alias(&format!("{} {}", ordinal, base), book);
                }
            }
        }

        for (alias, canonical) in ALIASES {
            catalog.add_alias(alias, canonical);
        }

        for (short, base) in NUMBERED_ALIASES {
            for (idx, ordinals) in ORDINALS.iter().enumerate() {
                let canonical = format!("{} {}", idx + 1, base);
                if !CANONICAL_BOOKS.contains(&canonical.as_str()) {
                    continue;
                }
                for ordinal in ordinals.iter() {
                    catalog.add_alias(&format!("{} {}", ordinal, short), &canonical);
                }
            }
        }

        for gospel in GOSPELS {
            catalog.add_alias(&format!("gospel of {}", gospel), gospel);
            catalog.add_alias(&format!("gospel according to {}", gospel), gospel);
            catalog.add_alias(&format!("{}'s gospel", gospel), gospel);
        }

        catalog
    }

    /// Register `alias` as a spelling of `canonical`.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        let key = normalize(alias);
        if key.is_empty() {
            return;
        }
        self.max_words = self.max_words.max(key.split(' ').count());
        self.lookup.insert(key, canonical.to_string());
    }

    /// Builder-style [`add_alias`](Self::add_alias).
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.add_alias(alias, canonical);
        self
    }

    /// Resolve a whole string to its canonical book name.
    pub fn resolve(&self, text: &str) -> Option<&str> {
        self.lookup.get(&normalize(text)).map(String::as_str)
    }

    /// Resolve the longest trailing run of `words` that names a book.
    ///
    /// Used when a book name is preceded by other words of a question
    /// ("what does the gospel of john ..."). Returns the canonical name.
    pub fn resolve_suffix(&self, words: &[&str]) -> Option<&str> {
        let longest = words.len().min(self.max_words);
        (1..=longest).rev().find_map(|n| {
            let candidate = words[words.len() - n..].join(" ");
            self.resolve(&candidate)
        })
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

impl Default for BookCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Split `"1 John"` into `(1, "John")`.
pub fn split_numbered(book: &str) -> Option<(usize, &str)> {
    let (number, base) = book.split_once(' ')?;
    let number: usize = number.parse().ok()?;
    (1..=3).contains(&number).then_some((number, base))
}

/// Lowercase, drop periods, separate a glued leading numeral ("1john"),
/// and collapse whitespace.
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace('.', " ");
    let mut spaced = String::with_capacity(lowered.len() + 1);
    let mut chars = lowered.chars().peekable();
    if let Some(first) = chars.next() {
        spaced.push(first);
        if first.is_ascii_digit() {
            if let Some(next) = chars.peek() {
                if next.is_alphabetic() {
                    spaced.push(' ');
                }
            }
        }
    }
    spaced.extend(chars);
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_resolve_to_themselves() {
        let catalog = BookCatalog::standard();
        for book in CANONICAL_BOOKS {
            assert_eq!(catalog.resolve(book), Some(book), "book {}", book);
        }
    }

    #[test]
    fn test_ordinal_and_abbreviated_forms() {
        let catalog = BookCatalog::standard();
        assert_eq!(catalog.resolve("first john"), Some("1 John"));
        assert_eq!(catalog.resolve("II Kings"), Some("2 Kings"));
        assert_eq!(catalog.resolve("1john"), Some("1 John"));
        assert_eq!(catalog.resolve("1 Cor."), Some("1 Corinthians"));
        assert_eq!(catalog.resolve("Psalm"), Some("Psalms"));
        assert_eq!(catalog.resolve("song of songs"), Some("Song of Solomon"));
        assert_eq!(catalog.resolve("gospel of luke"), Some("Luke"));
        assert_eq!(catalog.resolve("John's Gospel"), Some("John"));
        assert_eq!(catalog.resolve("hello"), None);
    }

    #[test]
    fn test_longest_suffix_wins() {
        let catalog = BookCatalog::standard();
        assert_eq!(catalog.resolve_suffix(&["what", "does", "john"]), Some("John"));
        assert_eq!(catalog.resolve_suffix(&["in", "1", "john"]), Some("1 John"));
        assert_eq!(
            catalog.resolve_suffix(&["the", "song", "of", "solomon"]),
            Some("Song of Solomon")
        );
        assert_eq!(catalog.resolve_suffix(&["tell", "me"]), None);
    }

    #[test]
    fn test_custom_alias() {
        let catalog = BookCatalog::standard().with_alias("Johannes", "John");
        assert_eq!(catalog.resolve("johannes"), Some("John"));
    }
}
