//! The whitelist of neighborhood names every extracted span is checked
//! against. Lookups compare prefix-free normalized keys, so "حي النرجس" and
//! "النرجس" resolve to the same entry.

use crate::normalize::{district_key, normalize};

const MIN_PARTIAL_CHARS: usize = 3;

#[derive(Debug, Clone)]
struct Entry {
    display: String,
    key: String,
}

/// Whitelist of known neighborhood names.
///
/// Names are kept in the store's order; every comparison is made on the
/// normalized name with the "حي " prefix removed, on both sides.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: Vec<Entry>,
}

impl Gazetteer {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<Entry> = Vec::new();
        for name in names {
            let display = name.as_ref().trim();
            let key = district_key(display);
            if key.is_empty() || entries.iter().any(|e| e.key == key) {
                continue;
            }
            let display = display
                .strip_prefix("حي ")
                .map(str::trim_start)
                .unwrap_or(display)
                .to_string();
            entries.push(Entry { display, key });
        }
        Self { entries }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.display.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn exact(&self, span: &str) -> Option<&str> {
        let key = district_key(span);
        self.entries
            .iter()
            .find(|e| !key.is_empty() && e.key == key)
            .map(|e| e.display.as_str())
    }

    /// Exact match first, then the first name containing the captured span.
    /// Spans shorter than three letters only match exactly.
    pub fn resolve(&self, span: &str) -> Option<&str> {
        let key = district_key(span);
        if key.is_empty() {
            return None;
        }
        self.exact(span).or_else(|| {
            if key.chars().count() < MIN_PARTIAL_CHARS {
                return None;
            }
            self.entries
                .iter()
                .find(|e| e.key.contains(key.as_str()))
                .map(|e| e.display.as_str())
        })
    }

    /// Like `resolve`, but also accepts a span that contains a known name.
    pub fn resolve_loose(&self, span: &str) -> Option<&str> {
        let key = district_key(span);
        if key.is_empty() {
            return None;
        }
        self.resolve(span).or_else(|| {
            self.entries
                .iter()
                .find(|e| key.contains(e.key.as_str()))
                .map(|e| e.display.as_str())
        })
    }

    /// First known name, in whitelist order, occurring anywhere in `text`.
    pub fn first_in(&self, text: &str) -> Option<&str> {
        let text = normalize(text);
        self.entries
            .iter()
            .find(|e| text.contains(e.key.as_str()))
            .map(|e| e.display.as_str())
    }

    /// Every known name occurring in `text`, in whitelist order.
    pub fn all_in(&self, text: &str) -> Vec<&str> {
        let text = normalize(text);
        self.entries
            .iter()
            .filter(|e| text.contains(e.key.as_str()))
            .map(|e| e.display.as_str())
            .collect()
    }

    /// Whether `text` contains any known name.
    pub fn mentions_any(&self, text: &str) -> bool {
        self.first_in(text).is_some()
    }

    /// The normalized, prefix-free key for a display name.
    pub fn key_of(name: &str) -> String {
        district_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Gazetteer {
        Gazetteer::new(["حي النرجس", "الياسمين", "الملقا", "حي الملك فهد", "الملقا"])
    }

    #[test]
    fn prefix_is_dropped_and_names_deduplicated() {
        let g = sample();
        assert_eq!(
            g.names().collect::<Vec<_>>(),
            vec!["النرجس", "الياسمين", "الملقا", "الملك فهد"]
        );
    }

    #[test]
    fn resolve_tolerates_prefix_and_variants() {
        let g = sample();
        assert_eq!(g.resolve("حي الياسمين"), Some("الياسمين"));
        assert_eq!(g.resolve("الياسمين"), Some("الياسمين"));
        assert_eq!(g.resolve("الملك"), Some("الملك فهد"));
        assert_eq!(g.resolve("العليا"), None);
        assert_eq!(g.resolve("  "), None);
        assert_eq!(g.resolve("ال"), None);
    }

    #[test]
    fn loose_resolution_accepts_longer_spans() {
        let g = sample();
        assert_eq!(g.resolve("الملقا الجميل"), None);
        assert_eq!(g.resolve_loose("الملقا الجميل"), Some("الملقا"));
    }

    #[test]
    fn first_in_follows_whitelist_order() {
        let g = sample();
        assert_eq!(
            g.first_in("بين حي الملقا وحي النرجس"),
            Some("النرجس")
        );
        assert!(!g.mentions_any("لا يوجد اسم هنا"));
    }
}
