//! Multi-source lookup for aggregate citation markers.
//!
//! The structured page shows an aggregate marker such as `wikipedia+2` with a
//! link to only the first source. The export payload lists every source, so
//! runs of adjacent markers found there are keyed by the label the page would
//! show for them and kept here for later attempts in the same run.

use std::collections::HashMap;

use crate::style::domain_label;

#[derive(Debug, Clone, Default)]
pub struct SourceLookup {
    entries: HashMap<String, Vec<String>>,
}

impl SourceLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs for a visible marker label, if known.
    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.entries
            .get(&normalize_label(label))
            .map(Vec::as_slice)
            .filter(|urls| !urls.is_empty())
    }

    /// Record `urls` under `label`. The first mapping for a label wins.
    pub fn insert(&mut self, label: &str, urls: Vec<String>) {
        let key = normalize_label(label);
        if key.is_empty() || urls.is_empty() {
            return;
        }
        self.entries.entry(key).or_insert(urls);
    }

    /// Record a run of adjacent sources under the aggregate label the page
    /// renders for it: `domain` for one source, `domain+k` for k more.
    pub fn learn_run(&mut self, urls: &[String]) {
        let Some(first) = urls.first() else {
            return;
        };
        let domain = domain_label(first);
        let label = match urls.len() {
            1 => domain,
            n => format!("{}+{}", domain, n - 1),
        };
        self.insert(&label, urls.to_vec());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase, whitespace-free form of a marker's visible text.
pub fn normalize_label(label: &str) -> String {
    label.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

/// Whether a normalized label names several sources (`source+2`).
pub fn is_aggregate_label(label: &str) -> bool {
    match label.rsplit_once('+') {
        Some((name, count)) => !name.is_empty() && !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label(" Wikipedia +2 "), "wikipedia+2");
    }

    #[test]
    fn test_learn_run_keys_by_domain_and_count() {
        let mut lookup = SourceLookup::new();
        lookup.learn_run(&[
            "https://en.wikipedia.org/wiki/A".to_string(),
            "https://b.example/".to_string(),
            "https://c.example/".to_string(),
        ]);
        lookup.learn_run(&["https://docs.rs/regex".to_string()]);

        assert_eq!(lookup.get("Wikipedia+2").map(|u| u.len()), Some(3));
        assert_eq!(lookup.get("docs").map(|u| u.len()), Some(1));
        assert!(lookup.get("wikipedia+1").is_none());
    }

    #[test]
    fn test_first_mapping_wins() {
        let mut lookup = SourceLookup::new();
        lookup.insert("a+1", vec!["https://one.example/".to_string(), "https://two.example/".to_string()]);
        lookup.insert("a+1", vec!["https://three.example/".to_string()]);
        assert_eq!(lookup.get("a+1").map(|u| u[0].as_str()), Some("https://one.example/"));
        assert_eq!(lookup.len(), 1);
    }

    #[test]
    fn test_is_aggregate_label() {
        assert!(is_aggregate_label("wikipedia+2"));
        assert!(!is_aggregate_label("wikipedia"));
        assert!(!is_aggregate_label("c++"));
        assert!(!is_aggregate_label("+2"));
    }
}
