//! Global citation registry.
//!
//! One [`CitationRegistry`] lives for exactly one extraction attempt. It maps
//! canonical URLs (fragment stripped) to dense sequence numbers handed out in
//! first-discovery order, and is reset before every attempt so numbers from a
//! discarded attempt can never leak into the next.

use std::collections::HashMap;

use url::Url;

/// One registered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Sequence number, dense from 1.
    pub number: u32,
    /// Identity key: the URL with its fragment removed.
    pub canonical_url: String,
    /// The URL as first seen, used when rendering links.
    pub display_url: String,
    /// Visible label of the first marker that carried a label.
    pub source_label: Option<String>,
}

/// Attempt-scoped store mapping canonical URL to sequence number.
#[derive(Debug, Clone, Default)]
pub struct CitationRegistry {
    by_url: HashMap<String, u32>,
    citations: Vec<Citation>,
}

impl CitationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every citation; the next registration gets number 1 again.
    pub fn reset(&mut self) {
        self.by_url.clear();
        self.citations.clear();
    }

    /// Register `url` and return its sequence number.
    ///
    /// URLs that differ only by fragment share a number. Malformed URLs are
    /// still registered through a naive canonical form so a marker always
    /// gets some number.
    pub fn add_citation(&mut self, url: &str, label: Option<&str>) -> u32 {
        let canonical = canonicalize(url);

        if let Some(&number) = self.by_url.get(&canonical) {
            if let Some(label) = label
                && let Some(existing) = self.citations.get_mut(number as usize - 1)
                && existing.source_label.is_none()
            {
                existing.source_label = Some(label.to_string());
            }
            return number;
        }

        let number = self.citations.len() as u32 + 1;
        self.by_url.insert(canonical.clone(), number);
        self.citations.push(Citation {
            number,
            canonical_url: canonical,
            display_url: url.trim().to_string(),
            source_label: label.map(str::to_string),
        });
        number
    }

    /// Number already assigned to `url`, if any.
    pub fn lookup(&self, url: &str) -> Option<u32> {
        self.by_url.get(&canonicalize(url)).copied()
    }

    /// Citation with the given sequence number.
    pub fn get(&self, number: u32) -> Option<&Citation> {
        let index = (number as usize).checked_sub(1)?;
        self.citations.get(index)
    }

    /// All citations in first-registration order.
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

/// Canonical form of a URL: parsed, fragment stripped.
///
/// Falls back to cutting the raw string at the first `#` when the URL does
/// not parse (relative links, stray whitespace inside, and so on).
pub fn canonicalize(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => trimmed.split('#').next().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_variants_share_number() {
        let mut registry = CitationRegistry::new();
        let a = registry.add_citation("https://a.example/page#intro", None);
        let b = registry.add_citation("https://a.example/page#details", None);
        let c = registry.add_citation("https://a.example/page", None);

        assert_eq!(a, 1);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_numbers_are_dense_in_discovery_order() {
        let mut registry = CitationRegistry::new();
        let urls = ["https://c.example/", "https://a.example/", "https://b.example/", "https://a.example/"];
        let numbers: Vec<u32> = urls.iter().map(|u| registry.add_citation(u, None)).collect();

        assert_eq!(numbers, vec![1, 2, 3, 2]);
        let order: Vec<&str> = registry.citations().iter().map(|c| c.display_url.as_str()).collect();
        assert_eq!(order, vec!["https://c.example/", "https://a.example/", "https://b.example/"]);
    }

    #[test]
    fn test_query_is_part_of_identity() {
        let mut registry = CitationRegistry::new();
        let a = registry.add_citation("https://a.example/search?q=1", None);
        let b = registry.add_citation("https://a.example/search?q=2", None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_url_still_numbered() {
        let mut registry = CitationRegistry::new();
        let a = registry.add_citation("/relative/path#frag", None);
        let b = registry.add_citation("/relative/path", None);
        let c = registry.add_citation("not a url at all", None);

        assert_eq!(a, 1);
        assert_eq!(b, 1);
        assert_eq!(c, 2);
        assert_eq!(registry.lookup("/relative/path#other"), Some(1));
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut registry = CitationRegistry::new();
        registry.add_citation("https://a.example/", None);
        registry.add_citation("https://b.example/", None);
        registry.reset();

        assert!(registry.is_empty());
        assert_eq!(registry.lookup("https://a.example/"), None);
        assert_eq!(registry.add_citation("https://c.example/", None), 1);
    }

    #[test]
    fn test_label_filled_on_later_registration() {
        let mut registry = CitationRegistry::new();
        registry.add_citation("https://a.example/", None);
        registry.add_citation("https://a.example/#x", Some("example"));

        assert_eq!(registry.get(1).and_then(|c| c.source_label.as_deref()), Some("example"));
        assert!(registry.get(0).is_none());
        assert!(registry.get(2).is_none());
    }

    #[test]
    fn test_display_url_keeps_first_spelling() {
        let mut registry = CitationRegistry::new();
        registry.add_citation("https://a.example/x#one", None);
        assert_eq!(registry.get(1).map(|c| c.display_url.as_str()), Some("https://a.example/x#one"));
        assert_eq!(registry.get(1).map(|c| c.canonical_url.as_str()), Some("https://a.example/x"));
    }
}
