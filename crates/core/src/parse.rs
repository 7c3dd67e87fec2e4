//! Read-only queries over a page snapshot.
//!
//! This module provides the [`Document`] and [`Element`] wrappers the
//! strategies use to find turn blocks and controls in the markup a host page
//! currently has mounted.
//!
//! # Example
//!
//! ```rust
//! use threadmark_core::parse::Document;
//!
//! let html = r#"<div data-turn="query">Why?</div><div data-turn="answer">Because.</div>"#;
//! let doc = Document::parse(html);
//! let blocks = doc.select_str("[data-turn]").unwrap();
//! assert_eq!(blocks.len(), 2);
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::Result;
use crate::profile::parse_selector;

/// A parsed page snapshot.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full page snapshot.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parses a fragment such as one turn block.
    pub fn fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html) }
    }

    /// Selects elements in document order.
    pub fn select(&'_ self, selector: &Selector) -> Vec<Element<'_>> {
        self.html.select(selector).map(|element| Element { element }).collect()
    }

    /// Selects elements using a selector string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ThreadmarkError::InvalidSelector`] if the selector is invalid.
    pub fn select_str(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.select(&sel))
    }

    /// Whether anything matches `selector`.
    pub fn exists(&self, selector: &Selector) -> bool {
        self.html.select(selector).next().is_some()
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Whether this element matches `selector`.
    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches(&self.element)
    }

    /// Nearest ancestor matching `selector`.
    pub fn closest(&self, selector: &Selector) -> Option<Element<'a>> {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| selector.matches(ancestor))
            .map(|element| Element { element })
    }

    /// Selects descendants.
    pub fn select(&self, selector: &Selector) -> Vec<Element<'a>> {
        self.element.select(selector).map(|element| Element { element }).collect()
    }

    /// The raw scraper element, for tree walks.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }
}
