//! Selectors describing the host page.
//!
//! Every structural query the core makes against the page goes through a
//! [`MarkupProfile`]. The defaults describe the supported host; a profile can
//! be loaded from JSON when the host's markup drifts.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::{Result, ThreadmarkError};

/// Attribute that carries citation URLs copied out of host-internal state.
pub const CITATION_URLS_ATTR: &str = "data-citation-urls";

/// CSS selectors for every element the strategies and renderers look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupProfile {
    /// A mounted user query block.
    pub user_block: String,
    /// A mounted assistant answer block.
    pub assistant_block: String,
    /// Attribute that identifies a block for internal-state lookups.
    pub block_key_attr: String,
    /// Citation markers, one selector per historical shape. Shapes must not nest.
    pub citation_markers: Vec<String>,
    /// Language label rendered next to a code block.
    pub code_language_label: String,
    /// Copy control on a user query.
    pub copy_query_control: String,
    /// Copy control on an answer.
    pub copy_response_control: String,
    /// Copy controls inside these scopes belong to code blocks and are ignored.
    pub code_scope: String,
    /// Control that opens the thread menu.
    pub export_menu: String,
    /// Menu item that exports the thread as Markdown.
    pub export_markdown: String,
    /// Present when the page shows a deep-research report.
    pub research_indicator: String,
    /// Control that opens the research side panel.
    pub research_open: String,
    /// Markdown export control inside the research panel.
    pub research_export: String,
}

impl Default for MarkupProfile {
    fn default() -> Self {
        Self {
            user_block: "[data-turn='query']".to_string(),
            assistant_block: "[data-turn='answer']".to_string(),
            block_key_attr: "data-turn-id".to_string(),
            citation_markers: vec!["a.citation".to_string(), "span.citation".to_string()],
            code_language_label: ".code-language".to_string(),
            copy_query_control: "button[data-copy='query']".to_string(),
            copy_response_control: "button[data-copy='answer']".to_string(),
            code_scope: "pre, .code-block".to_string(),
            export_menu: "button[data-action='thread-menu']".to_string(),
            export_markdown: "[data-action='export-markdown']".to_string(),
            research_indicator: "[data-mode='research']".to_string(),
            research_open: "button[data-action='open-research']".to_string(),
            research_export: "[data-panel='research'] [data-action='export-markdown']".to_string(),
        }
    }
}

impl MarkupProfile {
    /// Load a profile from a JSON file; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parsed form of a [`MarkupProfile`].
#[derive(Debug, Clone)]
pub struct ProfileSelectors {
    pub user_block: Selector,
    pub assistant_block: Selector,
    pub any_block: Selector,
    pub citation_marker: Selector,
    pub code_language_label: Selector,
    pub copy_query_control: Selector,
    pub copy_response_control: Selector,
    pub any_copy_control: Selector,
    pub code_scope: Selector,
    pub research_indicator: Selector,
    pub research_export: Selector,
    pub profile: MarkupProfile,
}

impl ProfileSelectors {
    pub fn compile(profile: &MarkupProfile) -> Result<Self> {
        Ok(Self {
            user_block: parse_selector(&profile.user_block)?,
            assistant_block: parse_selector(&profile.assistant_block)?,
            any_block: parse_selector(&format!("{}, {}", profile.user_block, profile.assistant_block))?,
            citation_marker: parse_selector(&profile.citation_markers.join(", "))?,
            code_language_label: parse_selector(&profile.code_language_label)?,
            copy_query_control: parse_selector(&profile.copy_query_control)?,
            copy_response_control: parse_selector(&profile.copy_response_control)?,
            any_copy_control: parse_selector(&format!(
                "{}, {}",
                profile.copy_query_control, profile.copy_response_control
            ))?,
            code_scope: parse_selector(&profile.code_scope)?,
            research_indicator: parse_selector(&profile.research_indicator)?,
            research_export: parse_selector(&profile.research_export)?,
            profile: profile.clone(),
        })
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ThreadmarkError::InvalidSelector { selector: selector.to_string(), reason: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_compiles() {
        assert!(ProfileSelectors::compile(&MarkupProfile::default()).is_ok());
    }

    #[test]
    fn test_invalid_selector_reported() {
        let profile = MarkupProfile { user_block: "[[broken".to_string(), ..Default::default() };
        let err = ProfileSelectors::compile(&profile).unwrap_err();
        assert!(matches!(err, ThreadmarkError::InvalidSelector { ref selector, .. } if selector == "[[broken"));
    }

    #[test]
    fn test_profile_from_partial_json() {
        let profile = MarkupProfile::from_json(r#"{ "user_block": "h1.query" }"#).unwrap();
        assert_eq!(profile.user_block, "h1.query");
        assert_eq!(profile.assistant_block, MarkupProfile::default().assistant_block);
    }
}
