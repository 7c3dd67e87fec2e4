//! Turn renderers.
//!
//! [`StructuredRenderer`] converts a mounted HTML block into Markdown;
//! [`PrerenderedRenderer`] normalizes a turn that is already Markdown. Both
//! resolve citation markers through the attempt's
//! [`CitationRegistry`](crate::registry::CitationRegistry) and finish with the
//! same spacing policy.

pub mod layout;
pub mod prerendered;
pub mod structured;

pub use layout::{apply_spacing, reindent_list_continuations};
pub use prerendered::PrerenderedRenderer;
pub use structured::StructuredRenderer;

use crate::style::{CitationStyle, Spacing};

/// Output policy shared by both renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub style: CitationStyle,
    pub spacing: Spacing,
}

impl RenderOptions {
    pub fn new(style: CitationStyle, spacing: Spacing) -> Self {
        Self { style, spacing }
    }
}

/// Append a rendered citation run, spacing parenthetical styles off the
/// preceding word.
pub(crate) fn push_citation(out: &mut String, rendered: &str, style: CitationStyle) {
    if style.wants_leading_space()
        && !rendered.is_empty()
        && out.chars().last().is_some_and(|c| !c.is_whitespace() && c != '(' && c != '[')
    {
        out.push(' ');
    }
    out.push_str(rendered);
}

/// Parse a URL list attribute: a JSON array or whitespace-separated URLs.
pub(crate) fn parse_url_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.starts_with('[')
        && let Ok(urls) = serde_json::from_str::<Vec<String>>(trimmed)
    {
        return urls.into_iter().map(|u| u.trim().to_string()).filter(|u| !u.is_empty()).collect();
    }
    trimmed.split_whitespace().map(str::to_string).collect()
}
