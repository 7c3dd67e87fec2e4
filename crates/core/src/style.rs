//! Citation styles and spacing policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::registry::{Citation, CitationRegistry};

/// How a resolved citation is written into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    /// `[1]`, with a `[1] url` index appended to the document.
    Endnotes,
    /// `[^1]`, with `[^1]: url` definitions appended to the document.
    Footnotes,
    /// `[1](url)`
    Inline,
    /// `([1](url))`
    #[default]
    Parenthesized,
    /// `([domain](url))`
    Named,
    /// Citations are dropped.
    None,
}

impl CitationStyle {
    pub const ALL: [CitationStyle; 6] = [
        CitationStyle::Endnotes,
        CitationStyle::Footnotes,
        CitationStyle::Inline,
        CitationStyle::Parenthesized,
        CitationStyle::Named,
        CitationStyle::None,
    ];

    /// Render a run of adjacent citations.
    pub fn render_run(&self, run: &[CitedSource]) -> String {
        match self {
            CitationStyle::Endnotes => run.iter().map(|c| format!("[{}]", c.number)).collect(),
            CitationStyle::Footnotes => run.iter().map(|c| format!("[^{}]", c.number)).collect(),
            CitationStyle::Inline => run.iter().map(|c| format!("[{}]({})", c.number, c.url)).collect(),
            CitationStyle::Parenthesized => run
                .iter()
                .map(|c| format!("([{}]({}))", c.number, c.url))
                .collect::<Vec<_>>()
                .join(" "),
            CitationStyle::Named => run
                .iter()
                .map(|c| format!("([{}]({}))", domain_label(&c.url), c.url))
                .collect::<Vec<_>>()
                .join(" "),
            CitationStyle::None => String::new(),
        }
    }

    /// Whether the assembler must append a citation index.
    pub fn needs_index(&self) -> bool {
        matches!(self, CitationStyle::Endnotes | CitationStyle::Footnotes)
    }

    /// Index line for one citation, for styles that carry an index.
    pub fn index_entry(&self, citation: &Citation) -> Option<String> {
        match self {
            CitationStyle::Endnotes => Some(format!("[{}] {}", citation.number, citation.display_url)),
            CitationStyle::Footnotes => Some(format!("[^{}]: {}", citation.number, citation.display_url)),
            _ => None,
        }
    }

    /// Renderings that read as a parenthetical want a space before them.
    pub(crate) fn wants_leading_space(&self) -> bool {
        matches!(self, CitationStyle::Parenthesized | CitationStyle::Named)
    }
}

impl FromStr for CitationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "endnotes" | "endnote" => Ok(Self::Endnotes),
            "footnotes" | "footnote" => Ok(Self::Footnotes),
            "inline" => Ok(Self::Inline),
            "parenthesized" | "parens" => Ok(Self::Parenthesized),
            "named" => Ok(Self::Named),
            "none" | "off" => Ok(Self::None),
            _ => Err(format!(
                "Invalid citation style: {}. Valid options: endnotes, footnotes, inline, parenthesized, named, none",
                s
            )),
        }
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CitationStyle::Endnotes => "endnotes",
            CitationStyle::Footnotes => "footnotes",
            CitationStyle::Inline => "inline",
            CitationStyle::Parenthesized => "parenthesized",
            CitationStyle::Named => "named",
            CitationStyle::None => "none",
        };
        f.write_str(name)
    }
}

/// Blank-line policy applied to every rendered turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    /// Runs of three or more blank lines collapse to one.
    #[default]
    Standard,
    /// No blank lines, except one before each table.
    Compact,
}

impl FromStr for Spacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "normal" => Ok(Self::Standard),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Invalid spacing: {}. Valid options: standard, compact", s)),
        }
    }
}

/// A citation resolved to its global number, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitedSource {
    pub number: u32,
    pub url: String,
}

impl CitedSource {
    /// Register `url` and build the renderable form, using the registry's
    /// first spelling of the URL so every mention links identically.
    pub fn register(registry: &mut CitationRegistry, url: &str, label: Option<&str>) -> Self {
        let number = registry.add_citation(url, label);
        let url = registry
            .get(number)
            .map(|c| c.display_url.clone())
            .unwrap_or_else(|| url.trim().to_string());
        Self { number, url }
    }
}

/// Drop repeated numbers from a run, keeping first occurrences.
pub(crate) fn dedupe_run(run: Vec<CitedSource>) -> Vec<CitedSource> {
    let mut out: Vec<CitedSource> = Vec::with_capacity(run.len());
    for cited in run {
        if !out.iter().any(|c| c.number == cited.number) {
            out.push(cited);
        }
    }
    out
}

/// Short source name for a URL: `en.wikipedia.org` → `wikipedia`,
/// `www.bbc.co.uk` → `bbc`.
pub fn domain_label(url: &str) -> String {
    let host = match Url::parse(url.trim()) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(_) => naive_host(url),
    };
    let host = host.strip_prefix("www.").unwrap_or(&host).to_lowercase();
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();

    match labels.len() {
        0 => String::new(),
        1 => labels[0].to_string(),
        n => {
            let second_last = labels[n - 2];
            if second_last.len() <= 3 && n >= 3 { labels[n - 3].to_string() } else { second_last.to_string() }
        }
    }
}

fn naive_host(url: &str) -> String {
    let trimmed = url.trim();
    let without_scheme = trimmed.split_once("://").map(|(_, rest)| rest).unwrap_or(trimmed);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_string()
}
