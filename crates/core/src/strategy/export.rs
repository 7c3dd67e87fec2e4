//! Trigger the host's own Markdown export and intercept the download.
//!
//! A thread export is one section per exchange, separated by horizontal
//! rules: a `# question` heading, the answer, and the answer's footnote
//! definitions. A deep-research export is a single report whose title heading
//! stands in for the query.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::assemble::{AssembleOptions, assemble};
use crate::capture::CaptureScope;
use crate::config::ExtractSettings;
use crate::host::HostPage;
use crate::lookup::SourceLookup;
use crate::parse::Document;
use crate::profile::ProfileSelectors;
use crate::registry::CitationRegistry;
use crate::render::layout::{closes_fence, fence, is_rule};
use crate::render::prerendered::local_runs;
use crate::render::{PrerenderedRenderer, RenderOptions};
use crate::strategy::{AttemptContext, ExtractionStrategy, StrategyKind, settle};
use crate::turn::{Role, Turn, is_sufficient, merge_adjacent};
use crate::{Result, ThreadmarkError};

#[derive(Debug, Clone)]
pub struct ExportInterception {
    selectors: ProfileSelectors,
    settings: ExtractSettings,
}

impl ExportInterception {
    pub fn new(selectors: ProfileSelectors, settings: ExtractSettings) -> Self {
        Self { selectors, settings }
    }

    /// Trigger the export and return the decoded payload and whether it is a
    /// research report.
    async fn capture(&self, ctx: &mut AttemptContext<'_, '_>) -> Result<(String, bool)> {
        let host = &mut *ctx.host;
        let snapshot = host.page.snapshot().await?;
        let (research, panel_open) = {
            let doc = Document::parse(&snapshot.html);
            (doc.exists(&self.selectors.research_indicator), doc.exists(&self.selectors.research_export))
        };

        let mut scope = CaptureScope::install(&mut *host.capture)?;
        let triggered = if research {
            self.trigger_research_export(&mut *host.page, panel_open).await?
        } else {
            self.trigger_thread_export(&mut *host.page).await?
        };
        if !triggered {
            return Err(ThreadmarkError::NoContent);
        }

        let markdown = scope.await_capture(self.settings.capture_timeout).await?;
        debug!(bytes = markdown.len(), research, "captured export");
        Ok((markdown, research))
    }

    async fn trigger_thread_export(&self, page: &mut dyn HostPage) -> Result<bool> {
        let profile = &self.selectors.profile;
        if !page.click(&profile.export_menu, 0).await? {
            debug!("export menu not found");
            return Ok(false);
        }
        settle(&self.settings).await;
        page.click(&profile.export_markdown, 0).await
    }

    async fn trigger_research_export(&self, page: &mut dyn HostPage, panel_open: bool) -> Result<bool> {
        let profile = &self.selectors.profile;
        if !panel_open {
            if !page.click(&profile.research_open, 0).await? {
                debug!("research panel control not found");
                return Ok(false);
            }
            settle(&self.settings).await;
        }
        page.click(&profile.research_export, 0).await
    }
}

#[async_trait(?Send)]
impl ExtractionStrategy for ExportInterception {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Export
    }

    async fn extract(&self, ctx: &mut AttemptContext<'_, '_>) -> Vec<Turn> {
        match self.capture(ctx).await {
            Ok((markdown, research)) => {
                info!(research, "export intercepted");
                parse_export(&markdown, research, ctx.options, ctx.registry, ctx.sources)
            }
            Err(ThreadmarkError::CaptureTimeout { timeout_ms }) => {
                warn!("export payload did not arrive within {}ms", timeout_ms);
                Vec::new()
            }
            Err(e) => {
                warn!("export interception failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Split an export payload into turns and render each answer.
///
/// Every marker run in the payload is also recorded in `sources`, so later
/// attempts can expand aggregate markers the page only shows by label.
pub fn parse_export(
    markdown: &str, research: bool, options: RenderOptions, registry: &mut CitationRegistry,
    sources: &mut SourceLookup,
) -> Vec<Turn> {
    let cleaned = strip_decorations(markdown);
    let renderer = PrerenderedRenderer::new(options);

    let sections = if research { vec![cleaned] } else { split_sections(&cleaned) };
    for section in &sections {
        for run in local_runs(section) {
            sources.learn_run(&run);
        }
    }

    let mut turns: Vec<Turn> = Vec::new();
    for section in &sections {
        match take_heading(section) {
            Some((question, body)) => {
                turns.push(Turn::user(question));
                turns.push(Turn::assistant(renderer.render(&body, registry, sources)));
            }
            None => {
                let body = renderer.render(section, registry, sources);
                match turns.last_mut() {
                    Some(last) if last.role == Role::Assistant => {
                        last.content.push_str("\n\n");
                        last.content.push_str(&body);
                    }
                    _ => turns.push(Turn::assistant(body)),
                }
            }
        }
    }

    merge_adjacent(turns)
}

/// Render a saved export payload into a finished document without a live
/// page.
///
/// # Errors
///
/// [`ThreadmarkError::NoContent`] when the payload holds no complete exchange.
pub fn render_export(
    markdown: &str, research: bool, options: RenderOptions, assemble_options: &AssembleOptions,
) -> Result<String> {
    let mut registry = CitationRegistry::new();
    let mut sources = SourceLookup::new();
    let turns = parse_export(markdown, research, options, &mut registry, &mut sources);
    if !is_sufficient(&turns) {
        return Err(ThreadmarkError::NoContent);
    }
    Ok(assemble(&turns, &registry, options.style, assemble_options))
}

/// Drop the export's logo images and section ornaments.
fn strip_decorations(markdown: &str) -> String {
    markdown
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.starts_with("<img") || (trimmed.contains('⁂') && trimmed.starts_with("<div")))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split on horizontal rules outside fenced code.
fn split_sections(markdown: &str) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut open: Option<&str> = None;

    for line in markdown.lines() {
        if let Some(marker) = open {
            if closes_fence(line, marker) {
                open = None;
            }
            current.push(line);
            continue;
        }
        if let Some((_, marker)) = fence(line) {
            open = Some(marker);
            current.push(line);
            continue;
        }
        if is_rule(line) {
            sections.push(current.join("\n"));
            current.clear();
            continue;
        }
        current.push(line);
    }
    sections.push(current.join("\n"));

    sections.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

/// Leading `# heading` of a section, and the rest.
fn take_heading(section: &str) -> Option<(String, String)> {
    let trimmed = section.trim_start();
    let first = trimmed.lines().next()?;
    let question = first.strip_prefix("# ")?.trim();
    if question.is_empty() {
        return None;
    }
    let body = trimmed[first.len()..].trim_start_matches(['\r', '\n']).to_string();
    Some((question.to_string(), body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{CitationStyle, Spacing};

    const THREAD: &str = "<img src=\"https://host.example/logo.svg\" />\n\n\
# What is Rust?\n\n\
Rust is a systems language[^1_1][^1_2].\n\n\
<div align=\"center\">⁂</div>\n\n\
[^1_1]: https://www.rust-lang.org/\n\
[^1_2]: https://en.wikipedia.org/wiki/Rust_(programming_language)\n\
[^1_3]: https://unused.example/\n\n\
---\n\n\
# Is it fast?\n\n\
Yes[^2_1].\n\n\
```\n---\n```\n\n\
[^2_1]: https://www.rust-lang.org/#speed\n";

    fn options(style: CitationStyle) -> RenderOptions {
        RenderOptions::new(style, Spacing::Standard)
    }

    #[test]
    fn test_thread_export_turns() {
        let mut registry = CitationRegistry::new();
        let mut sources = SourceLookup::new();
        let turns = parse_export(THREAD, false, options(CitationStyle::Endnotes), &mut registry, &mut sources);

        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0], Turn::user("What is Rust?"));
        assert_eq!(turns[1].content, "Rust is a systems language[1][2].");
        assert_eq!(turns[2], Turn::user("Is it fast?"));
        assert_eq!(turns[3].content, "Yes[1].\n\n```\n---\n```");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_export_feeds_lookup() {
        let mut registry = CitationRegistry::new();
        let mut sources = SourceLookup::new();
        parse_export(THREAD, false, options(CitationStyle::None), &mut registry, &mut sources);

        assert_eq!(sources.get("rust-lang+1").map(<[String]>::len), Some(2));
        assert_eq!(sources.get("rust-lang").map(<[String]>::len), Some(1));
    }

    #[test]
    fn test_research_export_is_one_exchange() {
        let report = "# Market report\n\nIntro[1].\n\n---\n\n## Findings\n\nMore[2].\n\n## References\n\n\
                      1. https://a.example/\n2. https://b.example/";
        let mut registry = CitationRegistry::new();
        let mut sources = SourceLookup::new();
        let turns = parse_export(report, true, options(CitationStyle::Footnotes), &mut registry, &mut sources);

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::user("Market report"));
        assert_eq!(turns[1].content, "Intro[^1].\n\n---\n\n## Findings\n\nMore[^2].");
    }

    #[test]
    fn test_headless_section_continues_answer() {
        let md = "# Q\n\nPart one.\n\n---\n\nPart two.";
        let mut registry = CitationRegistry::new();
        let turns = parse_export(md, false, options(CitationStyle::Endnotes), &mut registry, &mut SourceLookup::new());

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "Part one.\n\nPart two.");
    }

    #[test]
    fn test_render_export_document() {
        let doc = render_export(THREAD, false, options(CitationStyle::Footnotes), &AssembleOptions::default()).unwrap();
        assert!(doc.starts_with("## User\n\nWhat is Rust?\n\n## Assistant\n\nRust is a systems language[^1][^2]."));
        assert!(doc.ends_with("[^1]: https://www.rust-lang.org/\n[^2]: https://en.wikipedia.org/wiki/Rust_(programming_language)\n"));
        assert!(!doc.contains("unused.example"));
    }

    #[test]
    fn test_render_export_without_exchange() {
        let result = render_export("Just text.", false, options(CitationStyle::Endnotes), &AssembleOptions::default());
        assert!(matches!(result, Err(ThreadmarkError::NoContent)));
    }

    #[test]
    fn test_take_heading() {
        assert_eq!(take_heading("\n# Title\n\nBody"), Some(("Title".to_string(), "Body".to_string())));
        assert_eq!(take_heading("## Sub\nBody"), None);
    }
}
