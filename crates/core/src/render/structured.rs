//! HTML block to Markdown.
//!
//! The walk emits citation markers as private-use placeholders first, so the
//! list, emphasis and spacing passes can reason about them before they are
//! expanded into the active citation style.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::lookup::{SourceLookup, is_aggregate_label, normalize_label};
use crate::profile::{CITATION_URLS_ATTR, ProfileSelectors};
use crate::registry::CitationRegistry;
use crate::render::layout::{LIST_INDENT, apply_spacing, reindent_list_continuations};
use crate::render::{RenderOptions, parse_url_list, push_citation};
use crate::style::{CitationStyle, CitedSource, dedupe_run};

const CITE_OPEN: char = '\u{E000}';
const CITE_CLOSE: char = '\u{E001}';

static CITE_RUN: LazyLock<String> = LazyLock::new(|| {
    let one = format!("{}\\d+{}", CITE_OPEN, CITE_CLOSE);
    format!("{one}(?:[ \\t]*{one})*")
});
static CITE_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("{}(\\d+){}", CITE_OPEN, CITE_CLOSE)).unwrap());
static CITE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(&CITE_RUN).unwrap());
static BOLD_WRAPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\*\*[ \t]*({})[ \t]*\*\*", *CITE_RUN)).unwrap());
static ITALIC_WRAPPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?m)(^|[^*])\*[ \t]*({})[ \t]*\*($|[^*])", *CITE_RUN)).unwrap());
static CLOSER_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?m)([ \t]*)({})(\*\*|\*)($|[^\w*])", *CITE_RUN)).unwrap());
static OPENER_BEFORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?m)(^|[ \t(])(\*\*|\*)({})([ \t]*)", *CITE_RUN)).unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "button", "input", "select", "textarea", "iframe", "canvas",
];

const CONTAINER_TAGS: &[&str] = &[
    "html", "body", "div", "section", "article", "main", "header", "footer", "aside", "nav", "figure", "figcaption",
    "details", "summary", "dl", "dt", "dd", "li", "form", "p",
];

/// Renders one mounted content block into Markdown.
#[derive(Debug, Clone)]
pub struct StructuredRenderer {
    selectors: ProfileSelectors,
    options: RenderOptions,
}

impl StructuredRenderer {
    pub fn new(selectors: ProfileSelectors, options: RenderOptions) -> Self {
        Self { selectors, options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Render `html`, registering every resolved citation with `registry`.
    pub fn render(&self, html: &str, registry: &mut CitationRegistry, sources: &SourceLookup) -> String {
        let fragment = Html::parse_fragment(html);
        let mut walker = Walker { selectors: &self.selectors, registry, sources, runs: Vec::new() };

        let blocks = walker.blocks(fragment.root_element(), 0);
        let markdown = join_blocks(&blocks);
        let markdown = reindent_list_continuations(&markdown);
        let markdown = repair_emphasis(&markdown);
        let markdown = expand_citations(&markdown, &walker.runs, self.options.style);

        apply_spacing(&markdown, self.options.spacing).trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    List,
    Other,
}

#[derive(Debug, Clone)]
struct Block {
    kind: BlockKind,
    text: String,
}

impl Block {
    fn other(text: String) -> Self {
        Self { kind: BlockKind::Other, text }
    }
}

fn join_blocks(blocks: &[Block]) -> String {
    blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

struct Walker<'a> {
    selectors: &'a ProfileSelectors,
    registry: &'a mut CitationRegistry,
    sources: &'a SourceLookup,
    runs: Vec<Vec<CitedSource>>,
}

impl Walker<'_> {
    fn blocks(&mut self, parent: ElementRef<'_>, depth: usize) -> Vec<Block> {
        let mut out: Vec<Block> = Vec::new();
        let mut inline = String::new();

        self.walk(parent, depth, &mut inline, &mut out);

        flush_inline(&mut inline, &mut out);
        out.retain(|b| !b.text.trim().is_empty());
        out
    }

    /// Walk `parent`'s children, appending to the open inline run and
    /// flushing it whenever a block starts.
    fn walk(&mut self, parent: ElementRef<'_>, depth: usize, inline: &mut String, out: &mut Vec<Block>) {
        for child in parent.children() {
            let el = match child.value() {
                Node::Text(text) => {
                    inline.push_str(&escape_text(&collapse_whitespace(text)));
                    continue;
                }
                Node::Element(_) => match ElementRef::wrap(child) {
                    Some(el) => el,
                    None => continue,
                },
                _ => continue,
            };

            if self.is_marker(el) {
                inline.push_str(&self.marker(el));
                continue;
            }
            if self.is_skipped(el) {
                continue;
            }

            let tag = el.value().name();
            let block = match tag {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(Block::other(self.heading(el, tag))),
                "ul" | "ol" => Some(Block { kind: BlockKind::List, text: self.list(el, depth, tag == "ol") }),
                "pre" => Some(Block::other(self.code_block(el))),
                "code" if el.text().any(|t| t.contains('\n')) => {
                    let text: String = el.text().collect();
                    Some(Block::other(fenced(&text, &self.language_for(el, Some(el)))))
                }
                "table" => Some(Block::other(self.table(el))),
                "blockquote" => Some(Block::other(self.blockquote(el))),
                "hr" => Some(Block::other("---".to_string())),
                _ if CONTAINER_TAGS.contains(&tag) => {
                    flush_inline(inline, out);
                    out.extend(self.blocks(el, depth));
                    None
                }
                _ if has_multiline_code(el) => {
                    self.walk(el, depth, inline, out);
                    None
                }
                _ => {
                    inline.push_str(&self.inline(el));
                    None
                }
            };

            if let Some(block) = block {
                flush_inline(inline, out);
                out.push(block);
            }
        }
    }

    fn inline_children(&mut self, parent: ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&escape_text(&collapse_whitespace(text))),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        if self.is_marker(el) {
                            out.push_str(&self.marker(el));
                        } else if !self.is_skipped(el) {
                            out.push_str(&self.inline(el));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn inline(&mut self, el: ElementRef<'_>) -> String {
        match el.value().name() {
            "strong" | "b" => wrap_emphasis(&self.inline_children(el), "**"),
            "em" | "i" => wrap_emphasis(&self.inline_children(el), "*"),
            "code" => inline_code(&el.text().collect::<String>()),
            "br" => "\n".to_string(),
            "a" => {
                let text = self.inline_children(el);
                let label = text.trim();
                match el.value().attr("href").map(str::trim) {
                    Some(href) if !href.is_empty() && !href.starts_with("javascript:") && !label.is_empty() => {
                        format!("[{}]({})", label, href)
                    }
                    _ => text,
                }
            }
            "img" => match el.value().attr("src") {
                Some(src) if !src.trim().is_empty() => {
                    format!("![{}]({})", el.value().attr("alt").unwrap_or_default().trim(), src.trim())
                }
                _ => String::new(),
            },
            _ => self.inline_children(el),
        }
    }

    fn heading(&mut self, el: ElementRef<'_>, tag: &str) -> String {
        let level = tag[1..].parse::<usize>().unwrap_or(1);
        let text = self.inline_children(el).replace('\n', " ");
        let text = text.trim();
        if text.is_empty() { String::new() } else { format!("{} {}", "#".repeat(level), text) }
    }

    fn list(&mut self, el: ElementRef<'_>, depth: usize, ordered: bool) -> String {
        let mut number = el
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1);
        let indent = " ".repeat(depth * LIST_INDENT);
        let mut items: Vec<String> = Vec::new();

        for child in el.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "li" => {}
                name @ ("ul" | "ol") => {
                    items.push(self.list(child, depth + 1, name == "ol"));
                    continue;
                }
                _ => continue,
            }

            let marker = if ordered {
                number += 1;
                format!("{}.", number - 1)
            } else {
                "-".to_string()
            };
            let content_col = indent.len() + marker.len() + 1;
            let mut item = format!("{}{} ", indent, marker);

            for (i, block) in self.blocks(child, depth + 1).iter().enumerate() {
                match (i, block.kind) {
                    (0, BlockKind::Other) => item.push_str(&block.text),
                    (_, BlockKind::List) => {
                        item.truncate(item.trim_end().len());
                        item.push('\n');
                        item.push_str(&block.text);
                    }
                    _ => {
                        item.push_str("\n\n");
                        item.push_str(&indent_lines(&block.text, content_col));
                    }
                }
            }
            items.push(item.trim_end().to_string());
        }

        items.join("\n")
    }

    fn code_block(&mut self, pre: ElementRef<'_>) -> String {
        let code = pre.descendants().filter_map(ElementRef::wrap).find(|e| e.value().name() == "code");
        let text = match code {
            Some(code) => code.text().collect::<String>(),
            None => self.code_text(pre),
        };
        fenced(&text, &self.language_for(pre, code))
    }

    /// Text of a code container without its label or controls.
    fn code_text(&self, el: ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in el.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child)
                        && !self.is_skipped(child)
                    {
                        out.push_str(&self.code_text(child));
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Language for a code block: class, attribute, or a nearby label.
    fn language_for(&self, container: ElementRef<'_>, code: Option<ElementRef<'_>>) -> String {
        let from_class = |el: ElementRef<'_>| {
            el.value().attr("class").and_then(|classes| {
                classes.split_whitespace().find_map(|c| {
                    c.strip_prefix("language-")
                        .or_else(|| c.strip_prefix("lang-"))
                        .map(str::to_string)
                })
            })
        };
        let from_attr = |el: ElementRef<'_>| el.value().attr("data-language").map(str::to_string);

        let label_inside = container
            .select(&self.selectors.code_language_label)
            .next()
            .map(|l| l.text().collect::<String>());

        let label_before = || {
            let mut node = Some(container);
            while let Some(current) = node {
                let sibling = current
                    .prev_siblings()
                    .filter_map(ElementRef::wrap)
                    .next();
                if let Some(sibling) = sibling {
                    if self.selectors.code_language_label.matches(&sibling) {
                        return Some(sibling.text().collect::<String>());
                    }
                    if let Some(label) = sibling.select(&self.selectors.code_language_label).next() {
                        return Some(label.text().collect::<String>());
                    }
                    return None;
                }
                node = current.parent().and_then(ElementRef::wrap).filter(|p| p.value().name() == "div");
            }
            None
        };

        code.and_then(from_class)
            .or_else(|| from_class(container))
            .or_else(|| code.and_then(from_attr))
            .or_else(|| from_attr(container))
            .or(label_inside)
            .or_else(label_before)
            .map(|lang| lang.split_whitespace().next().unwrap_or_default().to_lowercase())
            .unwrap_or_default()
    }

    fn table(&mut self, table: ElementRef<'_>) -> String {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for tr in table.descendants().filter_map(ElementRef::wrap).filter(|e| e.value().name() == "tr") {
            let owner = tr.ancestors().filter_map(ElementRef::wrap).find(|a| a.value().name() == "table");
            if owner.map(|o| o.id()) != Some(table.id()) {
                continue;
            }

            let cells: Vec<String> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(|c| {
                    self.inline_children(c)
                        .replace('\n', " ")
                        .trim()
                        .replace('|', "\\|")
                })
                .collect();
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        let Some(width) = rows.iter().map(Vec::len).max() else {
            return String::new();
        };

        let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 1);
        for (i, row) in rows.iter().enumerate() {
            let mut cells = row.clone();
            cells.resize(width, String::new());
            lines.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                lines.push(format!("|{}", " --- |".repeat(width)));
            }
        }
        lines.join("\n")
    }

    fn blockquote(&mut self, el: ElementRef<'_>) -> String {
        let inner = join_blocks(&self.blocks(el, 0));
        inner
            .lines()
            .map(|line| if line.trim().is_empty() { ">".to_string() } else { format!("> {}", line) })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_marker(&self, el: ElementRef<'_>) -> bool {
        self.selectors.citation_marker.matches(&el)
    }

    fn is_skipped(&self, el: ElementRef<'_>) -> bool {
        SKIPPED_TAGS.contains(&el.value().name()) || self.selectors.code_language_label.matches(&el)
    }

    /// Resolve a marker, register its sources and emit a placeholder.
    fn marker(&mut self, el: ElementRef<'_>) -> String {
        let visible: String = el.text().collect();
        let visible = visible.trim();
        let label = normalize_label(visible);
        let urls = self.marker_urls(el, &label);

        if urls.is_empty() {
            return visible.to_string();
        }

        let source_label = (urls.len() == 1 && !visible.is_empty()).then_some(visible);
        let run: Vec<CitedSource> = urls
            .iter()
            .map(|url| CitedSource::register(self.registry, url, source_label))
            .collect();

        self.runs.push(dedupe_run(run));
        format!("{}{}{}", CITE_OPEN, self.runs.len() - 1, CITE_CLOSE)
    }

    /// Backing URLs for a marker, most explicit source first.
    fn marker_urls(&self, el: ElementRef<'_>, label: &str) -> Vec<String> {
        if let Some(value) = el.value().attr(CITATION_URLS_ATTR) {
            let urls = parse_url_list(value);
            if !urls.is_empty() {
                return urls;
            }
        }

        if is_aggregate_label(label)
            && let Some(urls) = self.sources.get(label)
        {
            return urls.to_vec();
        }

        if let Some(href) = marker_href(el) {
            return vec![href];
        }

        self.sources.get(label).map(<[String]>::to_vec).unwrap_or_default()
    }
}

/// Link target of a marker: its own `href` or that of a nested link.
fn marker_href(el: ElementRef<'_>) -> Option<String> {
    std::iter::once(el)
        .chain(el.descendants().filter_map(ElementRef::wrap))
        .filter(|e| e.value().name() == "a")
        .filter_map(|e| e.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:"))
        .map(str::to_string)
}

fn flush_inline(inline: &mut String, out: &mut Vec<Block>) {
    let text = finish_inline(inline);
    if !text.is_empty() {
        out.push(Block::other(text));
    }
    inline.clear();
}

/// Trim each line of an inline run and the run as a whole.
fn finish_inline(inline: &str) -> String {
    inline.lines().map(str::trim).collect::<Vec<_>>().join("\n").trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").to_string()
}

/// Backslash-escape characters that would otherwise read as Markdown syntax.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '_' | '[' | ']' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Code spanning several lines somewhere below an inline element.
fn has_multiline_code(el: ElementRef<'_>) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| d.value().name() == "code" && d.text().any(|t| t.contains('\n')))
}

fn wrap_emphasis(inner: &str, marker: &str) -> String {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return inner.to_string();
    }
    let lead = if inner.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if inner.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{}{}{}{}{}", lead, marker, trimmed, marker, trail)
}

fn inline_code(text: &str) -> String {
    let text = text.replace('\n', " ");
    if text.trim().is_empty() {
        return String::new();
    }
    if text.contains('`') { format!("`` {} ``", text) } else { format!("`{}`", text) }
}

fn fenced(text: &str, language: &str) -> String {
    let body = text.trim_matches('\n');
    let fence = if body.contains("```") { "````" } else { "```" };
    format!("{}{}\n{}\n{}", fence, language, body, fence)
}

fn indent_lines(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| if line.trim().is_empty() { String::new() } else { format!("{}{}", pad, line) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep citations outside emphasis and never leave a dangling marker.
fn repair_emphasis(markdown: &str) -> String {
    let fixed = BOLD_WRAPPED.replace_all(markdown, "$1");
    let fixed = ITALIC_WRAPPED.replace_all(&fixed, "${1}${2}${3}");
    let fixed = CLOSER_AFTER.replace_all(&fixed, "${3}${1}${2}${4}");
    let fixed = OPENER_BEFORE.replace_all(&fixed, "${1}${3}${4}${2}");
    fixed.to_string()
}

/// Replace placeholder runs with the style rendering of their citations.
fn expand_citations(markdown: &str, runs: &[Vec<CitedSource>], style: CitationStyle) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut last = 0;

    for m in CITE_RUN_RE.find_iter(markdown) {
        out.push_str(&markdown[last..m.start()]);
        last = m.end();

        let cited: Vec<CitedSource> = CITE_INDEX
            .captures_iter(m.as_str())
            .filter_map(|caps| caps.get(1)?.as_str().parse::<usize>().ok())
            .filter_map(|index| runs.get(index))
            .flatten()
            .cloned()
            .collect();
        push_citation(&mut out, &style.render_run(&dedupe_run(cited)), style);
    }

    out.push_str(&markdown[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MarkupProfile;
    use crate::style::Spacing;

    fn renderer(style: CitationStyle) -> StructuredRenderer {
        let selectors = ProfileSelectors::compile(&MarkupProfile::default()).unwrap();
        StructuredRenderer::new(selectors, RenderOptions::new(style, Spacing::Standard))
    }

    fn render(html: &str, style: CitationStyle) -> (String, CitationRegistry) {
        let mut registry = CitationRegistry::new();
        let out = renderer(style).render(html, &mut registry, &SourceLookup::new());
        (out, registry)
    }

    #[test]
    fn test_headings_paragraphs_emphasis() {
        let (md, _) = render(
            "<h2>Summary</h2><p>Rust is <strong>fast</strong> and <em>safe</em>.</p><p>Second <code>cargo</code>.</p>",
            CitationStyle::Endnotes,
        );
        assert_eq!(md, "## Summary\n\nRust is **fast** and *safe*.\n\nSecond `cargo`.");
    }

    #[test]
    fn test_single_link_marker() {
        let (md, registry) = render(
            r#"<p>Claim<a class="citation" href="https://a.example/x">a</a>.</p>"#,
            CitationStyle::Endnotes,
        );
        assert_eq!(md, "Claim[1].");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_decorated_marker_with_nested_link() {
        let (md, _) = render(
            r#"<p>Claim<span class="citation"><span>example</span><a href="https://www.example.com/y">↗</a></span></p>"#,
            CitationStyle::Named,
        );
        assert_eq!(md, "Claim ([example](https://www.example.com/y))");
    }

    #[test]
    fn test_two_marker_shapes_share_number() {
        let html = r#"<p>One<a class="citation" href="https://a.example/doc#p1">a</a></p>
            <p>Two<span class="citation">a<a href="https://a.example/doc#p2">↗</a></span></p>"#;
        let (md, registry) = render(html, CitationStyle::Parenthesized);
        assert_eq!(registry.len(), 1);
        assert_eq!(md.matches("([1](https://a.example/doc#p1))").count(), 2);
    }

    #[test]
    fn test_aggregate_marker_from_attribute() {
        let html = r#"<p>Claim<a class="citation" href="https://a.example/"
            data-citation-urls="https://a.example/ https://b.example/ https://c.example/">a+2</a></p>"#;
        let (md, registry) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, "Claim[1][2][3]");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_aggregate_marker_from_lookup() {
        let mut sources = SourceLookup::new();
        sources.insert(
            "wikipedia+2",
            vec![
                "https://en.wikipedia.org/wiki/A".to_string(),
                "https://b.example/".to_string(),
                "https://c.example/".to_string(),
            ],
        );
        let mut registry = CitationRegistry::new();
        let html = r#"<p>Claim<a class="citation" href="https://en.wikipedia.org/wiki/A">Wikipedia +2</a></p>"#;
        let md = renderer(CitationStyle::Footnotes).render(html, &mut registry, &sources);

        assert_eq!(md, "Claim[^1][^2][^3]");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_aggregate_marker_degrades_to_visible_link() {
        let (md, registry) = render(
            r#"<p>Claim<a class="citation" href="https://en.wikipedia.org/wiki/A">wikipedia+2</a></p>"#,
            CitationStyle::Endnotes,
        );
        assert_eq!(md, "Claim[1]");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unresolvable_marker_keeps_label() {
        let (md, registry) = render(r#"<p>Claim <span class="citation">source+1</span></p>"#, CitationStyle::Endnotes);
        assert_eq!(md, "Claim source+1");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_nested_list_with_wrapped_continuation() {
        let html = "<ul><li>Parent<ul><li>Child first<br>child wrapped</li></ul></li><li>Sibling</li></ul>";
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, "- Parent\n    - Child first\n      child wrapped\n- Sibling");
    }

    #[test]
    fn test_ordered_list_start_and_paragraphs() {
        let html = r#"<ol start="3"><li><p>Third</p><p>More detail</p></li><li>Fourth</li></ol>"#;
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, "3. Third\n\n   More detail\n4. Fourth");
    }

    #[test]
    fn test_table() {
        let html = "<p>Compare:</p><table><thead><tr><th>Lang</th><th>Speed</th></tr></thead>\
            <tbody><tr><td>Rust</td><td>fast | safe</td></tr><tr><td>Go</td></tr></tbody></table>";
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(
            md,
            "Compare:\n\n| Lang | Speed |\n| --- | --- |\n| Rust | fast \\| safe |\n| Go |  |"
        );
    }

    #[test]
    fn test_empty_table_is_skipped() {
        let (md, _) = render("<p>Before</p><table></table><p>After</p>", CitationStyle::Endnotes);
        assert_eq!(md, "Before\n\nAfter");
    }

    #[test]
    fn test_code_block_with_adjacent_label() {
        let html = r#"<div class="code-block"><div class="code-language">Python</div><pre><code>print("hi")
</code></pre></div>"#;
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, "```python\nprint(\"hi\")\n```");
    }

    #[test]
    fn test_code_block_class_language() {
        let (md, _) = render(r#"<pre><code class="language-rust">fn main() {}</code></pre>"#, CitationStyle::Endnotes);
        assert_eq!(md, "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_wrapped_inline_code_becomes_fence() {
        let html = "<p>Run this:</p><code>cargo build\ncargo test</code>";
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, "Run this:\n\n```\ncargo build\ncargo test\n```");
    }

    #[test]
    fn test_multiline_code_under_inline_parent_becomes_fence() {
        let html = "<p><span>inline <code>a\nb</code></span> after</p>";
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, "inline\n\n```\na\nb\n```\n\nafter");
    }

    #[test]
    fn test_text_markdown_syntax_is_escaped() {
        let html = "<p>Use *stars* and _under_ and [x](y) with `ticks`, keep <em>this</em>.</p>";
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, r"Use \*stars\* and \_under\_ and \[x\](y) with \`ticks\`, keep *this*.");
    }

    #[test]
    fn test_citation_moved_out_of_bold() {
        let html = r#"<p><strong>Key claim<a class="citation" href="https://a.example/">a</a></strong> follows.</p>"#;
        let (md, _) = render(html, CitationStyle::Endnotes);
        assert_eq!(md, "**Key claim**[1] follows.");
    }

    #[test]
    fn test_citation_never_bolded_alone() {
        let html = r#"<p>Text <strong><a class="citation" href="https://a.example/">a</a></strong></p>"#;
        let (md, _) = render(html, CitationStyle::Inline);
        assert_eq!(md, "Text [1](https://a.example/)");
    }

    #[test]
    fn test_none_style_drops_citations_but_registers() {
        let (md, registry) = render(
            r#"<p>Claim<a class="citation" href="https://a.example/">a</a>.</p>"#,
            CitationStyle::None,
        );
        assert_eq!(md, "Claim.");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_adjacent_markers_form_one_run() {
        let html = r#"<p>Claim<a class="citation" href="https://a.example/">a</a><a class="citation" href="https://b.example/">b</a></p>"#;
        let (md, _) = render(html, CitationStyle::Parenthesized);
        assert_eq!(md, "Claim ([1](https://a.example/)) ([2](https://b.example/))");
    }

    #[test]
    fn test_blockquote_and_rule() {
        let (md, _) = render("<blockquote><p>Quoted</p><p>Twice</p></blockquote><hr><p>End</p>", CitationStyle::Endnotes);
        assert_eq!(md, "> Quoted\n>\n> Twice\n\n---\n\nEnd");
    }
}
