//! Markdown turns that arrive already rendered.
//!
//! Such a turn carries local citation markers (`[1]`, `[^1_2]`, `[1](url)`,
//! `[wikipedia+2](url)`) and usually a trailing reference list. The list is
//! parsed into [`LocalReference`]s, markers are rewritten to global numbers in
//! body order, and the list itself is dropped; the assembler writes the global
//! index.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::lookup::{SourceLookup, is_aggregate_label, normalize_label};
use crate::registry::{CitationRegistry, canonicalize};
use crate::render::layout::{apply_spacing, closes_fence, fence};
use crate::render::{RenderOptions, push_citation};
use crate::style::{CitationStyle, CitedSource, dedupe_run, domain_label};

static REF_FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\^([^\]\s]+)\]:\s*<?([^\s>]+)>?(?:\s.*)?$").unwrap());
static REF_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:(\d+)[.)]?\s+)?\[([^\]]+)\]\(([^)\s]+)\)(?:\s.*)?$").unwrap());
static REF_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(\d+)\]:?\s+<?([^\s>]+)>?(?:\s.*)?$").unwrap());
static REF_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)]?\s+<?([^\s>]+)>?(?:\s.*)?$").unwrap());
static REF_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#{1,6}\s*)?(?:\*\*)?(?:references|sources|citations)(?:\*\*)?:?\s*$").unwrap()
});

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\(\[(?P<plabel>[^\]\s]+)\]\((?P<purl>[^)\s]+)\)\)",
        r"|\[(?P<llabel>[^\]\s]+)\]\((?P<lurl>[^)\s]+)\)",
        r"|\[\^(?P<foot>[^\]\s]+)\]",
        r"|\[(?P<num>\d+)\]",
        r"|(?i:\b(?P<agg>[a-z0-9][a-z0-9.-]*\+\d+)\b)",
    ))
    .unwrap()
});

/// A marker key and the URL the turn's own reference list gives for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReference {
    pub key: String,
    pub url: String,
}

/// Rewrites a pre-rendered Markdown turn to global citation numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrerenderedRenderer {
    options: RenderOptions,
}

impl PrerenderedRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render one turn. Definitions the body never cites are not registered.
    pub fn render(&self, markdown: &str, registry: &mut CitationRegistry, sources: &SourceLookup) -> String {
        let (body, refs) = split_references(markdown);
        let mut local = local_map(&refs);
        let style = self.options.style;

        let rewritten = map_body_lines(&body, |line| {
            let groups = scan_line(line, |caps| resolve_unit(caps, &mut local, sources));
            render_line(line, &groups, registry, style)
        });

        apply_spacing(&rewritten, self.options.spacing).trim().to_string()
    }
}

/// URL lists of every resolved marker run in a turn, in body order.
pub fn local_runs(markdown: &str) -> Vec<Vec<String>> {
    let (body, refs) = split_references(markdown);
    let mut local = local_map(&refs);
    let sources = SourceLookup::new();
    let mut runs: Vec<Vec<String>> = Vec::new();

    map_body_lines(&body, |line| {
        for group in scan_line(line, |caps| resolve_unit(caps, &mut local, &sources)) {
            let mut seen: Vec<String> = Vec::new();
            let mut urls: Vec<String> = Vec::new();
            for url in group.urls {
                let key = canonicalize(&url);
                if !seen.contains(&key) {
                    seen.push(key);
                    urls.push(url);
                }
            }
            runs.push(urls);
        }
        String::new()
    });

    runs
}

/// Split a turn into its body and trailing reference list.
pub fn split_references(markdown: &str) -> (String, Vec<LocalReference>) {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut refs: Vec<LocalReference> = Vec::new();
    let mut cut = lines.len();

    for (i, line) in lines.iter().enumerate().rev() {
        if line.trim().is_empty() || is_reference_trailer(line) {
            cut = i;
            continue;
        }
        match reference_line(line) {
            Some(reference) => {
                refs.push(reference);
                cut = i;
            }
            None => break,
        }
    }

    let body = lines[..cut].join("\n");
    if refs.is_empty() || !cites_any(&body, &refs) {
        return (markdown.to_string(), Vec::new());
    }
    refs.reverse();
    (body, refs)
}

/// Whether any marker in the body names one of the trailing keys. A trailing
/// list nothing cites is ordinary content.
fn cites_any(body: &str, refs: &[LocalReference]) -> bool {
    let mut cited = false;
    map_body_lines(body, |line| {
        cited = cited
            || MARKER.captures_iter(line).any(|caps| {
                let key = caps
                    .name("foot")
                    .or_else(|| caps.name("num"))
                    .or_else(|| caps.name("plabel"))
                    .or_else(|| caps.name("llabel"));
                key.is_some_and(|key| refs.iter().any(|r| r.key == key.as_str()))
            });
        String::new()
    });
    cited
}

fn is_reference_trailer(line: &str) -> bool {
    let trimmed = line.trim();
    REF_HEADING.is_match(trimmed) || (trimmed.contains('⁂') && (trimmed == "⁂" || trimmed.starts_with("<div")))
}

fn looks_like_url(candidate: &str) -> bool {
    candidate.contains("://") || candidate.starts_with("www.")
}

fn reference_line(line: &str) -> Option<LocalReference> {
    let reference = |key: &str, url: &str| {
        looks_like_url(url).then(|| LocalReference { key: key.to_string(), url: url.to_string() })
    };

    if let Some(caps) = REF_FOOTNOTE.captures(line) {
        return reference(caps.get(1)?.as_str(), caps.get(2)?.as_str());
    }
    if let Some(caps) = REF_LINK.captures(line) {
        let label = caps.get(2)?.as_str();
        let key = match caps.get(1) {
            Some(number) => number.as_str(),
            None if label.chars().all(|c| c.is_ascii_digit()) => label,
            None => return None,
        };
        return reference(key, caps.get(3)?.as_str());
    }
    if let Some(caps) = REF_BRACKET.captures(line) {
        return reference(caps.get(1)?.as_str(), caps.get(2)?.as_str());
    }
    let caps = REF_NUMBERED.captures(line)?;
    reference(caps.get(1)?.as_str(), caps.get(2)?.as_str())
}

fn local_map(refs: &[LocalReference]) -> HashMap<String, String> {
    let mut local: HashMap<String, String> = HashMap::new();
    for reference in refs {
        local.entry(reference.key.clone()).or_insert_with(|| reference.url.clone());
    }
    local
}

/// Apply `f` to every line outside fenced code.
fn map_body_lines(body: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut open: Option<String> = None;
    let mut out: Vec<String> = Vec::new();

    for line in body.lines() {
        if let Some(marker) = &open {
            if closes_fence(line, marker) {
                open = None;
            }
            out.push(line.to_string());
            continue;
        }
        if let Some((_, marker)) = fence(line) {
            open = Some(marker.to_string());
            out.push(line.to_string());
            continue;
        }
        out.push(f(line));
    }

    out.join("\n")
}

/// A maximal run of resolved markers separated only by spaces or tabs.
#[derive(Debug)]
struct Group {
    start: usize,
    end: usize,
    urls: Vec<String>,
}

fn scan_line(line: &str, mut resolve: impl FnMut(&Captures) -> Option<Vec<String>>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut open: Option<Group> = None;

    for caps in MARKER.captures_iter(line) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        let Some(urls) = resolve(&caps) else {
            groups.extend(open.take());
            continue;
        };

        let adjacent = open
            .as_ref()
            .is_some_and(|g| line[g.end..m.start()].chars().all(|c| c == ' ' || c == '\t'));
        if adjacent && let Some(group) = open.as_mut() {
            group.end = m.end();
            group.urls.extend(urls);
        } else {
            groups.extend(open.take());
            open = Some(Group { start: m.start(), end: m.end(), urls });
        }
    }

    groups.extend(open);
    groups
}

fn resolve_unit(caps: &Captures, local: &mut HashMap<String, String>, sources: &SourceLookup) -> Option<Vec<String>> {
    let label = caps.name("plabel").or_else(|| caps.name("llabel"));
    let url = caps.name("purl").or_else(|| caps.name("lurl"));
    if let (Some(label), Some(url)) = (label, url) {
        return resolve_link(label.as_str(), url.as_str(), local, sources);
    }

    if let Some(key) = caps.name("foot").or_else(|| caps.name("num")) {
        return local.get(key.as_str()).map(|url| vec![url.clone()]);
    }

    let label = caps.name("agg")?;
    sources.get(label.as_str()).map(<[String]>::to_vec)
}

/// `[n](url)` defines `n` on first sight; `[domain](url)` and
/// `[domain+k](url)` are named markers. Any other link is ordinary text.
fn resolve_link(
    label: &str, url: &str, local: &mut HashMap<String, String>, sources: &SourceLookup,
) -> Option<Vec<String>> {
    if label.chars().all(|c| c.is_ascii_digit()) {
        let url = local.entry(label.to_string()).or_insert_with(|| url.to_string());
        return Some(vec![url.clone()]);
    }

    let label = normalize_label(label);
    let domain = domain_label(url);
    if domain.is_empty() {
        return None;
    }
    if label == domain {
        return Some(vec![url.to_string()]);
    }

    let (name, _) = label.rsplit_once('+')?;
    if name != domain || !is_aggregate_label(&label) {
        return None;
    }
    Some(sources.get(&label).map(<[String]>::to_vec).unwrap_or_else(|| vec![url.to_string()]))
}

fn render_line(line: &str, groups: &[Group], registry: &mut CitationRegistry, style: CitationStyle) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;

    for group in groups {
        out.push_str(&line[last..group.start]);
        let run: Vec<CitedSource> = group
            .urls
            .iter()
            .map(|url| CitedSource::register(registry, url, None))
            .collect();
        push_citation(&mut out, &style.render_run(&dedupe_run(run)), style);
        last = group.end;
    }

    out.push_str(&line[last..]);
    out
}
