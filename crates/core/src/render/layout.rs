//! Line-level Markdown normalization shared by both renderers.
//!
//! List continuation realignment and the blank-line spacing policy. Fenced
//! code and table blocks are masked with placeholders before spacing runs so
//! their interior lines are never touched.

use std::sync::LazyLock;

use regex::Regex;

use crate::style::Spacing;

/// Column width of one list nesting level.
pub const LIST_INDENT: usize = 4;

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^( *)([-*+]|\d{1,9}[.)]) +\S").unwrap());
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}(?:-{3,}|\*{3,}|_{3,}) *$").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}#{1,6}(?: |$)").unwrap());
static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *(```+|~~~+)").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").unwrap());
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new("\u{E002}([CT])(\\d+)\u{E003}").unwrap());

/// List item marker on a line: `(indent, marker)`.
pub(crate) fn list_item(line: &str) -> Option<(usize, &str)> {
    let caps = LIST_ITEM.captures(line)?;
    let indent = caps.get(1)?.as_str().len();
    let marker = caps.get(2)?.as_str();
    Some((indent, marker))
}

pub(crate) fn is_rule(line: &str) -> bool {
    RULE.is_match(line)
}

fn is_heading(line: &str) -> bool {
    HEADING.is_match(line)
}

fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Fence opener on a line: `(indent, fence)`.
pub(crate) fn fence(line: &str) -> Option<(usize, &str)> {
    let caps = FENCE.captures(line)?;
    let m = caps.get(1)?;
    Some((m.start(), m.as_str()))
}

pub(crate) fn closes_fence(line: &str, open: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with(open) && trimmed.chars().all(|c| c == open.chars().next().unwrap_or('`'))
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Realign wrapped list continuation lines to their item's content column.
///
/// A text line directly after a list item (or after one of its continuation
/// lines) indented at or below the item's marker is shifted to the item's
/// content column. A blank line followed by such a line ends the list.
/// Headings, table rows, rules and fences end the current item.
pub fn reindent_list_continuations(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut item: Option<(usize, usize)> = None;
    let mut open_fence: Option<String> = None;
    let mut after_blank = false;

    for line in markdown.lines() {
        if let Some(open) = &open_fence {
            if closes_fence(line, open) {
                open_fence = None;
            }
            out.push(line.to_string());
            continue;
        }

        if let Some((indent, marker)) = fence(line) {
            if item.is_some_and(|(item_indent, _)| indent <= item_indent) {
                item = None;
            }
            open_fence = Some(marker.to_string());
            after_blank = false;
            out.push(line.to_string());
            continue;
        }

        if line.trim().is_empty() {
            after_blank = true;
            out.push(String::new());
            continue;
        }

        if is_heading(line) || is_table_row(line) || is_rule(line) {
            item = None;
            after_blank = false;
            out.push(line.to_string());
            continue;
        }

        if let Some((indent, marker)) = list_item(line) {
            item = Some((indent, indent + marker.len() + 1));
            after_blank = false;
            out.push(line.to_string());
            continue;
        }

        match item {
            Some((item_indent, content_col)) if leading_spaces(line) <= item_indent => {
                if after_blank {
                    item = None;
                    out.push(line.to_string());
                } else {
                    out.push(format!("{}{}", " ".repeat(content_col), line.trim_start()));
                }
            }
            _ => out.push(line.to_string()),
        }
        after_blank = false;
    }

    out.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protected {
    Code,
    Table,
}

/// Replace fenced code and table blocks with single placeholder lines.
fn protect_blocks(markdown: &str) -> (String, Vec<String>) {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut blocks: Vec<String> = Vec::new();
    let mut i = 0;

    let mut push_block = |kind: Protected, body: &[&str], out: &mut Vec<String>| {
        let tag = match kind {
            Protected::Code => 'C',
            Protected::Table => 'T',
        };
        out.push(format!("\u{E002}{}{}\u{E003}", tag, blocks.len()));
        blocks.push(body.join("\n"));
    };

    while i < lines.len() {
        let line = lines[i];
        if let Some((_, open)) = fence(line) {
            let start = i;
            i += 1;
            while i < lines.len() && !closes_fence(lines[i], open) {
                i += 1;
            }
            let end = (i + 1).min(lines.len());
            push_block(Protected::Code, &lines[start..end], &mut out);
            i = end;
            continue;
        }
        if is_table_row(line) {
            let start = i;
            while i < lines.len() && is_table_row(lines[i]) {
                i += 1;
            }
            push_block(Protected::Table, &lines[start..i], &mut out);
            continue;
        }
        out.push(line.to_string());
        i += 1;
    }

    (out.join("\n"), blocks)
}

fn restore_blocks(masked: &str, blocks: &[String]) -> String {
    PLACEHOLDER
        .replace_all(masked, |caps: &regex::Captures| {
            caps.get(2)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .and_then(|index| blocks.get(index))
                .cloned()
                .unwrap_or_default()
        })
        .to_string()
}

fn is_table_placeholder(line: &str) -> bool {
    PLACEHOLDER
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .is_some_and(|m| m.as_str() == "T")
}

/// Apply a spacing policy, leaving code and table interiors untouched.
pub fn apply_spacing(markdown: &str, spacing: Spacing) -> String {
    let (masked, blocks) = protect_blocks(markdown);

    let spaced = match spacing {
        Spacing::Standard => BLANK_RUN.replace_all(&masked, "\n\n").to_string(),
        Spacing::Compact => {
            let mut out: Vec<&str> = Vec::new();
            for line in masked.lines().filter(|l| !l.trim().is_empty()) {
                if is_table_placeholder(line) && !out.is_empty() {
                    out.push("");
                }
                out.push(line);
            }
            out.join("\n")
        }
    };

    restore_blocks(&spaced, &blocks)
}
