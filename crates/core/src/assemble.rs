use crate::registry::CitationRegistry;
use crate::style::CitationStyle;
use crate::turn::Turn;

/// Configuration for document assembly
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Document title, written as an H1 heading
    pub title: Option<String>,
    /// Put each turn under a `## User` / `## Assistant` heading
    pub role_headings: bool,
    /// Include TOML frontmatter
    pub frontmatter: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self { title: None, role_headings: true, frontmatter: false }
    }
}

/// Build the final document from rendered turns.
///
/// For styles with an index the registry's citations are appended in
/// registration order; the registry is only read from here on.
pub fn assemble(turns: &[Turn], registry: &CitationRegistry, style: CitationStyle, options: &AssembleOptions) -> String {
    let mut output = String::new();

    if options.frontmatter {
        output.push_str(&generate_frontmatter(turns, registry, style, options));
        output.push('\n');
    }

    if let Some(title) = &options.title {
        output.push_str(&format!("# {}\n\n", title));
    }

    let sections: Vec<String> = turns
        .iter()
        .map(|turn| {
            if options.role_headings {
                format!("## {}\n\n{}", turn.role, turn.content)
            } else {
                turn.content.clone()
            }
        })
        .collect();
    output.push_str(&sections.join("\n\n"));

    if style.needs_index() && !registry.is_empty() {
        let index: Vec<String> = registry
            .citations()
            .iter()
            .filter_map(|citation| style.index_entry(citation))
            .collect();
        output.push_str("\n\n");
        output.push_str(&index.join("\n"));
    }

    output.push('\n');
    output
}

/// Generate TOML frontmatter describing the export
fn generate_frontmatter(
    turns: &[Turn], registry: &CitationRegistry, style: CitationStyle, options: &AssembleOptions,
) -> String {
    let mut frontmatter = String::from("+++");

    if let Some(title) = &options.title {
        frontmatter.push_str(&format!("\ntitle = {}", toml_escape_string(title)));
    }

    frontmatter.push_str(&format!("\ncitation_style = {}", toml_escape_string(&style.to_string())));
    frontmatter.push_str(&format!("\nturns = {}", turns.len()));
    frontmatter.push_str(&format!("\ncitations = {}", registry.len()));
    frontmatter.push_str("\n+++\n");

    frontmatter
}

/// Escape a string for TOML format
fn toml_escape_string(s: &str) -> String {
    let needs_escape = s.contains('"') || s.contains('\\') || s.contains('\n');
    if needs_escape {
        format!(
            "\"{}\"",
            s.replace('\\', "\\\\").replace('\"', "\\\"").replace('\n', "\\n")
        )
    } else {
        format!("\"{}\"", s)
    }
}
