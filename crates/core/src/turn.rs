use std::fmt;

use serde::Serialize;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("User"),
            Role::Assistant => f.write_str("Assistant"),
        }
    }
}

/// One rendered unit of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    /// Markdown with citations already rendered in the attempt's style.
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A result is usable once it holds at least one complete exchange.
pub fn is_sufficient(turns: &[Turn]) -> bool {
    turns.len() >= 2
}

/// Join consecutive turns of the same role and drop empty ones.
///
/// Virtualized pages often mount one answer as several blocks.
pub fn merge_adjacent(turns: Vec<Turn>) -> Vec<Turn> {
    let mut merged: Vec<Turn> = Vec::with_capacity(turns.len());
    for turn in turns {
        let content = turn.content.trim();
        if content.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.role == turn.role => {
                last.content.push_str("\n\n");
                last.content.push_str(content);
            }
            _ => merged.push(Turn::new(turn.role, content)),
        }
    }
    merged
}

const FINGERPRINT_HEAD: usize = 200;
const FINGERPRINT_TAIL: usize = 50;

/// Dedup key for a block: first 200 and last 50 characters plus the length.
///
/// Survives re-mounting by virtualized lists, which produce byte-identical
/// text but fresh elements.
pub fn fingerprint(text: &str) -> String {
    let normalized: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let total = normalized.chars().count();
    let head: String = normalized.chars().take(FINGERPRINT_HEAD).collect();
    let tail: String = normalized.chars().skip(total.saturating_sub(FINGERPRINT_TAIL)).collect();
    format!("{}\u{1f}{}\u{1f}{}", head, tail, total)
}
