//! Entity-line index over a STEP file's flat entity list.
//!
//! One pass over the text, mapping each `#<digits>` identifier to the
//! trimmed line that defines it. Lines that don't look like entity
//! definitions are ignored; lookups for unknown ids return an empty
//! string so downstream resolvers degrade instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ENTITY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#\d+)\s*=").unwrap());

/// Immutable identifier-to-line index, built once per extraction run.
#[derive(Debug, Default)]
pub struct EntityIndex {
    lines: HashMap<String, String>,
}

impl EntityIndex {
    pub fn build(text: &str) -> Self {
        let mut lines = HashMap::new();
        for line in text.lines() {
            if let Some(caps) = ENTITY_LINE.captures(line) {
                lines.insert(caps[1].to_string(), line.trim().to_string());
            }
        }
        Self { lines }
    }

    /// Defining line for an id such as `"#522"`, or `""` when absent.
    pub fn line(&self, id: &str) -> &str {
        self.lines.get(id).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
