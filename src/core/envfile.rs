//! Line-based key patcher for `.env`-style files.
//!
//! Contract: after patching, each rule's key appears exactly once, whether
//! the key was present, commented out, or missing entirely. Untouched lines
//! keep their order. Patching is idempotent because every replacement line
//! matches its own rule.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};

/// A single key rewrite: any line carrying `key` (optionally commented out)
/// is replaced wholesale by `line`.
#[derive(Debug, Clone)]
pub struct PatchRule {
    pub key: String,
    pub line: String,
}

impl PatchRule {
    pub fn new(key: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            line: line.into(),
        }
    }

    /// Anchored matcher: optional leading comment marker and whitespace,
    /// then the key, then `=`. A key appearing inside a value string does
    /// not match.
    fn matcher(&self) -> Result<Regex> {
        let pattern = format!(r"^\s*#?\s*{}\s*=", regex::escape(&self.key));
        Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid patch key '{}': {}", self.key, e)))
    }
}

/// Apply `rules` in order to the file content and return the new content.
///
/// Output is normalized: lines are rejoined with `\n` (a CRLF input comes
/// back as LF, even on untouched lines) and non-empty output always ends
/// with a single trailing newline.
pub fn patch_content(content: &str, rules: &[PatchRule]) -> Result<String> {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    for rule in rules {
        let matcher = rule.matcher()?;
        let mut replaced = false;
        let mut kept = Vec::with_capacity(lines.len());

        for line in lines.drain(..) {
            if matcher.is_match(&line) {
                // Later duplicates collapse into the first occurrence
                if !replaced {
                    kept.push(rule.line.clone());
                    replaced = true;
                }
            } else {
                kept.push(line);
            }
        }

        if !replaced {
            kept.push(rule.line.clone());
        }

        lines = kept;
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

/// Patch a file in place.
pub fn patch_file(path: &Path, rules: &[PatchRule]) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let patched = patch_content(&content, rules)?;
    fs::write(path, patched)?;
    Ok(())
}
