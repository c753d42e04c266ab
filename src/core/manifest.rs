//! Reads the clone's `package.json` to resolve the Node toolchain version.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct PackageManifest {
    engines: Option<Engines>,
}

#[derive(Debug, Deserialize)]
struct Engines {
    node: Option<String>,
}

/// Node version token for the `_NODE_VERSION` build argument: the
/// `engines.node` range with a leading caret stripped
/// (`"^22.0.0"` -> `22.0.0`, `"22"` -> `22`).
pub fn node_version(repo_dir: &Path) -> Result<String> {
    let path = repo_dir.join("package.json");
    let raw = fs::read_to_string(&path)
        .map_err(|e| Error::Manifest(format!("cannot read {}: {}", path.display(), e)))?;
    let manifest: PackageManifest = serde_json::from_str(&raw)
        .map_err(|e| Error::Manifest(format!("invalid {}: {}", path.display(), e)))?;

    manifest
        .engines
        .and_then(|engines| engines.node)
        .map(|range| strip_caret(&range))
        .ok_or_else(|| Error::Manifest(format!("{} has no engines.node field", path.display())))
}

fn strip_caret(range: &str) -> String {
    let trimmed = range.trim();
    trimmed.strip_prefix('^').unwrap_or(trimmed).to_string()
}
