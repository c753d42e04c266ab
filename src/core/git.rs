//! Git operations against the upstream repository.

use std::path::Path;

use crate::error::Result;
use crate::runner::{require_success, CommandRunner, Invocation};

/// Shallow-clone (depth 1) a repository into `dest`. Fatal on failure; no
/// retry.
pub fn clone_shallow(runner: &dyn CommandRunner, url: &str, dest: &Path) -> Result<()> {
    let dest = dest.to_string_lossy();
    let output = runner.run(&Invocation::new(
        "git",
        ["clone", "--depth", "1", url, dest.as_ref()],
    ))?;
    require_success(&output, "git clone")
}

/// The HEAD commit hash of a cloned repository.
pub fn head_sha(runner: &dyn CommandRunner, repo_dir: &Path) -> Result<String> {
    let dir = repo_dir.to_string_lossy();
    let output = runner.run_capture(&Invocation::new(
        "git",
        ["-C", dir.as_ref(), "rev-parse", "HEAD"],
    ))?;
    require_success(&output, "git rev-parse")?;
    Ok(output.stdout.trim().to_string())
}

/// Whether a usable git client is on PATH.
pub fn available(runner: &dyn CommandRunner) -> bool {
    runner
        .run_capture(&Invocation::new("git", ["--version"]))
        .map(|output| output.success)
        .unwrap_or(false)
}
