//! Scratch build directory with guaranteed best-effort removal.

use std::path::Path;

use tempfile::TempDir;

use crate::error::{Error, Result};

/// Uniquely named `parabol-build-*` directory used as the Docker build
/// context for exactly one run.
///
/// Lives under the home directory rather than /tmp so the build backend
/// never copies the context across filesystems. Removed recursively when
/// dropped, so cleanup happens on every exit path; removal errors are
/// ignored and never mask the run's primary result.
pub struct ScratchDir {
    inner: TempDir,
}

impl ScratchDir {
    pub fn create() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))?;
        Self::create_in(&home)
    }

    pub fn create_in(parent: &Path) -> Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix("parabol-build-")
            .tempdir_in(parent)?;
        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create_in(parent.path()).unwrap();
            assert!(scratch.path().is_dir());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn uses_the_build_prefix() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create_in(parent.path()).unwrap();
        let name = scratch.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("parabol-build-"));
    }

    #[test]
    fn concurrent_scratch_dirs_do_not_collide() {
        let parent = tempfile::tempdir().unwrap();
        let a = ScratchDir::create_in(parent.path()).unwrap();
        let b = ScratchDir::create_in(parent.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_parent_fails_before_any_work() {
        let parent = tempfile::tempdir().unwrap();
        let gone = parent.path().join("does-not-exist");
        assert!(ScratchDir::create_in(&gone).is_err());
    }
}
