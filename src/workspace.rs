use std::path::{Path, PathBuf};
use log::{debug, warn};
use tempfile::TempDir;

use crate::error::{IoContext, Result};

const WORKSPACE_PREFIX: &str = ".videoredact-";

/// RAII handle for the per-run scratch directory.
///
/// Everything the run writes besides the final output (segment files and
/// the concat manifest) lives under [`Workspace::path`]. The directory tree
/// is removed by [`Workspace::close`] or, failing that, on drop.
#[derive(Debug)]
pub struct Workspace {
    root: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a uniquely named workspace under `parent`.
    ///
    /// `base_name_hint` (usually the input file name) becomes a subdirectory
    /// so that leftover directories are easy to attribute.
    pub fn open(parent: &Path, base_name_hint: &str) -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .with_path(parent)?;

        let hint = sanitize_hint(base_name_hint);
        let path = root.path().join(hint);
        std::fs::create_dir_all(&path).with_path(path.clone())?;

        debug!("Opened workspace {:?}", path);
        Ok(Self {
            root: Some(root),
            path,
        })
    }

    /// Directory to place run artifacts in
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.root.is_some()
    }

    /// Recursively remove the workspace. Safe to call more than once;
    /// removal failures are logged, never returned.
    pub fn close(&mut self) {
        if let Some(root) = self.root.take() {
            let root_path = root.path().to_path_buf();
            match root.close() {
                Ok(()) => debug!("Removed workspace {:?}", root_path),
                Err(e) => warn!("Failed to remove workspace {:?}: {}", root_path, e),
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.close();
    }
}

fn sanitize_hint(hint: &str) -> String {
    let cleaned: String = hint
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "run".to_string(),
        other => other.to_string(),
    }
}
