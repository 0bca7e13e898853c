use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Normalized extension filter: lowercase, no leading dot.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter(Vec<String>);

impl ExtensionFilter {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self(
            extensions
                .iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    /// An empty filter accepts everything.
    pub fn accepts(&self, path: &Path) -> bool {
        if self.0.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.0.contains(&e))
    }
}

/// Regular files under `root`, depth 1 unless `recursive`. Directory entries
/// that cannot be read are logged and skipped.
pub fn candidates(root: &Path, recursive: bool, filter: ExtensionFilter) -> impl Iterator<Item = PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        // Symlinks count when they point at a regular file.
        .filter(|entry| entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file()))
        .map(|entry| entry.into_path())
        .filter(move |path| filter.accepts(path))
}
