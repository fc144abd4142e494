use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::Config;

/// Expands import arguments into the list of files to import.
///
/// Files are kept as given. Directories are walked recursively and yield
/// every file whose extension is accepted by the configuration, in sorted
/// order. Hidden entries inside directories are skipped.
#[must_use]
pub fn collect_sources(paths: &[PathBuf], config: &Config) -> Vec<PathBuf> {
    let mut sources = Vec::new();

    for path in paths {
        if path.is_dir() {
            sources.extend(walk(path, config));
        } else {
            sources.push(path.clone());
        }
    }

    sources
}

fn walk(root: &Path, config: &Config) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| config.accepts_extension(e))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}
