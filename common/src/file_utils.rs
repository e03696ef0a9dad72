//! File utility functions for listing and filtering files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extensions of the tab-separated result tables the screen writes.
pub const TABLE_EXTENSIONS: &[&str] = &["txt", "tsv"];

/// Returns paths to all regular files in `dir` matching the given extensions,
/// sorted by file name. Extensions are matched case-insensitively.
///
/// A missing directory yields an empty list; other read errors are returned.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        if extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Returns paths to all result tables directly inside `dir`.
pub fn table_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    files_with_extensions(dir, TABLE_EXTENSIONS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fresh_test_dir;

    #[test]
    fn test_missing_dir_is_empty() {
        let dir = fresh_test_dir("file_utils_missing").join("nope");
        assert!(files_with_extensions(&dir, &["txt"]).unwrap().is_empty());
    }

    #[test]
    fn test_filters_by_extension_and_sorts() {
        let dir = fresh_test_dir("file_utils_filter");
        for name in ["plate 2.txt", "plate 1.TXT", "notes.md", "ranking.tsv"] {
            fs::write(dir.join(name), "x").unwrap();
        }
        fs::create_dir_all(dir.join("W strains.txt")).unwrap();

        let files = table_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["plate 1.TXT", "plate 2.txt", "ranking.tsv"]);
    }
}
