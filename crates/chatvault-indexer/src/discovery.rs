//! Export file discovery

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use chatvault_core::is_export_file;

/// Default reference corpus directory (~/.chatvault/reference)
pub fn default_reference_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
    PathBuf::from(home).join(".chatvault").join("reference")
}

/// Find every importable file under `dir`, sorted by path
///
/// A path that is itself a file is returned as-is when it has an export extension.
pub fn discover_exports(dir: &Path) -> Vec<PathBuf> {
    if dir.is_file() {
        return match dir.file_name().and_then(|n| n.to_str()) {
            Some(name) if is_export_file(name) => vec![dir.to_path_buf()],
            _ => Vec::new(),
        };
    }
    if !dir.exists() {
        return Vec::new();
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                // Hidden files are editor or OS droppings
                if !name.starts_with('.') && is_export_file(name) {
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_exports(tmp.path()).is_empty());
    }

    #[test]
    fn test_filters_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("2024").join("march");
        fs::create_dir_all(&nested).unwrap();

        fs::write(nested.join("chat.txt"), "x").unwrap();
        fs::write(tmp.path().join("thread.JSON"), "[]").unwrap();
        fs::write(tmp.path().join("page.htm"), "<p>").unwrap();
        fs::write(tmp.path().join("photo.jpg"), "jpg").unwrap();
        fs::write(tmp.path().join(".hidden.txt"), "x").unwrap();

        let files = discover_exports(tmp.path());
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 3);
        assert!(names.contains(&"chat.txt".to_string()));
        assert!(names.contains(&"thread.JSON".to_string()));
        assert!(names.contains(&"page.htm".to_string()));
    }

    #[test]
    fn test_single_file_path() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("one.txt");
        fs::write(&file, "x").unwrap();
        assert_eq!(discover_exports(&file), vec![file]);
        assert!(discover_exports(Path::new("/nonexistent/path")).is_empty());
    }
}
