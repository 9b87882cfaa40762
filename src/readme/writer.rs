//! Atomic document output

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replaces the file at `path` with `contents`
///
/// The document is written to a temporary file in the same directory and
/// renamed over the target, so a killed process never leaves a truncated file.
pub fn write_document(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("README.md");

        write_document(&path, "# hello\n").expect("Write should succeed");

        assert_eq!(fs::read_to_string(&path).unwrap(), "# hello\n");
    }

    #[test]
    fn test_write_replaces_existing_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("README.md");
        fs::write(&path, "old content that is much longer than the new one").unwrap();

        write_document(&path, "new").expect("Write should succeed");

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("README.md");

        write_document(&path, "a").unwrap();
        write_document(&path, "b").unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("README.md")]);
    }

    #[test]
    fn test_write_fails_for_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("missing").join("README.md");

        assert!(write_document(&path, "x").is_err());
    }
}
