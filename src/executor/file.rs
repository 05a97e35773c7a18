//! File mutation backend
//!
//! Writes and exact-string edits. Failures here are OS-level or semantic
//! (string not found, ambiguous match) and are reported as execution
//! failures with the offending path; they are unrelated to the tool
//! permission concept.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{BrokerError, BrokerResult};

/// Performs file writes and edits relative to a base directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at the given base directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolve a path (handle both absolute and relative)
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Write content to a file, creating parent directories as needed
    pub(crate) fn write_file(&self, path: &Path, content: &str) -> BrokerResult<String> {
        let resolved = self.resolve_path(path);
        tracing::info!("[File] Writing: {}", resolved.display());

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BrokerError::execution(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let existed = resolved.exists();

        fs::write(&resolved, content).map_err(|e| {
            BrokerError::execution(format!("Failed to write {}: {}", resolved.display(), e))
        })?;

        if existed {
            Ok(format!("File updated successfully: {}", path.display()))
        } else {
            Ok(format!("File created successfully: {}", path.display()))
        }
    }

    /// Perform an exact string replacement in a file
    pub(crate) fn edit_file(
        &self,
        path: &Path,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> BrokerResult<String> {
        let resolved = self.resolve_path(path);
        tracing::info!("[File] Editing: {}", resolved.display());

        if old_string == new_string {
            return Err(BrokerError::execution(
                "old_string and new_string must be different",
            ));
        }

        let content = fs::read_to_string(&resolved).map_err(|e| {
            BrokerError::execution(format!("Failed to read {}: {}", resolved.display(), e))
        })?;

        let occurrences = content.matches(old_string).count();

        if occurrences == 0 {
            return Err(BrokerError::execution(
                "String not found in file. Make sure to include exact text including whitespace.",
            ));
        }

        if !replace_all && occurrences > 1 {
            return Err(BrokerError::execution(format!(
                "Found {} occurrences of the string. Either provide a more specific string \
                to ensure only one match, or use replace_all to change every instance.",
                occurrences
            )));
        }

        let new_content = if replace_all {
            content.replace(old_string, new_string)
        } else {
            content.replacen(old_string, new_string, 1)
        };

        fs::write(&resolved, &new_content).map_err(|e| {
            BrokerError::execution(format!("Failed to write {}: {}", resolved.display(), e))
        })?;

        if replace_all {
            Ok(format!(
                "Successfully replaced {} occurrences in {}",
                occurrences,
                path.display()
            ))
        } else {
            Ok(format!("Successfully replaced text in {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_file_and_parents() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let msg = backend
            .write_file(Path::new("nested/test.txt"), "Hello World")
            .unwrap();
        assert!(msg.contains("created"));

        let content = fs::read_to_string(dir.path().join("nested/test.txt")).unwrap();
        assert_eq!(content, "Hello World");
    }

    #[test]
    fn test_write_reports_update() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        backend.write_file(Path::new("a.txt"), "one").unwrap();
        let msg = backend.write_file(Path::new("a.txt"), "two").unwrap();
        assert!(msg.contains("updated"));
    }

    #[test]
    fn test_edit_replaces_unique_match() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test.txt"), "Hello World").unwrap();

        let backend = FileBackend::new(dir.path());
        backend
            .edit_file(Path::new("test.txt"), "World", "Rust", false)
            .unwrap();

        let content = fs::read_to_string(dir.path().join("test.txt")).unwrap();
        assert_eq!(content, "Hello Rust");
    }

    #[test]
    fn test_edit_rejects_ambiguous_match() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test.txt"), "aa aa").unwrap();

        let backend = FileBackend::new(dir.path());
        let err = backend
            .edit_file(Path::new("test.txt"), "aa", "bb", false)
            .unwrap_err();
        assert!(err.to_string().contains("2 occurrences"));
    }

    #[test]
    fn test_edit_replace_all() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test.txt"), "aa aa").unwrap();

        let backend = FileBackend::new(dir.path());
        backend
            .edit_file(Path::new("test.txt"), "aa", "bb", true)
            .unwrap();

        let content = fs::read_to_string(dir.path().join("test.txt")).unwrap();
        assert_eq!(content, "bb bb");
    }

    #[test]
    fn test_edit_missing_file_is_descriptive() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let err = backend
            .edit_file(Path::new("missing.txt"), "a", "b", false)
            .unwrap_err();
        assert!(matches!(err, BrokerError::ExecutionFailure(_)));
        assert!(err.to_string().contains("missing.txt"));
    }
}
