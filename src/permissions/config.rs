//! Permission configuration files
//!
//! External collaborator format: a JSON object with `allowedTools` and
//! `deniedTools` arrays of rule strings, loaded from a user-global path and
//! a project-local path at session start. A file that cannot be read or
//! parsed fails closed: its scope loads empty, so everything in it falls
//! back to prompting.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{BrokerError, BrokerResult};

use super::rule::{PermissionRule, RuleScope, RuleSource};

/// Project-local configuration path, relative to the project root
pub const PROJECT_CONFIG_RELATIVE: &str = ".toolbroker/permissions.json";

/// On-disk permission configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsFile {
    /// Rule strings that resolve to Allow
    #[serde(default, rename = "allowedTools")]
    pub allowed_tools: Vec<String>,

    /// Rule strings that resolve to Deny
    #[serde(default, rename = "deniedTools")]
    pub denied_tools: Vec<String>,
}

impl PermissionsFile {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the file holds no rules
    pub fn is_empty(&self) -> bool {
        self.allowed_tools.is_empty() && self.denied_tools.is_empty()
    }
}

/// The user-global configuration path (`$HOME/.toolbroker/permissions.json`)
pub fn user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(PROJECT_CONFIG_RELATIVE))
}

/// The project-local configuration path under a project root
pub fn project_config_path(project_dir: impl AsRef<Path>) -> PathBuf {
    project_dir.as_ref().join(PROJECT_CONFIG_RELATIVE)
}

/// Load a configuration file
///
/// A missing file is an empty configuration; an unreadable or unparsable
/// file is `ConfigurationCorrupt`.
pub fn load_file(path: &Path) -> BrokerResult<PermissionsFile> {
    if !path.exists() {
        return Ok(PermissionsFile::new());
    }

    let file = File::open(path).map_err(|e| BrokerError::ConfigurationCorrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|e| BrokerError::ConfigurationCorrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Write a configuration file, creating parent directories as needed
pub fn save_file(path: &Path, config: &PermissionsFile) -> BrokerResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, config)?;
    Ok(())
}

/// Convert a loaded file into rules for one scope
///
/// Invalid rule strings are skipped with a warning rather than granting
/// anything by accident.
pub fn rules_from_file(
    config: &PermissionsFile,
    scope: RuleScope,
    path: &Path,
) -> Vec<PermissionRule> {
    let source = RuleSource::File(path.to_path_buf());
    let mut rules = Vec::new();

    for entry in &config.allowed_tools {
        match PermissionRule::allow(entry, scope, source.clone()) {
            Ok(rule) => rules.push(rule),
            Err(e) => tracing::warn!("[Config] Skipping allowedTools entry '{}': {}", entry, e),
        }
    }
    for entry in &config.denied_tools {
        match PermissionRule::deny(entry, scope, source.clone()) {
            Ok(rule) => rules.push(rule),
            Err(e) => tracing::warn!("[Config] Skipping deniedTools entry '{}': {}", entry, e),
        }
    }

    rules
}

/// Load one scope's rules, failing closed on corruption
///
/// Corrupt configuration never grants anything: the scope loads empty and
/// every action it would have covered falls back to prompting.
pub fn load_scope_or_empty(path: &Path, scope: RuleScope) -> Vec<PermissionRule> {
    match load_file(path) {
        Ok(config) => {
            let rules = rules_from_file(&config, scope, path);
            tracing::info!(
                "[Config] Loaded {} rules for scope {:?} from {}",
                rules.len(),
                scope,
                path.display()
            );
            rules
        }
        Err(e) => {
            tracing::warn!("[Config] Failing closed, scope {:?} loads empty: {}", scope, e);
            Vec::new()
        }
    }
}

/// Append rule strings to a file's `allowedTools`, deduplicated
///
/// Used to persist session grants into the project scope on explicit user
/// action. Refuses to overwrite a corrupt file.
pub fn append_allowed(path: &Path, patterns: &[String]) -> BrokerResult<usize> {
    let mut config = load_file(path)?;

    let mut added = 0;
    for pattern in patterns {
        if !config.allowed_tools.contains(pattern) {
            config.allowed_tools.push(pattern.clone());
            added += 1;
        }
    }

    if added > 0 {
        save_file(path, &config)?;
        tracing::info!(
            "[Config] Persisted {} session grants to {}",
            added,
            path.display()
        );
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let config = load_file(&dir.path().join("nope.json")).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = project_config_path(dir.path());

        let config = PermissionsFile {
            allowed_tools: vec!["Bash(git *)".into(), "Edit".into()],
            denied_tools: vec!["Bash(rm *)".into()],
        };
        save_file(&path, &config).unwrap();

        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded.allowed_tools, config.allowed_tools);
        assert_eq!(loaded.denied_tools, config.denied_tools);
    }

    #[test]
    fn test_key_names_match_external_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        fs::write(
            &path,
            r#"{"allowedTools": ["Edit"], "deniedTools": ["Bash(sudo *)"]}"#,
        )
        .unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.allowed_tools, vec!["Edit"]);
        assert_eq!(config.denied_tools, vec!["Bash(sudo *)"]);
    }

    #[test]
    fn test_corrupt_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, BrokerError::ConfigurationCorrupt { .. }));
    }

    #[test]
    fn test_corrupt_file_fails_closed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        fs::write(&path, "{ not json").unwrap();

        let rules = load_scope_or_empty(&path, RuleScope::Project);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let config = PermissionsFile {
            allowed_tools: vec!["Bash(git *)".into(), "Bash(broken".into()],
            denied_tools: vec![],
        };
        let rules = rules_from_file(&config, RuleScope::Global, Path::new("perm.json"));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].pattern.to_string(), "Bash(git *)");
    }

    #[test]
    fn test_append_allowed_dedupes() {
        let dir = tempdir().unwrap();
        let path = project_config_path(dir.path());
        save_file(
            &path,
            &PermissionsFile {
                allowed_tools: vec!["Edit".into()],
                denied_tools: vec![],
            },
        )
        .unwrap();

        let added = append_allowed(
            &path,
            &["Edit".to_string(), "Bash(git *)".to_string()],
        )
        .unwrap();
        assert_eq!(added, 1);

        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded.allowed_tools, vec!["Edit", "Bash(git *)"]);
    }

    #[test]
    fn test_append_refuses_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        fs::write(&path, "broken").unwrap();

        assert!(append_allowed(&path, &["Edit".to_string()]).is_err());
        // Original content untouched
        assert_eq!(fs::read_to_string(&path).unwrap(), "broken");
    }
}
