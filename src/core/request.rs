//! Action requests proposed by the agent loop
//!
//! An `ActionRequest` describes one side-effecting action the agent loop
//! wants to perform. It is created once, consumed exactly once by the
//! decision engine, and never mutated after creation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// How a rule's argument pattern is interpreted for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStyle {
    /// Whitespace-tokenized command strings (shell commands, extension args)
    Command,
    /// Filesystem paths with glob semantics (`*` stops at `/`, `**` recurses)
    Path,
}

/// The action family a request belongs to
///
/// The rule name is the string that appears in permission patterns, e.g.
/// `Bash(git *)` or `Edit(src/**/*.rs)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolCategory {
    /// Shell command execution (rule name `Bash`)
    Shell,
    /// File creation/overwrite (rule name `Write`)
    Write,
    /// Exact-string file edit (rule name `Edit`)
    Edit,
    /// A named extension-provided action
    Extension(String),
}

impl ToolCategory {
    /// The name this category carries in permission rule strings
    pub fn rule_name(&self) -> &str {
        match self {
            ToolCategory::Shell => "Bash",
            ToolCategory::Write => "Write",
            ToolCategory::Edit => "Edit",
            ToolCategory::Extension(name) => name,
        }
    }

    /// How argument patterns for this category are matched
    pub fn match_style(&self) -> MatchStyle {
        match self {
            ToolCategory::Write | ToolCategory::Edit => MatchStyle::Path,
            ToolCategory::Shell | ToolCategory::Extension(_) => MatchStyle::Command,
        }
    }
}

/// Typed execution data for the three backend families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionPayload {
    /// Run a shell command
    Shell {
        /// The command line to execute via `bash -c`
        command: String,
    },

    /// Create or overwrite a file
    WriteFile {
        /// Target path (absolute, or relative to the executor's base dir)
        path: PathBuf,
        /// Content to write
        content: String,
    },

    /// Replace an exact string in a file
    EditFile {
        /// Target path
        path: PathBuf,
        /// The text to replace
        old_string: String,
        /// The replacement text
        new_string: String,
        /// Replace every occurrence instead of requiring a unique match
        replace_all: bool,
    },

    /// Invoke a registered extension tool
    Extension {
        /// Name of the extension tool
        tool: String,
        /// JSON input passed to the tool
        input: Value,
    },
}

/// One proposed side-effecting action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Unique id for this request (one per agent turn)
    pub id: Uuid,
    /// What to execute
    pub payload: ActionPayload,
}

impl ActionRequest {
    /// Propose a shell command
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: ActionPayload::Shell {
                command: command.into(),
            },
        }
    }

    /// Propose a file write
    pub fn write_file(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: ActionPayload::WriteFile {
                path: path.into(),
                content: content.into(),
            },
        }
    }

    /// Propose an exact-string file edit
    pub fn edit_file(
        path: impl Into<PathBuf>,
        old_string: impl Into<String>,
        new_string: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: ActionPayload::EditFile {
                path: path.into(),
                old_string: old_string.into(),
                new_string: new_string.into(),
                replace_all: false,
            },
        }
    }

    /// Propose an extension tool invocation
    pub fn extension(tool: impl Into<String>, input: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: ActionPayload::Extension {
                tool: tool.into(),
                input,
            },
        }
    }

    /// Enable replace-all semantics on an edit request
    pub fn with_replace_all(mut self, replace: bool) -> Self {
        if let ActionPayload::EditFile { replace_all, .. } = &mut self.payload {
            *replace_all = replace;
        }
        self
    }

    /// The category this request belongs to
    pub fn category(&self) -> ToolCategory {
        match &self.payload {
            ActionPayload::Shell { .. } => ToolCategory::Shell,
            ActionPayload::WriteFile { .. } => ToolCategory::Write,
            ActionPayload::EditFile { .. } => ToolCategory::Edit,
            ActionPayload::Extension { tool, .. } => ToolCategory::Extension(tool.clone()),
        }
    }

    /// The literal argument string the pattern matcher sees
    pub fn arguments(&self) -> String {
        match &self.payload {
            ActionPayload::Shell { command } => command.clone(),
            ActionPayload::WriteFile { path, .. } => path.to_string_lossy().into_owned(),
            ActionPayload::EditFile { path, .. } => path.to_string_lossy().into_owned(),
            ActionPayload::Extension { input, .. } => input.to_string(),
        }
    }

    /// The resource this action mutates, if it can be identified
    ///
    /// Actions that share a resource key must serialize; shell commands have
    /// no identifiable resource and carry no key.
    pub fn resource_key(&self) -> Option<String> {
        match &self.payload {
            ActionPayload::WriteFile { path, .. } | ActionPayload::EditFile { path, .. } => {
                Some(normalize_resource_path(path))
            }
            ActionPayload::Shell { .. } | ActionPayload::Extension { .. } => None,
        }
    }

    /// Human-readable description of what this action will do
    pub fn describe(&self) -> String {
        match &self.payload {
            ActionPayload::Shell { command } => format!("Execute: {}", command),
            ActionPayload::WriteFile { path, .. } => {
                format!("Write file: {}", path.display())
            }
            ActionPayload::EditFile { path, .. } => format!("Edit file: {}", path.display()),
            ActionPayload::Extension { tool, .. } => format!("Invoke extension tool: {}", tool),
        }
    }
}

/// Normalize a path into a stable conflict key
///
/// Relative paths are anchored to the current directory so `a.txt` and
/// `./a.txt` collide. Symlink resolution is out of scope; the key is path
/// identity, not inode identity.
fn normalize_resource_path(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_rule_names() {
        assert_eq!(ActionRequest::shell("ls").category().rule_name(), "Bash");
        assert_eq!(
            ActionRequest::write_file("a.txt", "x").category().rule_name(),
            "Write"
        );
        assert_eq!(
            ActionRequest::edit_file("a.txt", "x", "y").category().rule_name(),
            "Edit"
        );
        assert_eq!(
            ActionRequest::extension("Fetch", json!({})).category().rule_name(),
            "Fetch"
        );
    }

    #[test]
    fn test_match_styles() {
        assert_eq!(ToolCategory::Shell.match_style(), MatchStyle::Command);
        assert_eq!(ToolCategory::Edit.match_style(), MatchStyle::Path);
        assert_eq!(ToolCategory::Write.match_style(), MatchStyle::Path);
        assert_eq!(
            ToolCategory::Extension("Fetch".into()).match_style(),
            MatchStyle::Command
        );
    }

    #[test]
    fn test_arguments() {
        let req = ActionRequest::shell("git status");
        assert_eq!(req.arguments(), "git status");

        let req = ActionRequest::write_file("src/app.js", "content");
        assert_eq!(req.arguments(), "src/app.js");
    }

    #[test]
    fn test_resource_keys() {
        assert!(ActionRequest::shell("ls").resource_key().is_none());

        let a = ActionRequest::write_file("/tmp/x/a.txt", "1").resource_key();
        let b = ActionRequest::edit_file("/tmp/x/./a.txt", "1", "2").resource_key();
        assert_eq!(a, b);
        assert!(a.is_some());

        let c = ActionRequest::write_file("/tmp/x/b.txt", "1").resource_key();
        assert_ne!(a, c);
    }

    #[test]
    fn test_unique_ids() {
        let a = ActionRequest::shell("ls");
        let b = ActionRequest::shell("ls");
        assert_ne!(a.id, b.id);
    }
}
