//! Workspace settings pulled via `workspace/configuration`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A diagnostic suppressed by configuration, identified by front-end
/// subsystem and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredDiagnostic {
    pub subsystem: i32,
    pub code: i32,
}

/// Include search paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeDirs {
    pub user: Vec<PathBuf>,
    pub system: Vec<PathBuf>,
}

/// Everything the client can configure. Every field is optional on the
/// wire; absent fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceSettings {
    pub workspace_dirs: Vec<PathBuf>,
    pub excluded_paths: Vec<PathBuf>,
    /// Glob patterns, compiled to regexes for exclusion checks.
    pub excluded_patterns: Vec<String>,
    pub ignored_diagnostics: Vec<IgnoredDiagnostic>,
    pub top_level: Option<String>,
    pub includes: IncludeDirs,
    pub valid_extensions: Vec<String>,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            workspace_dirs: Vec::new(),
            excluded_paths: Vec::new(),
            excluded_patterns: Vec::new(),
            ignored_diagnostics: Vec::new(),
            top_level: None,
            includes: IncludeDirs::default(),
            valid_extensions: vec![".sv".to_string(), ".svh".to_string(), ".v".to_string()],
        }
    }
}

impl WorkspaceSettings {
    /// Whether `path` has one of the accepted extensions.
    pub fn accepts_extension(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.valid_extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()))
    }

    /// Whether `path` is excluded by an explicit path or a pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.iter().any(|p| path.starts_with(p)) {
            return true;
        }
        let text = path.to_string_lossy();
        self.excluded_patterns
            .iter()
            .filter_map(|pattern| glob_to_regex(pattern))
            .any(|regex| regex.is_match(&text))
    }
}

/// Glob to anchored regex: `**` crosses directories, `*` does not, `?`
/// is one character.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_with_every_field_absent() {
        let settings: WorkspaceSettings = serde_json::from_value(json!({})).unwrap();
        assert!(settings.workspace_dirs.is_empty());
        assert_eq!(settings.valid_extensions, vec![".sv", ".svh", ".v"]);
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let settings: WorkspaceSettings = serde_json::from_value(json!({
            "workspaceDirs": ["/rtl"],
            "excludedPatterns": ["**/generated/**"],
            "topLevel": "soc_top",
            "includes": {"user": ["/rtl/include"], "system": []},
            "ignoredDiagnostics": [{"subsystem": 2, "code": 17}],
        }))
        .unwrap();
        assert_eq!(settings.workspace_dirs, vec![PathBuf::from("/rtl")]);
        assert_eq!(settings.top_level.as_deref(), Some("soc_top"));
        assert_eq!(settings.ignored_diagnostics[0].code, 17);
    }

    #[test]
    fn extension_filter() {
        let settings = WorkspaceSettings::default();
        assert!(settings.accepts_extension(Path::new("/a/top.sv")));
        assert!(settings.accepts_extension(Path::new("/a/defs.svh")));
        assert!(!settings.accepts_extension(Path::new("/a/notes.txt")));
    }

    #[test]
    fn glob_exclusion() {
        let mut settings = WorkspaceSettings::default();
        settings.excluded_patterns = vec!["**/generated/**".to_string(), "*.bak".to_string()];
        assert!(settings.is_excluded(Path::new("/rtl/generated/x.sv")));
        assert!(!settings.is_excluded(Path::new("/rtl/src/x.sv")));
        // `*` does not cross directories.
        assert!(!settings.is_excluded(Path::new("/rtl/a/x.bak")));
    }

    #[test]
    fn explicit_path_exclusion() {
        let mut settings = WorkspaceSettings::default();
        settings.excluded_paths = vec![PathBuf::from("/rtl/vendor")];
        assert!(settings.is_excluded(Path::new("/rtl/vendor/ip.sv")));
        assert!(!settings.is_excluded(Path::new("/rtl/core/ip.sv")));
    }
}
