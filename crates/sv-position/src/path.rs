//! Path canonicalization and interning.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Weak canonicalization: resolve symlinks and `..` for the part of the
/// path that exists, normalize the rest lexically.
///
/// Unlike `std::fs::canonicalize` this tolerates non-existent targets,
/// which the LSP needs for unsaved buffers and for files mentioned by a
/// configuration before they are created.
pub fn weakly_canonical(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    if let Ok(resolved) = absolute.canonicalize() {
        return resolved;
    }

    // Resolve the longest existing ancestor, then append the remainder
    // with lexical `.`/`..` normalization.
    for ancestor in absolute.ancestors().skip(1) {
        if let Ok(base) = ancestor.canonicalize() {
            let rest = match absolute.strip_prefix(ancestor) {
                Ok(rest) => rest,
                Err(_) => break,
            };
            let mut result = base;
            for component in rest.components() {
                match component {
                    Component::CurDir => {}
                    Component::ParentDir => {
                        result.pop();
                    }
                    other => result.push(other.as_os_str()),
                }
            }
            return result;
        }
    }

    lexical_normalize(&absolute)
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Canonicalizes paths once and hands out shared handles.
///
/// Every [`SourceLocation`](crate::SourceLocation) in a file carries the
/// same `Arc<PathBuf>`, so path storage is paid once per file.
#[derive(Debug, Default)]
pub struct PathInterner {
    known: HashMap<PathBuf, Arc<PathBuf>>,
}

impl PathInterner {
    /// Creates an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared canonical handle for `path`, canonicalizing and
    /// caching it on first sight.
    pub fn intern(&mut self, path: &Path) -> Arc<PathBuf> {
        if let Some(found) = self.known.get(path) {
            return found.clone();
        }
        let canonical = weakly_canonical(path);
        let shared = self
            .known
            .get(&canonical)
            .cloned()
            .unwrap_or_else(|| Arc::new(canonical.clone()));
        self.known.insert(canonical, shared.clone());
        self.known.insert(path.to_path_buf(), shared.clone());
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tolerates_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not").join("yet").join("here.sv");
        let resolved = weakly_canonical(&missing);
        assert!(resolved.ends_with("not/yet/here.sv"));
        assert!(resolved.is_absolute());
    }

    #[test]
    fn canonical_resolves_dot_dot() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let file = sub.join("..").join("a.sv");
        std::fs::write(dir.path().join("a.sv"), "").unwrap();
        let resolved = weakly_canonical(&file);
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("a.sv"));
    }

    #[test]
    fn interner_shares_handles() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("x.sv");
        std::fs::write(&file, "").unwrap();
        let mut interner = PathInterner::new();
        let a = interner.intern(&file);
        let b = interner.intern(&file);
        assert!(Arc::ptr_eq(&a, &b));
        // A differently spelled path to the same file shares the handle.
        let spelled = dir.path().join(".").join("x.sv");
        let c = interner.intern(&spelled);
        assert!(Arc::ptr_eq(&a, &c));
    }
}
