//! File/line/column locations.

use crate::PositionError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A position in a source file.
///
/// `line` and `column` are 1-based. The path is canonicalized once (see
/// [`PathInterner`](crate::PathInterner)) and shared by reference across
/// every location in the same file.
///
/// # Invariants
///
/// - Equality uses the byte-identical path plus line and column.
/// - Ordering is only defined between locations in the same file;
///   [`SourceLocation::cmp_in_file`] encodes that restriction. Per-file
///   tables therefore key on [`SourceLocation::position`] instead.
///
/// Serializes as the string `file:line:col`, the form used by the index
/// dump.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Canonicalized absolute path of the file.
    pub file: Arc<PathBuf>,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl SourceLocation {
    /// Creates a location from an already-canonicalized shared path.
    pub fn new(file: Arc<PathBuf>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// The `(line, column)` pair, used as the per-file ordering key.
    #[inline]
    pub fn position(&self) -> (u32, u32) {
        (self.line, self.column)
    }

    /// Compares two locations that must belong to the same file.
    ///
    /// Cross-file ordering is undefined; callers guarantee the file
    /// matches (per-file reference tables do so by construction).
    #[inline]
    pub fn cmp_in_file(&self, other: &SourceLocation) -> Ordering {
        debug_assert_eq!(self.file, other.file);
        self.position().cmp(&other.position())
    }

    /// Parses the `file:line:col` display form.
    pub fn parse(text: &str) -> Result<Self, PositionError> {
        let malformed = || PositionError::MalformedLocation(text.to_string());
        let (rest, column) = text.rsplit_once(':').ok_or_else(malformed)?;
        let (file, line) = rest.rsplit_once(':').ok_or_else(malformed)?;
        let line = line.parse().map_err(|_| malformed())?;
        let column = column.parse().map_err(|_| malformed())?;
        Ok(Self { file: Arc::new(PathBuf::from(file)), line, column })
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

impl Serialize for SourceLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        SourceLocation::parse(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(file: &Arc<PathBuf>, line: u32, column: u32) -> SourceLocation {
        SourceLocation::new(file.clone(), line, column)
    }

    #[test]
    fn ordering_within_one_file() {
        let file = Arc::new(PathBuf::from("/tmp/a.sv"));
        assert_eq!(loc(&file, 1, 5).cmp_in_file(&loc(&file, 2, 1)), Ordering::Less);
        assert_eq!(loc(&file, 3, 9).cmp_in_file(&loc(&file, 3, 4)), Ordering::Greater);
        assert_eq!(loc(&file, 3, 9).cmp_in_file(&loc(&file, 3, 9)), Ordering::Equal);
    }

    #[test]
    fn equality_uses_exact_path() {
        let a = Arc::new(PathBuf::from("/tmp/a.sv"));
        let b = Arc::new(PathBuf::from("/tmp/b.sv"));
        assert_ne!(loc(&a, 1, 1), loc(&b, 1, 1));
        // Distinct Arcs over the same path still compare equal.
        let a2 = Arc::new(PathBuf::from("/tmp/a.sv"));
        assert_eq!(loc(&a, 1, 1), loc(&a2, 1, 1));
    }

    #[test]
    fn display_and_parse_round_trip() {
        let file = Arc::new(PathBuf::from("/work/top.sv"));
        let original = loc(&file, 12, 7);
        let text = original.to_string();
        assert_eq!(text, "/work/top.sv:12:7");
        let parsed = SourceLocation::parse(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn serializes_as_string() {
        let file = Arc::new(PathBuf::from("/work/top.sv"));
        let json = serde_json::to_value(loc(&file, 2, 3)).unwrap();
        assert_eq!(json, serde_json::json!("/work/top.sv:2:3"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SourceLocation::parse("no-colons-here").is_err());
        assert!(SourceLocation::parse("/a.sv:x:1").is_err());
    }
}
