//! Inclusive source ranges.

use crate::{PositionError, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// An inclusive `[start, end]` pair of locations in one file.
///
/// Both endpoints are part of the range: `contains` answers true for the
/// start and for the end. Construction fails when the endpoints resolve to
/// different files, which happens when a macro expansion straddles buffers.
///
/// Serializes as `{"beg": "file:line:col", "end": "file:line:col"}`, the
/// index-dump wire form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// First location covered by the range.
    #[serde(rename = "beg")]
    pub start: SourceLocation,
    /// Last location covered by the range.
    pub end: SourceLocation,
}

impl SourceRange {
    /// Builds a range, enforcing that both endpoints share a file.
    pub fn new(start: SourceLocation, end: SourceLocation) -> Result<Self, PositionError> {
        if start.file != end.file {
            return Err(PositionError::DifferentFiles {
                start: start.file.as_ref().clone(),
                end: end.file.as_ref().clone(),
            });
        }
        Ok(Self { start, end })
    }

    /// A range spanning `nchars` columns (and optionally `nlines` lines)
    /// from `base`.
    pub fn from_extent(base: SourceLocation, nchars: u32, nlines: u32) -> Self {
        let end = SourceLocation::new(base.file.clone(), base.line + nlines, base.column + nchars);
        Self { start: base, end }
    }

    /// The file both endpoints live in.
    #[inline]
    pub fn file(&self) -> &Arc<PathBuf> {
        &self.start.file
    }

    /// Whether `loc` lies inside the range, endpoints included.
    pub fn contains(&self, loc: &SourceLocation) -> bool {
        if loc.file != self.start.file {
            return false;
        }
        if loc.line < self.start.line || loc.line > self.end.line {
            return false;
        }
        if loc.line == self.start.line && loc.column < self.start.column {
            return false;
        }
        if loc.line == self.end.line && loc.column > self.end.column {
            return false;
        }
        true
    }

    /// Whether `other` lies entirely inside the range, endpoints included.
    pub fn contains_range(&self, other: &SourceRange) -> bool {
        if other.start.file != self.start.file {
            return false;
        }
        if other.start.line < self.start.line || other.end.line > self.end.line {
            return false;
        }
        if other.start.line == self.start.line && other.start.column < self.start.column {
            return false;
        }
        if other.end.line == self.end.line && other.end.column > self.end.column {
            return false;
        }
        true
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}..{}:{}",
            self.start.file.display(),
            self.start.line,
            self.start.column,
            self.end.line,
            self.end.column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> Arc<PathBuf> {
        Arc::new(PathBuf::from("/tmp/r.sv"))
    }

    fn loc(f: &Arc<PathBuf>, line: u32, column: u32) -> SourceLocation {
        SourceLocation::new(f.clone(), line, column)
    }

    fn range(f: &Arc<PathBuf>, s: (u32, u32), e: (u32, u32)) -> SourceRange {
        SourceRange::new(loc(f, s.0, s.1), loc(f, e.0, e.1)).unwrap()
    }

    #[test]
    fn endpoints_are_included() {
        let f = file();
        let r = range(&f, (2, 5), (4, 3));
        assert!(r.contains(&loc(&f, 2, 5)));
        assert!(r.contains(&loc(&f, 4, 3)));
        assert!(r.contains(&loc(&f, 3, 1)));
        assert!(!r.contains(&loc(&f, 2, 4)));
        assert!(!r.contains(&loc(&f, 4, 4)));
        assert!(!r.contains(&loc(&f, 5, 1)));
    }

    #[test]
    fn other_file_is_never_contained() {
        let f = file();
        let g = Arc::new(PathBuf::from("/tmp/other.sv"));
        let r = range(&f, (1, 1), (10, 1));
        assert!(!r.contains(&loc(&g, 2, 2)));
    }

    #[test]
    fn contains_range_is_inclusive() {
        let f = file();
        let outer = range(&f, (1, 1), (5, 10));
        assert!(outer.contains_range(&range(&f, (1, 1), (5, 10))));
        assert!(outer.contains_range(&range(&f, (2, 1), (3, 4))));
        assert!(!outer.contains_range(&range(&f, (2, 1), (5, 11))));
        assert!(!outer.contains_range(&range(&f, (1, 0), (2, 1))));
    }

    #[test]
    fn cross_file_range_is_rejected() {
        let f = file();
        let g = Arc::new(PathBuf::from("/tmp/other.sv"));
        let err = SourceRange::new(loc(&f, 1, 1), loc(&g, 1, 2));
        assert!(matches!(err, Err(PositionError::DifferentFiles { .. })));
    }

    #[test]
    fn from_extent_spans_columns() {
        let f = file();
        let r = SourceRange::from_extent(loc(&f, 3, 7), 4, 0);
        assert_eq!(r.end.position(), (3, 11));
        assert!(r.contains(&loc(&f, 3, 11)));
    }

    #[test]
    fn wire_form_uses_beg_and_end_strings() {
        let f = file();
        let json = serde_json::to_value(range(&f, (1, 2), (3, 4))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "beg": "/tmp/r.sv:1:2", "end": "/tmp/r.sv:3:4" })
        );
    }
}
