//! Source manager: file registry and position computation.
//!
//! Owns the text of every parsed buffer, computes 1-based line/column
//! locations from byte offsets, and resolves macro-expanded tokens back to
//! their original (usage-site) locations before any position is handed to
//! the index or the LSP.

use crate::node::SyntaxNode;
use crate::token::Token;
use sv_position::{PathInterner, PositionError, SourceLocation, SourceRange};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle to a registered source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

#[derive(Debug)]
struct SourceFile {
    path: Arc<PathBuf>,
    text: String,
    /// Byte offset of the start of each line.
    line_starts: Vec<u32>,
}

fn compute_line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (pos, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(pos as u32 + 1);
        }
    }
    starts
}

/// File registry plus offset-to-location resolution.
#[derive(Debug, Default)]
pub struct SourceManager {
    interner: PathInterner,
    files: Vec<SourceFile>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an on-disk file.
    pub fn load_file(&mut self, path: &Path) -> io::Result<FileId> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.add_file(path, text))
    }

    /// Registers a buffer under `path` without touching the filesystem
    /// (unsaved editor documents, tests).
    pub fn add_file(&mut self, path: &Path, text: String) -> FileId {
        let shared = self.interner.intern(path);
        let id = FileId(self.files.len() as u32);
        let line_starts = compute_line_starts(&text);
        self.files.push(SourceFile { path: shared, text, line_starts });
        id
    }

    /// Looks up an already-registered buffer by canonical path.
    pub fn file_by_path(&mut self, path: &Path) -> Option<FileId> {
        let shared = self.interner.intern(path);
        self.files
            .iter()
            .position(|f| f.path == shared)
            .map(|index| FileId(index as u32))
    }

    /// The buffer text.
    pub fn text(&self, file: FileId) -> &str {
        &self.files[file.0 as usize].text
    }

    /// The canonical shared path.
    pub fn path(&self, file: FileId) -> &Arc<PathBuf> {
        &self.files[file.0 as usize].path
    }

    /// 1-based location of a byte offset in `file`.
    pub fn location_of(&self, file: FileId, offset: u32) -> SourceLocation {
        let record = &self.files[file.0 as usize];
        let line_index = match record.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insertion) => insertion - 1,
        };
        let column = offset - record.line_starts[line_index] + 1;
        SourceLocation::new(record.path.clone(), line_index as u32 + 1, column)
    }

    /// The original-buffer range of a token.
    ///
    /// Macro-expanded tokens resolve to the span of the `` `NAME`` usage;
    /// ordinary tokens resolve to their spelling. The end location is one
    /// past the last byte, matching the front-end convention the LSP
    /// boundary expects.
    pub fn token_range(&self, token: &Token) -> SourceRange {
        let (offset, len) = match token.expansion {
            Some(site) => (site.offset, site.len),
            None => (token.offset, token.len()),
        };
        let start = self.location_of(token.file, offset);
        let end = self.location_of(token.file, offset + len);
        SourceRange { start, end }
    }

    /// Builds the range from the first byte of `start` to the end of
    /// `end`, failing when the two tokens resolve to different original
    /// buffers.
    pub fn range_of(&self, start: &Token, end: &Token) -> Result<SourceRange, PositionError> {
        let start_range = self.token_range(start);
        let end_range = self.token_range(end);
        SourceRange::new(start_range.start, end_range.end)
    }

    /// The original-buffer range covered by a CST subtree, if it has any
    /// tokens.
    pub fn node_range(&self, node: &SyntaxNode) -> Option<SourceRange> {
        let first = node.first_token()?;
        let last = node.last_token()?;
        self.range_of(first, last).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_are_one_based() {
        let mut sm = SourceManager::new();
        let file = sm.add_file(Path::new("/tmp/loc.sv"), "ab\ncd\n".to_string());
        assert_eq!(sm.location_of(file, 0).position(), (1, 1));
        assert_eq!(sm.location_of(file, 1).position(), (1, 2));
        assert_eq!(sm.location_of(file, 3).position(), (2, 1));
        assert_eq!(sm.location_of(file, 4).position(), (2, 2));
    }

    #[test]
    fn offset_at_line_start_lands_on_that_line() {
        let mut sm = SourceManager::new();
        let file = sm.add_file(Path::new("/tmp/loc2.sv"), "x\ny\n".to_string());
        assert_eq!(sm.location_of(file, 2).position(), (2, 1));
    }
}
