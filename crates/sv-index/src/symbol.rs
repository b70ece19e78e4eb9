//! Indexed symbols.

use sv_position::SourceRange;

/// A named declaration and every textual occurrence of it.
///
/// # Invariants
///
/// - `source`, when present, is also a member of `references`.
/// - Every range in `references` lies in a file registered with the index
///   core (references are inserted through the owning file's table).
#[derive(Debug, Clone)]
pub struct IndexSymbol {
    name: String,
    source: Option<SourceRange>,
    references: Vec<SourceRange>,
}

impl IndexSymbol {
    pub(crate) fn new(name: impl Into<String>, source: SourceRange) -> Self {
        Self { name: name.into(), source: Some(source), references: Vec::new() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn source(&self) -> Option<&SourceRange> {
        self.source.as_ref()
    }

    /// All recorded occurrences, the declaration included.
    #[inline]
    pub fn references(&self) -> &[SourceRange] {
        &self.references
    }

    /// Grows the reference set; duplicates are ignored.
    pub(crate) fn add_reference(&mut self, range: SourceRange) {
        if !self.references.contains(&range) {
            self.references.push(range);
        }
    }
}
