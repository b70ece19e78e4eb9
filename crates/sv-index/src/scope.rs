//! Scope tree nodes.
//!
//! Scopes are stored in an arena owned by [`IndexCore`](crate::IndexCore);
//! tree edges and symbol contents are arena indices. Operations that need
//! to traverse the tree live on the core, which owns both arenas.

use crate::core::{ScopeId, SymbolId};
use std::collections::HashMap;
use sv_position::SourceRange;

/// A named node of the scope tree.
///
/// `virtual` scopes are traversed transparently during name lookup
/// (generate blocks, packages, subroutines); non-virtual scopes mark
/// instantiation-hierarchy levels and stop unqualified lookups.
#[derive(Debug)]
pub struct IndexScope {
    pub(crate) name: String,
    pub(crate) parent: Option<ScopeId>,
    /// Children in insertion order; names are unique per scope.
    pub(crate) children: Vec<ScopeId>,
    /// Alternate names resolving to an existing child. Used when two
    /// textually identical scopes are re-entered under a new name, e.g.
    /// a second instance of the same module body.
    pub(crate) child_aliases: Vec<(String, ScopeId)>,
    /// Range covering the scope's declaration and content.
    pub(crate) source: Option<SourceRange>,
    /// Local name to symbol mapping.
    pub(crate) content: HashMap<String, SymbolId>,
    pub(crate) is_virtual: bool,
    pub(crate) anonymous: bool,
    /// Mints `unnamedN` names for anonymous children.
    pub(crate) unnamed_count: usize,
    /// Stable hash of the fully qualified path, computed at creation.
    pub(crate) hash: u64,
}

impl IndexScope {
    pub(crate) fn new(name: impl Into<String>, is_virtual: bool, anonymous: bool) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            child_aliases: Vec::new(),
            source: None,
            content: HashMap::new(),
            is_virtual,
            anonymous,
            unnamed_count: 0,
            hash: 0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    #[inline]
    pub fn source(&self) -> Option<&SourceRange> {
        self.source.as_ref()
    }

    /// Virtual scopes forward unqualified lookups to their parent.
    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Hash of the fully qualified path.
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Children in insertion order.
    #[inline]
    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    /// Symbols declared directly in this scope.
    #[inline]
    pub fn content(&self) -> &HashMap<String, SymbolId> {
        &self.content
    }
}
