//! The elaborated design tree.
//!
//! Symbols live in one arena owned by the tree; parent/child links are
//! arena indices. Scope-like kinds carry the full syntactic extent of
//! their declaration (the index uses it for scope ranges and dedup);
//! value kinds carry the name-token range (the declaration site seen by
//! go-to-definition and rename).

use la_arena::{Arena, Idx};
use sv_position::SourceRange;
use sv_syntax::FileId;

/// Handle to a symbol in the elaborated tree.
pub type SymbolIdx = Idx<ElabSymbol>;

/// Elaborated symbol classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ElabKind {
    Root,
    CompilationUnit,
    Package,
    Instance,
    InstanceBody,
    GenerateBlock,
    StatementBlock,
    Subroutine,
    Parameter,
    Variable,
    Net,
    Port,
    Genvar,
    FormalArgument,
    Typedef,
}

impl ElabKind {
    /// Scope-like kinds open an index scope when visited.
    pub fn is_scope(self) -> bool {
        matches!(
            self,
            ElabKind::Root
                | ElabKind::CompilationUnit
                | ElabKind::Package
                | ElabKind::InstanceBody
                | ElabKind::GenerateBlock
                | ElabKind::StatementBlock
                | ElabKind::Subroutine
        )
    }
}

/// One elaborated symbol.
#[derive(Debug, Clone)]
pub struct ElabSymbol {
    pub kind: ElabKind,
    /// Symbol name; empty for anonymous blocks.
    pub name: String,
    /// Full syntactic extent for scope-like kinds.
    pub syntax_range: Option<SourceRange>,
    /// Name-token range: the declaration site of value symbols and
    /// instances.
    pub name_range: Option<SourceRange>,
    /// Instances: the instantiated module's name.
    pub type_name: Option<String>,
    /// Instances: the module header name token of the instantiated
    /// module.
    pub type_name_range: Option<SourceRange>,
    /// Compilation units: the parsed buffer this unit covers.
    pub file: Option<FileId>,
    pub parent: Option<SymbolIdx>,
    pub children: Vec<SymbolIdx>,
}

impl ElabSymbol {
    pub(crate) fn new(kind: ElabKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            syntax_range: None,
            name_range: None,
            type_name: None,
            type_name_range: None,
            file: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed elaborated tree rooted at `$root`.
#[derive(Debug)]
pub struct ElabTree {
    arena: Arena<ElabSymbol>,
    root: SymbolIdx,
}

impl ElabTree {
    pub(crate) fn new() -> Self {
        let mut arena: Arena<ElabSymbol> = Arena::default();
        let root = arena.alloc(ElabSymbol::new(ElabKind::Root, "$root"));
        Self { arena, root }
    }

    /// The design root.
    #[inline]
    pub fn root(&self) -> SymbolIdx {
        self.root
    }

    /// Immutable access to a symbol.
    #[inline]
    pub fn symbol(&self, idx: SymbolIdx) -> &ElabSymbol {
        &self.arena[idx]
    }

    pub(crate) fn symbol_mut(&mut self, idx: SymbolIdx) -> &mut ElabSymbol {
        &mut self.arena[idx]
    }

    /// Allocates `symbol` as the last child of `parent`.
    pub(crate) fn alloc_child(&mut self, parent: SymbolIdx, mut symbol: ElabSymbol) -> SymbolIdx {
        symbol.parent = Some(parent);
        let idx = self.arena.alloc(symbol);
        self.arena[parent].children.push(idx);
        idx
    }

    /// Children of `idx` in elaboration order.
    pub fn children(&self, idx: SymbolIdx) -> &[SymbolIdx] {
        &self.arena[idx].children
    }

    /// Total number of symbols, root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.arena.len() <= 1
    }
}
