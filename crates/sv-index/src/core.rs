//! The index core: scope tree, symbol registry, file table.

use crate::file::{IndexFile, ReferenceRecord};
use crate::scope::IndexScope;
use crate::symbol::IndexSymbol;
use la_arena::{Arena, Idx};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use sv_position::{PathInterner, SourceLocation, SourceRange};
use sv_syntax::FileId;

/// Handle to a scope in the core's arena.
pub type ScopeId = Idx<IndexScope>;
/// Handle to a symbol in the core's arena.
pub type SymbolId = Idx<IndexSymbol>;

/// The cross-reference index.
///
/// Owns the scope tree and the symbol registry in two arenas plus the
/// per-file tables; every cross-reference between them is a plain arena
/// index, so no ownership cycles exist and the whole structure drops
/// together (rebuilds swap in a fresh core atomically).
#[derive(Debug, Default)]
pub struct IndexCore {
    scopes: Arena<IndexScope>,
    symbols: Arena<IndexSymbol>,
    root: Option<ScopeId>,
    files: BTreeMap<PathBuf, IndexFile>,
    interner: PathInterner,
}

impl IndexCore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Roots, scopes
    // ------------------------------------------------------------------

    /// Installs the root scope, replacing any previous root.
    pub fn set_root(&mut self, name: impl Into<String>) -> ScopeId {
        let mut scope = IndexScope::new(name, false, false);
        scope.hash = hash_path(&scope.name);
        let id = self.scopes.alloc(scope);
        self.root = Some(id);
        id
    }

    #[inline]
    pub fn root(&self) -> Option<ScopeId> {
        self.root
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &IndexScope {
        &self.scopes[id]
    }

    #[inline]
    pub fn symbol(&self, id: SymbolId) -> &IndexSymbol {
        &self.symbols[id]
    }

    /// Creates (or returns) the child `name` under `parent`. An empty
    /// name mints `unnamedN` and flags the scope anonymous.
    pub fn add_child(&mut self, parent: ScopeId, name: &str, is_virtual: bool) -> ScopeId {
        let (used_name, anonymous) = if name.is_empty() {
            let count = self.scopes[parent].unnamed_count;
            self.scopes[parent].unnamed_count += 1;
            (format!("unnamed{count}"), true)
        } else {
            (name.to_string(), false)
        };

        if let Some(existing) = self.child_by_name(parent, &used_name) {
            return existing;
        }

        let mut scope = IndexScope::new(used_name, is_virtual, anonymous);
        scope.parent = Some(parent);
        let id = self.scopes.alloc(scope);
        self.scopes[parent].children.push(id);
        // The hierarchical path is complete now; freeze its hash.
        let path = self.full_path(id);
        self.scopes[id].hash = hash_path(&path);
        id
    }

    /// Registers `alias` as an alternate name for the existing child
    /// `reference`. Returns the child, or `None` when it does not exist.
    pub fn add_child_alias(&mut self, parent: ScopeId, reference: &str, alias: &str) -> Option<ScopeId> {
        let child = self.child_by_name(parent, reference)?;
        let already = self
            .scopes[parent]
            .child_aliases
            .iter()
            .any(|(name, _)| name == alias);
        if !already {
            self.scopes[parent].child_aliases.push((alias.to_string(), child));
        }
        Some(child)
    }

    /// Direct child lookup by name, aliases included.
    pub fn child_by_name(&self, parent: ScopeId, name: &str) -> Option<ScopeId> {
        let scope = &self.scopes[parent];
        scope
            .children
            .iter()
            .copied()
            .find(|id| self.scopes[*id].name == name)
            .or_else(|| {
                scope
                    .child_aliases
                    .iter()
                    .find(|(alias, _)| alias == name)
                    .map(|(_, id)| *id)
            })
    }

    /// Sets the textual extent of a scope.
    pub fn set_scope_source(&mut self, scope: ScopeId, range: SourceRange) {
        self.scopes[scope].source = Some(range);
    }

    /// Dotted path from the root to `scope`.
    pub fn full_path(&self, scope: ScopeId) -> String {
        match self.scopes[scope].parent {
            Some(parent) => format!("{}.{}", self.full_path(parent), self.scopes[scope].name),
            None => self.scopes[scope].name.clone(),
        }
    }

    /// Dotted path skipping virtual scopes (design-hierarchy path).
    pub fn concrete_path(&self, scope: ScopeId) -> String {
        let record = &self.scopes[scope];
        if record.is_virtual {
            match record.parent {
                Some(parent) => self.concrete_path(parent),
                None => String::new(),
            }
        } else {
            match record.parent {
                Some(parent) => format!("{}.{}", self.concrete_path(parent), record.name),
                None => record.name.clone(),
            }
        }
    }

    /// First non-virtual descendants reachable without crossing another
    /// non-virtual scope. Renders the design hierarchy.
    pub fn concrete_children(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut found = Vec::new();
        self.collect_concrete(scope, true, &mut found);
        found
    }

    fn collect_concrete(&self, scope: ScopeId, is_root: bool, found: &mut Vec<ScopeId>) {
        if !is_root && !self.scopes[scope].is_virtual {
            found.push(scope);
        } else {
            for child in &self.scopes[scope].children {
                self.collect_concrete(*child, false, found);
            }
        }
    }

    // ------------------------------------------------------------------
    // Symbol lookup
    // ------------------------------------------------------------------

    /// Looks `name` up in `scope`; with `strict = false` the search
    /// recurses into the parent as long as the current scope is virtual.
    pub fn lookup_symbol(&self, scope: ScopeId, name: &str, strict: bool) -> Option<SymbolId> {
        let record = &self.scopes[scope];
        if let Some(&found) = record.content.get(name) {
            return Some(found);
        }
        if !strict && record.is_virtual {
            if let Some(parent) = record.parent {
                return self.lookup_symbol(parent, name, false);
            }
        }
        None
    }

    /// Resolves a dotted hierarchical path relative to `scope`; the final
    /// segment is looked up strictly.
    pub fn resolve_symbol(&self, scope: ScopeId, path: &str) -> Option<SymbolId> {
        match path.split_once('.') {
            None => self.lookup_symbol(scope, path, true),
            Some((head, rest)) => {
                let next = self.child_by_name(scope, head)?;
                self.resolve_symbol(next, rest)
            }
        }
    }

    /// Resolves a dotted path to a sub-scope relative to `scope`.
    pub fn resolve_scope(&self, scope: ScopeId, path: &str) -> Option<ScopeId> {
        match path.split_once('.') {
            None => self.child_by_name(scope, path),
            Some((head, rest)) => {
                let next = self.child_by_name(scope, head)?;
                self.resolve_scope(next, rest)
            }
        }
    }

    /// Registers `symbol` under its name in `scope`.
    pub fn add_symbol_to_scope(&mut self, scope: ScopeId, symbol: SymbolId) {
        let name = self.symbols[symbol].name().to_string();
        self.scopes[scope].content.insert(name, symbol);
    }

    // ------------------------------------------------------------------
    // Scope-by-position lookup
    // ------------------------------------------------------------------

    /// Most specific scope (under `scope`) whose range contains `loc`.
    pub fn scope_for_location(&self, scope: ScopeId, loc: &SourceLocation) -> Option<ScopeId> {
        let record = &self.scopes[scope];
        let covers = record
            .source
            .as_ref()
            .is_some_and(|range| range.contains(loc));
        if !covers {
            return None;
        }
        for child in &record.children {
            if let Some(found) = self.scope_for_location(*child, loc) {
                return Some(found);
            }
        }
        Some(scope)
    }

    /// Most specific scope including `range`. An exact match wins
    /// immediately.
    pub fn scope_for_range(&self, scope: ScopeId, range: &SourceRange) -> Option<ScopeId> {
        let record = &self.scopes[scope];
        if record.source.as_ref() == Some(range) {
            return Some(scope);
        }
        for child in &record.children {
            let child_record = &self.scopes[*child];
            if child_record
                .source
                .as_ref()
                .is_some_and(|r| r.contains_range(range))
            {
                return self.scope_for_range(*child, range).or(Some(*child));
            }
        }
        if record
            .source
            .as_ref()
            .is_some_and(|r| r.contains_range(range))
        {
            Some(scope)
        } else {
            None
        }
    }

    /// Direct child covering exactly `range`. Deduplicates textually
    /// identical scopes reached via two paths.
    pub fn child_by_exact_range(&self, parent: ScopeId, range: &SourceRange) -> Option<ScopeId> {
        self.scopes[parent]
            .children
            .iter()
            .copied()
            .find(|child| self.scopes[*child].source.as_ref() == Some(range))
    }

    // ------------------------------------------------------------------
    // Files, symbols, references
    // ------------------------------------------------------------------

    /// Returns the record for `path`, creating it on first sight. The
    /// path is canonicalized; the table never hands back null.
    pub fn get_or_create_file(&mut self, path: &Path) -> &mut IndexFile {
        let shared = self.interner.intern(path);
        self.files
            .entry(shared.as_ref().clone())
            .or_insert_with(|| IndexFile::new(shared))
    }

    pub fn file(&self, path: &Path) -> Option<&IndexFile> {
        self.files.get(path)
    }

    /// Registered files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &IndexFile)> {
        self.files.iter()
    }

    /// Records the parsed buffer behind `path` so the reference resolver
    /// can find the file's CST root.
    pub fn set_syntax_root(&mut self, path: &Path, file_id: FileId) {
        self.get_or_create_file(path).syntax_root = Some(file_id);
    }

    /// Adds `scope` to the scope set of the file owning its range.
    pub fn register_scope_in_file(&mut self, scope: ScopeId) {
        let Some(range) = self.scopes[scope].source.clone() else { return };
        let file = self.get_or_create_file(range.file().as_ref());
        if !file.scopes.contains(&scope) {
            file.scopes.push(scope);
        }
    }

    /// Inserts a symbol declared at `source_range` into the owning file.
    ///
    /// Idempotent: a second symbol with the same declaration range
    /// returns the first. The fresh symbol's reference set starts with
    /// the declaration itself.
    pub fn add_symbol(&mut self, name: &str, source_range: SourceRange) -> SymbolId {
        let path = source_range.file().as_ref().clone();
        {
            let file = self.get_or_create_file(&path);
            if let Some(&existing) = file.declarations.get(&source_range) {
                return existing;
            }
        }
        let id = self.symbols.alloc(IndexSymbol::new(name, source_range.clone()));
        let file = self.get_or_create_file(&path);
        file.declarations.insert(source_range.clone(), id);
        tracing::debug!(symbol = name, at = %source_range, "added symbol");
        self.add_reference(id, source_range);
        id
    }

    /// Records one occurrence of `symbol` at `range` in the owning file.
    ///
    /// A second reference starting at the same location is dropped: the
    /// declaration is re-visited by the resolver, and anything else at an
    /// identical start is a duplicated scope walk.
    pub fn add_reference(&mut self, symbol: SymbolId, range: SourceRange) {
        let key = range.start.position();
        let path = range.file().as_ref().clone();
        let name = self.symbols[symbol].name().to_string();
        let file = self.get_or_create_file(&path);
        if let Some(existing) = file.references.get(&key) {
            if existing.range != range || existing.symbol != symbol {
                tracing::warn!(symbol = %name, at = %range, "dropped conflicting reference");
            }
            return;
        }
        file.references.insert(key, ReferenceRecord { range: range.clone(), symbol });
        self.symbols[symbol].add_reference(range);
    }

    /// The symbol referenced at `loc`, via the file's reference table
    /// (`upper_bound - 1`, then a containment check).
    pub fn lookup_symbol_at(&self, loc: &SourceLocation) -> Option<SymbolId> {
        let file = self.files.get(loc.file.as_ref())?;
        let (_, record) = file
            .references
            .range(..=loc.position())
            .next_back()?;
        record.range.contains(loc).then_some(record.symbol)
    }

    /// Most specific scope containing `loc`, searched over the scopes
    /// registered in the location's file.
    pub fn lookup_scope_at(&self, loc: &SourceLocation) -> Option<ScopeId> {
        let file = self.files.get(loc.file.as_ref())?;
        for scope in &file.scopes {
            if let Some(found) = self.scope_for_location(*scope, loc) {
                return Some(found);
            }
        }
        None
    }

    /// Most specific scope covering `range` in its file.
    pub fn lookup_scope_covering(&self, range: &SourceRange) -> Option<ScopeId> {
        let file = self.files.get(range.file().as_ref())?;
        for scope in &file.scopes {
            if let Some(found) = self.scope_for_range(*scope, range) {
                return Some(found);
            }
        }
        None
    }

    /// Bumps the unresolved-reference counter of `path`'s record.
    pub fn count_unresolved(&mut self, path: &Path) {
        if let Some(file) = self.files.get_mut(path) {
            file.unresolved += 1;
        }
    }
}

fn hash_path(path: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn file() -> Arc<PathBuf> {
        Arc::new(PathBuf::from("/virtual/core_test.sv"))
    }

    fn range(f: &Arc<PathBuf>, s: (u32, u32), e: (u32, u32)) -> SourceRange {
        SourceRange {
            start: SourceLocation::new(f.clone(), s.0, s.1),
            end: SourceLocation::new(f.clone(), e.0, e.1),
        }
    }

    #[test]
    fn add_child_is_idempotent_per_name() {
        let mut core = IndexCore::new();
        let root = core.set_root("$root");
        let a = core.add_child(root, "a", false);
        let b = core.add_child(root, "a", false);
        assert_eq!(a, b);
        assert_eq!(core.scope(root).children().len(), 1);
    }

    #[test]
    fn anonymous_children_get_minted_names() {
        let mut core = IndexCore::new();
        let root = core.set_root("$root");
        let first = core.add_child(root, "", true);
        let second = core.add_child(root, "", true);
        assert_eq!(core.scope(first).name(), "unnamed0");
        assert_eq!(core.scope(second).name(), "unnamed1");
        assert!(core.scope(first).is_anonymous());
    }

    #[test]
    fn virtual_scopes_forward_lookup_to_parent() {
        let mut core = IndexCore::new();
        let root = core.set_root("$root");
        let body = core.add_child(root, "body", false);
        let gen = core.add_child(body, "gen", true);

        let f = file();
        let symbol = core.add_symbol("sig", range(&f, (2, 3), (2, 6)));
        core.add_symbol_to_scope(body, symbol);

        // Virtual child sees the parent's symbol without strictness.
        assert_eq!(core.lookup_symbol(gen, "sig", false), Some(symbol));
        // Strict lookup stays local.
        assert_eq!(core.lookup_symbol(gen, "sig", true), None);
        // A non-virtual scope does not forward.
        let inner = core.add_child(body, "inner", false);
        assert_eq!(core.lookup_symbol(inner, "sig", false), None);
    }

    #[test]
    fn resolve_symbol_round_trips_full_paths() {
        let mut core = IndexCore::new();
        let root = core.set_root("$root");
        let top = core.add_child(root, "top", false);
        let blk = core.add_child(top, "blk", true);
        let f = file();
        let symbol = core.add_symbol("x", range(&f, (4, 1), (4, 2)));
        core.add_symbol_to_scope(blk, symbol);

        assert_eq!(core.full_path(blk), "$root.top.blk");
        assert_eq!(core.resolve_symbol(root, "top.blk.x"), Some(symbol));
        assert_eq!(core.resolve_symbol(root, "top.x"), None);
    }

    #[test]
    fn child_aliases_resolve_to_the_same_scope() {
        let mut core = IndexCore::new();
        let root = core.set_root("$root");
        let body = core.add_child(root, "u0", false);
        assert!(core.add_child_alias(root, "u0", "u1").is_some());
        assert_eq!(core.child_by_name(root, "u1"), Some(body));
        // Alias to a missing child fails.
        assert!(core.add_child_alias(root, "nope", "u2").is_none());
    }

    #[test]
    fn symbol_source_is_among_its_references() {
        let mut core = IndexCore::new();
        core.set_root("$root");
        let f = file();
        let decl = range(&f, (1, 5), (1, 8));
        let symbol = core.add_symbol("sig", decl.clone());
        let record = core.symbol(symbol);
        assert_eq!(record.source(), Some(&decl));
        assert!(record.references().contains(&decl));
    }

    #[test]
    fn add_symbol_same_range_returns_existing() {
        let mut core = IndexCore::new();
        core.set_root("$root");
        let f = file();
        let decl = range(&f, (1, 5), (1, 8));
        let first = core.add_symbol("sig", decl.clone());
        let second = core.add_symbol("sig", decl);
        assert_eq!(first, second);
    }

    #[test]
    fn lookup_symbol_at_uses_upper_bound_then_containment() {
        let mut core = IndexCore::new();
        core.set_root("$root");
        let f = file();
        let symbol = core.add_symbol("sig", range(&f, (3, 10), (3, 13)));
        core.add_reference(symbol, range(&f, (5, 4), (5, 7)));

        let hit = |line, col| {
            core.lookup_symbol_at(&SourceLocation::new(file(), line, col))
        };
        assert_eq!(hit(3, 10), Some(symbol));
        assert_eq!(hit(3, 12), Some(symbol));
        assert_eq!(hit(5, 5), Some(symbol));
        // Between references: the previous entry does not contain it.
        assert_eq!(hit(4, 1), None);
        // Before everything.
        assert_eq!(hit(1, 1), None);
    }

    #[test]
    fn concrete_children_skip_virtual_scopes() {
        let mut core = IndexCore::new();
        let root = core.set_root("$root");
        let top = core.add_child(root, "top", false);
        let gen = core.add_child(top, "g_if", true);
        let inner = core.add_child(gen, "u_inner", false);
        let deeper = core.add_child(inner, "u_deep", false);
        let _ = deeper;

        // From top: the virtual generate block is crossed, the concrete
        // instance below it is reported, and nothing deeper.
        assert_eq!(core.concrete_children(top), vec![inner]);
    }

    #[test]
    fn scope_for_location_returns_most_specific() {
        let mut core = IndexCore::new();
        let root = core.set_root("$root");
        let f = file();
        let outer = core.add_child(root, "outer", false);
        core.set_scope_source(outer, range(&f, (1, 1), (10, 1)));
        let inner = core.add_child(outer, "inner", true);
        core.set_scope_source(inner, range(&f, (3, 1), (6, 1)));

        let at = |line, col| core.scope_for_location(outer, &SourceLocation::new(file(), line, col));
        assert_eq!(at(2, 1), Some(outer));
        assert_eq!(at(4, 2), Some(inner));
        assert_eq!(at(11, 1), None);
    }
}
