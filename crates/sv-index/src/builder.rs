//! Index build visitor.
//!
//! Walks the elaborated design tree with a stack of open scopes and
//! populates the core. Opening an already-present textual range re-opens
//! the existing child instead of duplicating it; closing verifies the
//! scope name handed back by the open step.

use crate::core::{IndexCore, ScopeId};
use std::collections::HashMap;
use sv_elab::{Design, ElabKind, ElabSymbol, SymbolIdx};

/// Build invariant violations. Any of these abandons the build; the
/// caller keeps serving the previous index.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("attempting to close scope `{requested}` while no scope is open")]
    NoOpenScope { requested: String },

    #[error("attempting to close scope `{requested}` while current scope is `{current}`")]
    ScopeMismatch { requested: String, current: String },
}

/// Build result: the populated core plus the instance-body scope of each
/// module, used by the reference resolver for connection lookup.
pub struct BuildOutput {
    pub core: IndexCore,
    pub module_scopes: HashMap<String, ScopeId>,
}

/// Builds a fresh index from an elaborated design.
pub fn build_index(design: &Design) -> Result<BuildOutput, BuildError> {
    let mut builder = Builder {
        design,
        core: IndexCore::new(),
        stack: Vec::new(),
        module_scopes: HashMap::new(),
    };
    builder.visit(design.tree.root())?;
    debug_assert!(builder.stack.is_empty());
    Ok(BuildOutput { core: builder.core, module_scopes: builder.module_scopes })
}

struct Builder<'a> {
    design: &'a Design,
    core: IndexCore,
    stack: Vec<ScopeId>,
    module_scopes: HashMap<String, ScopeId>,
}

impl<'a> Builder<'a> {
    fn current(&self) -> Option<ScopeId> {
        self.stack.last().copied()
    }

    /// Opens `name` under the current scope (or as the root), returning
    /// the actual name in use (minted for anonymous scopes).
    fn open_scope(&mut self, name: &str, is_virtual: bool) -> String {
        let id = match self.current() {
            None => self.core.set_root(name),
            Some(top) => self.core.add_child(top, name, is_virtual),
        };
        self.stack.push(id);
        self.core.scope(id).name().to_string()
    }

    fn close_scope(&mut self, requested: &str) -> Result<(), BuildError> {
        let Some(current) = self.current() else {
            return Err(BuildError::NoOpenScope { requested: requested.to_string() });
        };
        let scope = self.core.scope(current);
        let mismatch = if scope.is_anonymous() {
            !requested.is_empty() && requested != scope.name()
        } else {
            requested != scope.name()
        };
        if mismatch {
            return Err(BuildError::ScopeMismatch {
                requested: requested.to_string(),
                current: scope.name().to_string(),
            });
        }
        self.stack.pop();
        Ok(())
    }

    fn visit(&mut self, idx: SymbolIdx) -> Result<(), BuildError> {
        let symbol = self.design.tree.symbol(idx);
        match symbol.kind {
            ElabKind::Root => {
                let used = self.open_scope(&symbol.name, false);
                for child in self.design.tree.children(idx) {
                    self.visit(*child)?;
                }
                self.close_scope(&used)
            }
            ElabKind::CompilationUnit => self.handle_compilation_unit(symbol),
            ElabKind::Instance => self.handle_instance(idx, symbol),
            kind if kind.is_scope() => {
                // Everything except instance bodies is virtual: name
                // lookup falls through generate blocks, packages, and
                // subroutines but stops at instance boundaries.
                let name = symbol.name.clone();
                self.handle_scope(idx, &name, true).map(|_| ())
            }
            _ => {
                self.handle_value_symbol(symbol);
                Ok(())
            }
        }
    }

    /// Compilation units record the file's CST root and stop; the design
    /// walk visits their contents directly.
    fn handle_compilation_unit(&mut self, symbol: &ElabSymbol) -> Result<(), BuildError> {
        if let (Some(range), Some(file_id)) = (&symbol.syntax_range, symbol.file) {
            let path = range.file().as_ref().clone();
            self.core.set_syntax_root(&path, file_id);
        }
        Ok(())
    }

    /// Instances: a scope named after the instance holding the module
    /// type symbol, the instance symbol itself, then the body scope.
    ///
    /// When the body is a textual duplicate of an already-indexed one the
    /// pre-scope is skipped entirely: the instance name becomes an alias
    /// of the shared body scope, so hierarchical paths through either
    /// instance reach the same content.
    fn handle_instance(&mut self, idx: SymbolIdx, symbol: &ElabSymbol) -> Result<(), BuildError> {
        let name = symbol.name.clone();
        let body_range = self
            .design
            .tree
            .children(idx)
            .iter()
            .map(|c| self.design.tree.symbol(*c))
            .find(|c| c.kind == ElabKind::InstanceBody)
            .and_then(|c| c.syntax_range.clone());
        let is_duplicate = match (&body_range, self.current()) {
            (Some(range), Some(current)) => {
                self.core.child_by_exact_range(current, range).is_some()
            }
            _ => false,
        };

        if !is_duplicate {
            if let (Some(type_name), Some(type_range)) =
                (symbol.type_name.clone(), symbol.type_name_range.clone())
            {
                let used = self.open_scope(&name, false);
                let type_symbol = self.core.add_symbol(&type_name, type_range);
                if let Some(current) = self.current() {
                    self.core.add_symbol_to_scope(current, type_symbol);
                }
                tracing::debug!(instance = %name, module = %type_name, "recorded instance type");
                self.close_scope(&used)?;
            }
        }

        self.handle_value_symbol(symbol);

        let type_name = symbol.type_name.clone();
        for child in self.design.tree.children(idx) {
            let child_symbol = self.design.tree.symbol(*child);
            if child_symbol.kind == ElabKind::InstanceBody {
                let body_scope = self.handle_scope(*child, &name, false)?;
                if let (Some(module), Some(scope)) = (&type_name, body_scope) {
                    self.module_scopes.entry(module.clone()).or_insert(scope);
                }
            } else {
                self.visit(*child)?;
            }
        }
        Ok(())
    }

    /// Generic scope open/visit/close with exact-range deduplication.
    /// Returns the opened (or re-opened) scope.
    fn handle_scope(
        &mut self,
        idx: SymbolIdx,
        requested_name: &str,
        is_virtual: bool,
    ) -> Result<Option<ScopeId>, BuildError> {
        let symbol = self.design.tree.symbol(idx);
        let syntax_range = symbol.syntax_range.clone();

        let used_name = match (&syntax_range, self.current()) {
            (Some(range), Some(current)) => {
                self.core.get_or_create_file(range.file().as_ref());
                match self.core.child_by_exact_range(current, range) {
                    Some(duplicate) => {
                        // Textual duplicate from re-elaboration: re-open
                        // the existing scope; a differing requested name
                        // becomes an alias of it.
                        let dup_name = self.core.scope(duplicate).name().to_string();
                        if !requested_name.is_empty() && requested_name != dup_name {
                            self.core.add_child_alias(current, &dup_name, requested_name);
                        }
                        let used = self.open_scope(&dup_name, is_virtual);
                        tracing::debug!(
                            requested = requested_name,
                            reopened = %used,
                            "re-opened duplicate scope"
                        );
                        used
                    }
                    None => {
                        let used = self.open_scope(requested_name, is_virtual);
                        if let Some(opened) = self.current() {
                            self.core.set_scope_source(opened, range.clone());
                            self.core.register_scope_in_file(opened);
                        }
                        used
                    }
                }
            }
            _ => self.open_scope(requested_name, is_virtual),
        };

        let opened = self.current();
        for child in self.design.tree.children(idx) {
            self.visit(*child)?;
        }
        self.close_scope(&used_name)?;
        Ok(opened)
    }

    /// Non-scope symbols with a name and a declaration site become index
    /// symbols in the current scope. Synthesized symbols are skipped.
    fn handle_value_symbol(&mut self, symbol: &ElabSymbol) {
        if symbol.name.is_empty() {
            return;
        }
        let Some(current) = self.current() else { return };
        match &symbol.name_range {
            Some(range) => {
                let id = self.core.add_symbol(&symbol.name, range.clone());
                self.core.add_symbol_to_scope(current, id);
                tracing::trace!(
                    path = %self.core.full_path(current),
                    symbol = %symbol.name,
                    "added symbol"
                );
            }
            None => {
                tracing::debug!(symbol = %symbol.name, "skipped symbol without declaration syntax");
            }
        }
    }

}
