//! Reference resolver.
//!
//! Runs once per file after the index build: walks the file's CST and
//! records every identifier occurrence against the symbol it denotes.
//! Ordinary identifiers resolve in the most specific scope covering
//! them; instantiations, scoped names, and macro usages carry their own
//! rules. Unresolved occurrences are counted per file, never fatal.

use crate::core::{IndexCore, ScopeId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use sv_elab::ModuleDefinition;
use sv_syntax::{FileId, SourceManager, SyntaxKind, SyntaxNode, Token, TokenKind};

/// Resolves references for every parsed file registered in the core.
pub fn resolve_references(
    sm: &SourceManager,
    core: &mut IndexCore,
    module_scopes: &HashMap<String, ScopeId>,
    definitions: &HashMap<String, ModuleDefinition>,
    files: &[(FileId, SyntaxNode)],
) {
    for (file_id, unit) in files {
        let path = sm.path(*file_id).clone();
        let mut resolver = Resolver { sm, core: &mut *core, module_scopes, definitions, path };
        resolver.visit(unit);
        let unresolved = resolver
            .core
            .file(resolver.path.as_ref())
            .map(|f| f.unresolved_count())
            .unwrap_or(0);
        if unresolved > 0 {
            tracing::info!(
                file = %resolver.path.display(),
                unresolved,
                "reference resolution finished with unresolved names"
            );
        }
    }
}

struct Resolver<'a> {
    sm: &'a SourceManager,
    core: &'a mut IndexCore,
    module_scopes: &'a HashMap<String, ScopeId>,
    definitions: &'a HashMap<String, ModuleDefinition>,
    path: Arc<PathBuf>,
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, node: &SyntaxNode) {
        match node.kind {
            SyntaxKind::HierarchyInstantiation => self.handle_instantiation(node),
            SyntaxKind::ScopedName => self.handle_scoped_name(node),
            SyntaxKind::IdentifierName => {
                if let Some(token) = node.first_token() {
                    self.reference_for(token);
                }
            }
            SyntaxKind::IdentifierSelectName => {
                if let Some(token) = node.first_token() {
                    self.reference_for(token);
                }
                // Selector expressions resolve in the surrounding scope.
                for child in node.child_nodes() {
                    self.visit(child);
                }
            }
            SyntaxKind::Declarator => {
                if let Some(token) = node.child_tokens().next() {
                    if token.kind == TokenKind::Identifier {
                        self.reference_for(token);
                    }
                }
                for child in node.child_nodes() {
                    self.visit(child);
                }
            }
            SyntaxKind::MacroUsage => {
                // Only the argument expressions resolve; the macro
                // identifier itself is not a symbol.
                for child in node.child_nodes() {
                    self.visit(child);
                }
            }
            _ => {
                for child in node.child_nodes() {
                    self.visit(child);
                }
            }
        }
    }

    /// Resolves one identifier in the scope covering it.
    fn reference_for(&mut self, token: &Token) -> bool {
        let range = self.sm.token_range(token);
        let Some(scope) = self.core.lookup_scope_covering(&range) else {
            self.unresolved();
            return false;
        };
        match self.core.lookup_symbol(scope, &token.text, false) {
            Some(symbol) => {
                self.core.add_reference(symbol, range);
                true
            }
            None => {
                self.unresolved();
                false
            }
        }
    }

    fn unresolved(&mut self) {
        let path = self.path.as_ref().clone();
        self.core.count_unresolved(&path);
    }

    /// Instantiations: the module type resolves through the definition
    /// registry; named connections resolve in the instantiated body
    /// scope; connection expressions resolve in the calling scope.
    fn handle_instantiation(&mut self, node: &SyntaxNode) {
        let type_token = node
            .child_tokens()
            .find(|t| t.kind == TokenKind::Identifier);
        let mut body_scope = None;
        if let Some(token) = type_token {
            match self.definitions.get(token.text.as_str()) {
                Some(def) => {
                    let declared = self
                        .core
                        .file(def.name_range.file().as_ref())
                        .and_then(|f| f.declarations().get(&def.name_range).copied());
                    match declared {
                        Some(symbol) => {
                            let range = self.sm.token_range(token);
                            self.core.add_reference(symbol, range);
                        }
                        None => self.unresolved(),
                    }
                    body_scope = self.module_scopes.get(token.text.as_str()).copied();
                }
                None => self.unresolved(),
            }
        }

        for child in node.child_nodes() {
            match child.kind {
                SyntaxKind::ParameterValueAssignment | SyntaxKind::HierarchicalInstance => {
                    self.visit_connection_list(child, body_scope);
                }
                _ => self.visit(child),
            }
        }
    }

    fn visit_connection_list(&mut self, node: &SyntaxNode, body_scope: Option<ScopeId>) {
        for child in node.child_nodes() {
            match child.kind {
                SyntaxKind::NamedPortConnection | SyntaxKind::NamedParamAssignment => {
                    if let Some(name) = child
                        .child_tokens()
                        .find(|t| t.kind == TokenKind::Identifier)
                    {
                        self.connection_reference(name, body_scope);
                    }
                    for expr in child.child_nodes() {
                        self.visit(expr);
                    }
                }
                _ => self.visit(child),
            }
        }
    }

    /// `.name(...)` resolves `name` inside the instantiated module.
    fn connection_reference(&mut self, token: &Token, body_scope: Option<ScopeId>) {
        let Some(scope) = body_scope else {
            self.unresolved();
            return;
        };
        let range = self.sm.token_range(token);
        match self.core.lookup_symbol(scope, &token.text, false) {
            Some(symbol) => self.core.add_reference(symbol, range),
            None => self.unresolved(),
        }
    }

    /// `a::b.c` style names: the head resolves in the covering scope,
    /// every following segment in the scope reached so far.
    fn handle_scoped_name(&mut self, node: &SyntaxNode) {
        let mut segments = Vec::new();
        flatten_scoped(node, &mut segments);
        let Some((head, rest)) = segments.split_first() else { return };

        let Some(head_token) = leaf_name_token(head) else { return };
        self.reference_for(head_token);
        // Selector expressions of the head resolve here too.
        for child in head.child_nodes() {
            self.visit(child);
        }

        let head_range = self.sm.token_range(head_token);
        let mut target = self
            .core
            .lookup_scope_covering(&head_range)
            .and_then(|scope| self.find_scope_by_name(scope, &head_token.text));

        for segment in rest {
            let Some(token) = leaf_name_token(segment) else { continue };
            match target {
                Some(scope) => {
                    let range = self.sm.token_range(token);
                    match self.core.lookup_symbol(scope, &token.text, true) {
                        Some(symbol) => self.core.add_reference(symbol, range),
                        None => self.unresolved(),
                    }
                    target = self.core.child_by_name(scope, &token.text);
                }
                None => self.unresolved(),
            }
            for child in segment.child_nodes() {
                self.visit(child);
            }
        }
    }

    /// Walks the ancestor chain looking for a child scope called `name`;
    /// packages hang off the root and are found last.
    fn find_scope_by_name(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut cursor = Some(from);
        while let Some(scope) = cursor {
            if let Some(child) = self.core.child_by_name(scope, name) {
                return Some(child);
            }
            cursor = self.core.scope(scope).parent();
        }
        None
    }
}

/// Leaf name segments of a (left-associative) scoped name, in order.
fn flatten_scoped<'n>(node: &'n SyntaxNode, out: &mut Vec<&'n SyntaxNode>) {
    for child in node.child_nodes() {
        match child.kind {
            SyntaxKind::ScopedName => flatten_scoped(child, out),
            SyntaxKind::IdentifierName | SyntaxKind::IdentifierSelectName => out.push(child),
            _ => {}
        }
    }
}

fn leaf_name_token(node: &SyntaxNode) -> Option<&Token> {
    node.child_tokens().find(|t| t.kind == TokenKind::Identifier)
}
