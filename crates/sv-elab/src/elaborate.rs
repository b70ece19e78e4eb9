//! Design elaboration.
//!
//! Builds the elaborated tree from parsed compilation units: collects
//! module definitions, selects top modules, and expands the instance
//! hierarchy by re-walking the instantiated module's CST for every
//! instance. Two instances of one module therefore produce two
//! `InstanceBody` symbols sharing a single declaration range, which the
//! index later merges by exact-range dedup.

use crate::tree::{ElabKind, ElabSymbol, ElabTree, SymbolIdx};
use std::collections::{HashMap, HashSet};
use sv_position::SourceRange;
use sv_syntax::{FileId, Kw, SourceManager, SyntaxKind, SyntaxNode, Token, TokenKind};

/// Elaboration failure.
#[derive(Debug, thiserror::Error)]
pub enum ElabError {
    /// The configured top module does not exist in the design.
    #[error("top module `{name}` is not defined in the workspace")]
    TopNotFound { name: String },
}

/// A module definition seen during the definition scan.
#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    /// Buffer holding the definition.
    pub file: FileId,
    /// The module header's name token.
    pub name_range: SourceRange,
}

/// Elaboration result: the tree plus the definition registry used by the
/// reference resolver for module-type lookups.
#[derive(Debug)]
pub struct Design {
    pub tree: ElabTree,
    pub definitions: HashMap<String, ModuleDefinition>,
    /// Selected top module names, in elaboration order.
    pub tops: Vec<String>,
}

/// Elaborates `files` (parsed compilation units) into a design tree.
///
/// `top` forces the hierarchy root; without it every module that is never
/// instantiated becomes a top.
pub fn elaborate(
    sm: &SourceManager,
    files: &[(FileId, SyntaxNode)],
    top: Option<&str>,
) -> Result<Design, ElabError> {
    let mut elaborator = Elaborator {
        sm,
        defs: HashMap::new(),
        tree: ElabTree::new(),
        stack: Vec::new(),
    };
    elaborator.run(files, top)
}

struct Elaborator<'a> {
    sm: &'a SourceManager,
    defs: HashMap<String, (FileId, &'a SyntaxNode)>,
    tree: ElabTree,
    stack: Vec<String>,
}

/// First child token that is a plain identifier.
fn first_ident(node: &SyntaxNode) -> Option<&Token> {
    node.child_tokens().find(|t| t.kind == TokenKind::Identifier)
}

/// Last child token that is a plain identifier (typedef names).
fn last_ident(node: &SyntaxNode) -> Option<&Token> {
    node.child_tokens().filter(|t| t.kind == TokenKind::Identifier).last()
}

/// The label of a `begin : label` block, if any.
fn block_label(node: &SyntaxNode) -> Option<&Token> {
    let mut tokens = node.child_tokens();
    while let Some(token) = tokens.next() {
        if token.kind == TokenKind::Colon {
            return tokens.next().filter(|t| t.kind == TokenKind::Identifier);
        }
        if !matches!(token.kind, TokenKind::Keyword(Kw::Begin)) {
            break;
        }
    }
    None
}

fn module_name_token(module: &SyntaxNode) -> Option<&Token> {
    module
        .find_node(SyntaxKind::ModuleHeader)
        .and_then(first_ident)
}

impl<'a> Elaborator<'a> {
    fn run(
        mut self,
        files: &'a [(FileId, SyntaxNode)],
        top: Option<&str>,
    ) -> Result<Design, ElabError> {
        // Definition scan.
        for (file, unit) in files {
            for module in unit.child_nodes() {
                if module.kind != SyntaxKind::ModuleDeclaration {
                    continue;
                }
                if let Some(name) = module_name_token(module) {
                    self.defs.insert(name.text.clone(), (*file, module));
                }
            }
        }

        // Compilation units come first so the index records every file's
        // CST root before the hierarchy walk.
        for (file, unit) in files {
            let stem = self
                .sm
                .path(*file)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut symbol = ElabSymbol::new(ElabKind::CompilationUnit, stem);
            symbol.file = Some(*file);
            symbol.syntax_range = self.sm.node_range(unit);
            let root = self.tree.root();
            self.tree.alloc_child(root, symbol);
        }

        for (file, unit) in files {
            for package in unit.child_nodes() {
                if package.kind == SyntaxKind::PackageDeclaration {
                    self.elaborate_package(*file, package);
                }
            }
        }

        // Top selection: forced top, or every never-instantiated module.
        let tops = match top {
            Some(name) => {
                if !self.defs.contains_key(name) {
                    return Err(ElabError::TopNotFound { name: name.to_string() });
                }
                vec![name.to_string()]
            }
            None => {
                let mut instantiated = HashSet::new();
                for (_, unit) in files {
                    collect_instantiated(unit, &mut instantiated);
                }
                let mut tops: Vec<String> = self
                    .defs
                    .keys()
                    .filter(|name| !instantiated.contains(*name))
                    .cloned()
                    .collect();
                tops.sort();
                tops
            }
        };

        for name in &tops {
            if let Some((file, module)) = self.defs.get(name).copied() {
                let name_range = module_name_token(module).map(|t| self.sm.token_range(t));
                let root = self.tree.root();
                self.elaborate_instance(root, name.clone(), name_range, name, file, module);
            }
        }

        let definitions = self
            .defs
            .iter()
            .filter_map(|(name, (file, module))| {
                let token = module_name_token(module)?;
                Some((
                    name.clone(),
                    ModuleDefinition { file: *file, name_range: self.sm.token_range(token) },
                ))
            })
            .collect();

        tracing::info!(tops = ?tops, symbols = self.tree.len(), "design elaborated");
        Ok(Design { tree: self.tree, definitions, tops })
    }

    fn elaborate_package(&mut self, file: FileId, package: &'a SyntaxNode) {
        let name = first_ident(package).map(|t| t.text.clone()).unwrap_or_default();
        let mut symbol = ElabSymbol::new(ElabKind::Package, name);
        symbol.syntax_range = self.sm.node_range(package);
        let root = self.tree.root();
        let idx = self.tree.alloc_child(root, symbol);
        let items: Vec<&SyntaxNode> = package.child_nodes().collect();
        self.elaborate_items(idx, &items, file);
    }

    fn elaborate_instance(
        &mut self,
        parent: SymbolIdx,
        instance_name: String,
        name_range: Option<SourceRange>,
        module_name: &str,
        file: FileId,
        module: &'a SyntaxNode,
    ) -> Option<SymbolIdx> {
        if self.stack.iter().any(|entry| entry == module_name) {
            tracing::warn!(module = module_name, "recursive instantiation cut");
            return None;
        }
        self.stack.push(module_name.to_string());

        let mut instance = ElabSymbol::new(ElabKind::Instance, instance_name.clone());
        instance.name_range = name_range;
        instance.type_name = Some(module_name.to_string());
        instance.type_name_range = module_name_token(module).map(|t| self.sm.token_range(t));
        let instance_idx = self.tree.alloc_child(parent, instance);

        let mut body = ElabSymbol::new(ElabKind::InstanceBody, instance_name);
        body.syntax_range = self.sm.node_range(module);
        let body_idx = self.tree.alloc_child(instance_idx, body);

        if let Some(header) = module.find_node(SyntaxKind::ModuleHeader) {
            if let Some(params) = header.find_node(SyntaxKind::ParameterPortList) {
                for decl in params.child_nodes() {
                    if decl.kind == SyntaxKind::ParameterDeclaration {
                        self.value_symbols(body_idx, decl, ElabKind::Parameter);
                    }
                }
            }
            if let Some(ports) = header.find_node(SyntaxKind::AnsiPortList) {
                for port in ports.child_nodes() {
                    if port.kind == SyntaxKind::ImplicitAnsiPort {
                        if let Some(declarator) = port.find_node(SyntaxKind::Declarator) {
                            self.declarator_symbol(body_idx, declarator, ElabKind::Port);
                        }
                    }
                }
            }
        }

        let items: Vec<&SyntaxNode> = module.child_nodes().skip(1).collect();
        self.elaborate_items(body_idx, &items, file);

        self.stack.pop();
        Some(instance_idx)
    }

    fn elaborate_items(&mut self, scope: SymbolIdx, items: &[&'a SyntaxNode], file: FileId) {
        for item in items {
            match item.kind {
                SyntaxKind::DataDeclaration => {
                    let kind = data_declaration_kind(item);
                    self.value_symbols(scope, item, kind);
                }
                SyntaxKind::ParameterDeclaration => {
                    self.value_symbols(scope, item, ElabKind::Parameter);
                }
                SyntaxKind::GenvarDeclaration => {
                    self.value_symbols(scope, item, ElabKind::Genvar);
                }
                SyntaxKind::TypedefDeclaration => {
                    if let Some(name) = last_ident(item) {
                        let range = self.sm.token_range(name);
                        let mut symbol = ElabSymbol::new(ElabKind::Typedef, name.text.clone());
                        symbol.name_range = Some(range);
                        self.tree.alloc_child(scope, symbol);
                    }
                }
                SyntaxKind::HierarchyInstantiation => {
                    self.elaborate_instantiation(scope, item);
                }
                SyntaxKind::GenerateRegion => {
                    let inner: Vec<&SyntaxNode> = item.child_nodes().collect();
                    self.elaborate_items(scope, &inner, file);
                }
                SyntaxKind::LoopGenerate => {
                    self.elaborate_loop_generate(scope, item, file);
                }
                SyntaxKind::ConditionalGenerate => {
                    for branch in item.child_nodes() {
                        match branch.kind {
                            SyntaxKind::GenerateBlock => {
                                self.elaborate_generate_block(scope, branch, file, None);
                            }
                            SyntaxKind::Expression => {}
                            _ => self.elaborate_items(scope, &[branch], file),
                        }
                    }
                }
                SyntaxKind::GenerateBlock => {
                    self.elaborate_generate_block(scope, item, file, None);
                }
                SyntaxKind::ProceduralBlock => {
                    for child in item.child_nodes() {
                        if child.kind == SyntaxKind::SequentialBlock {
                            self.elaborate_statement_block(scope, child, file);
                        }
                    }
                }
                SyntaxKind::FunctionDeclaration | SyntaxKind::TaskDeclaration => {
                    self.elaborate_subroutine(scope, item, file);
                }
                _ => {}
            }
        }
    }

    fn elaborate_instantiation(&mut self, scope: SymbolIdx, inst: &'a SyntaxNode) {
        let type_name = match inst.child_tokens().next() {
            Some(token) if token.kind == TokenKind::Identifier => token.text.clone(),
            _ => return,
        };
        let def = self.defs.get(type_name.as_str()).copied();
        for hier in inst.child_nodes() {
            if hier.kind != SyntaxKind::HierarchicalInstance {
                continue;
            }
            let Some(declarator) = hier.find_node(SyntaxKind::Declarator) else {
                continue;
            };
            let Some(name) = first_ident(declarator) else {
                continue;
            };
            match def {
                Some((def_file, module)) => {
                    let name_range = Some(self.sm.token_range(name));
                    self.elaborate_instance(
                        scope,
                        name.text.clone(),
                        name_range,
                        &type_name,
                        def_file,
                        module,
                    );
                }
                None => {
                    tracing::warn!(module = %type_name, instance = %name.text, "unresolved module definition");
                }
            }
        }
    }

    fn elaborate_loop_generate(&mut self, scope: SymbolIdx, looped: &'a SyntaxNode, file: FileId) {
        let inline_genvar = looped
            .child_tokens()
            .any(|t| t.kind == TokenKind::Keyword(Kw::Genvar));
        let loop_var = looped
            .find_node(SyntaxKind::Expression)
            .and_then(|init| init.find_node(SyntaxKind::IdentifierName))
            .and_then(first_ident);
        let genvar = if inline_genvar { loop_var } else { None };

        let mut elaborated_block = false;
        for child in looped.child_nodes() {
            if child.kind == SyntaxKind::GenerateBlock {
                self.elaborate_generate_block(scope, child, file, genvar);
                elaborated_block = true;
            }
        }
        if !elaborated_block {
            // Single-item loop body without begin/end.
            let items: Vec<&SyntaxNode> = looped
                .child_nodes()
                .filter(|n| n.kind != SyntaxKind::Expression)
                .collect();
            self.elaborate_items(scope, &items, file);
        }
    }

    fn elaborate_generate_block(
        &mut self,
        scope: SymbolIdx,
        block: &'a SyntaxNode,
        file: FileId,
        genvar: Option<&Token>,
    ) {
        let name = block_label(block).map(|t| t.text.clone()).unwrap_or_default();
        let mut symbol = ElabSymbol::new(ElabKind::GenerateBlock, name);
        symbol.syntax_range = self.sm.node_range(block);
        let idx = self.tree.alloc_child(scope, symbol);

        if let Some(var) = genvar {
            let mut genvar_symbol = ElabSymbol::new(ElabKind::Genvar, var.text.clone());
            genvar_symbol.name_range = Some(self.sm.token_range(var));
            self.tree.alloc_child(idx, genvar_symbol);
        }

        let items: Vec<&SyntaxNode> = block.child_nodes().collect();
        self.elaborate_items(idx, &items, file);
    }

    fn elaborate_statement_block(&mut self, scope: SymbolIdx, block: &'a SyntaxNode, file: FileId) {
        let name = block_label(block).map(|t| t.text.clone()).unwrap_or_default();
        let mut symbol = ElabSymbol::new(ElabKind::StatementBlock, name);
        symbol.syntax_range = self.sm.node_range(block);
        let idx = self.tree.alloc_child(scope, symbol);
        self.statement_block_items(idx, block, file);
    }

    /// Declarations and nested blocks inside statements.
    fn statement_block_items(&mut self, scope: SymbolIdx, node: &'a SyntaxNode, file: FileId) {
        for child in node.child_nodes() {
            match child.kind {
                SyntaxKind::DataDeclaration => {
                    let kind = data_declaration_kind(child);
                    self.value_symbols(scope, child, kind);
                }
                SyntaxKind::SequentialBlock => {
                    self.elaborate_statement_block(scope, child, file);
                }
                SyntaxKind::Statement => {
                    self.statement_block_items(scope, child, file);
                }
                _ => {}
            }
        }
    }

    fn elaborate_subroutine(&mut self, scope: SymbolIdx, routine: &'a SyntaxNode, file: FileId) {
        let Some(name) = first_ident(routine) else { return };
        let mut symbol = ElabSymbol::new(ElabKind::Subroutine, name.text.clone());
        symbol.syntax_range = self.sm.node_range(routine);
        let idx = self.tree.alloc_child(scope, symbol);

        if let Some(ports) = routine.find_node(SyntaxKind::AnsiPortList) {
            for port in ports.child_nodes() {
                if port.kind == SyntaxKind::ImplicitAnsiPort {
                    if let Some(declarator) = port.find_node(SyntaxKind::Declarator) {
                        self.declarator_symbol(idx, declarator, ElabKind::FormalArgument);
                    }
                }
            }
        }
        for item in routine.child_nodes() {
            match item.kind {
                SyntaxKind::DataDeclaration => {
                    let kind = data_declaration_kind(item);
                    self.value_symbols(idx, item, kind);
                }
                SyntaxKind::Statement | SyntaxKind::SequentialBlock => {
                    self.statement_block_items(idx, item, file);
                }
                _ => {}
            }
        }
    }

    /// One symbol per declarator of a declaration node.
    fn value_symbols(&mut self, scope: SymbolIdx, decl: &'a SyntaxNode, kind: ElabKind) {
        for declarator in decl.child_nodes() {
            if declarator.kind == SyntaxKind::Declarator {
                self.declarator_symbol(scope, declarator, kind);
            }
        }
    }

    fn declarator_symbol(&mut self, scope: SymbolIdx, declarator: &'a SyntaxNode, kind: ElabKind) {
        let Some(name) = first_ident(declarator) else { return };
        let mut symbol = ElabSymbol::new(kind, name.text.clone());
        symbol.name_range = Some(self.sm.token_range(name));
        self.tree.alloc_child(scope, symbol);
    }
}

/// Net declarations become `Net`, everything else `Variable`.
fn data_declaration_kind(decl: &SyntaxNode) -> ElabKind {
    let is_net = decl
        .find_node(SyntaxKind::IntegerType)
        .and_then(|t| t.child_tokens().next())
        .map(|token| matches!(token.kind, TokenKind::Keyword(kw) if kw.is_net_type()))
        .unwrap_or(false);
    if is_net {
        ElabKind::Net
    } else {
        ElabKind::Variable
    }
}

fn collect_instantiated(node: &SyntaxNode, out: &mut HashSet<String>) {
    if node.kind == SyntaxKind::HierarchyInstantiation {
        if let Some(token) = node.child_tokens().next() {
            if token.kind == TokenKind::Identifier {
                out.insert(token.text.clone());
            }
        }
    }
    for child in node.child_nodes() {
        collect_instantiated(child, out);
    }
}
