//! Two-pass alignment formatter.
//!
//! Pass 1 groups adjacent same-kind declarations into blocks (split on a
//! blank line or a kind change) and measures per-column maxima; pass 2
//! rewrites each member's trivia so modifiers, type keywords, signing,
//! packed dimensions, names, unpacked dimensions, and terminators land
//! in shared columns. Anything the engine does not understand passes
//! through untouched; the pass never fails.

use crate::engine::{IndentGuard, SpacingEngine};
use sv_syntax::{Child, Kw, SyntaxKind, SyntaxNode, TokenKind};

/// Formatting options, mirroring the CLI and LSP surfaces.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Spaces per indent level.
    pub spacing: u32,
    /// Indent with one tab per level instead of spaces.
    pub use_tabs: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { spacing: 4, use_tabs: false }
    }
}

/// Formats a parsed compilation unit, returning the rewritten text.
///
/// The pass clones the tree and rewrites trivia inside the clone; the
/// clone is dropped with the call.
pub fn format_file(unit: &SyntaxNode, options: FormatOptions) -> String {
    let mut work = unit.clone();
    format_in_place(&mut work, options);
    work.source_text()
}

/// Formats a cloned tree in place. Exposed for the `--debug` CST dump.
pub fn format_in_place(work: &mut SyntaxNode, options: FormatOptions) {
    tracing::debug!(spacing = options.spacing, use_tabs = options.use_tabs, "formatting pass");
    let engine = SpacingEngine::new(options.spacing, options.use_tabs);
    engine.add_level(1);
    let mut formatter = AlignmentFormatter { engine: &engine };
    formatter.walk_container(&mut work.children);
}

/// Column maxima of one declaration block.
#[derive(Debug, Default, Clone)]
struct BlockMeasure {
    /// Per-position modifier widths (`const`, direction, `var`, ...).
    modifier_sizes: Vec<usize>,
    /// Type keyword (or named type) column width.
    type_keyword_size: usize,
    /// Signing column width; zero when no member is signed.
    type_signing_size: usize,
    /// Packed dimension widths, split at the colon.
    type_sizes: Vec<(usize, usize)>,
    /// Declarator name column width.
    var_name_size: usize,
    /// Unpacked dimension widths.
    array_sizes: Vec<(usize, usize)>,
}

/// Connection-list maxima of one instantiation.
#[derive(Debug, Default)]
struct ConnMeasure {
    param_name_size: usize,
    param_value_size: usize,
    port_name_size: usize,
    port_value_size: usize,
}

struct AlignmentFormatter<'e> {
    engine: &'e SpacingEngine,
}

impl<'e> AlignmentFormatter<'e> {
    /// Walks one item list, maintaining the current block.
    fn walk_container(&mut self, children: &mut Vec<Child>) {
        let mut pending: Vec<usize> = Vec::new();
        let mut measure = BlockMeasure::default();

        for index in 0..children.len() {
            let kind = match &children[index] {
                Child::Node(node) => node.kind,
                Child::Token(_) => continue,
            };
            match kind {
                SyntaxKind::DataDeclaration => {
                    let blank_split = match &children[index] {
                        Child::Node(node) => node
                            .first_token()
                            .is_some_and(|t| t.leading_newlines() >= 2),
                        Child::Token(_) => false,
                    };
                    if blank_split {
                        self.flush(children, &mut pending, &mut measure);
                    }
                    if let Child::Node(node) = &children[index] {
                        measure_data_declaration(node, &mut measure);
                    }
                    pending.push(index);
                }
                SyntaxKind::HierarchyInstantiation => {
                    self.flush(children, &mut pending, &mut measure);
                    if let Child::Node(node) = &mut children[index] {
                        self.format_instantiation(node);
                    }
                }
                SyntaxKind::ModuleDeclaration => {
                    self.flush(children, &mut pending, &mut measure);
                    if let Child::Node(node) = &mut children[index] {
                        self.format_module(node);
                    }
                }
                SyntaxKind::GenerateRegion
                | SyntaxKind::GenerateBlock
                | SyntaxKind::LoopGenerate
                | SyntaxKind::ConditionalGenerate
                | SyntaxKind::SequentialBlock
                | SyntaxKind::ProceduralBlock
                | SyntaxKind::FunctionDeclaration
                | SyntaxKind::TaskDeclaration
                | SyntaxKind::PackageDeclaration => {
                    self.flush(children, &mut pending, &mut measure);
                    if let Child::Node(node) = &mut children[index] {
                        self.walk_container(&mut node.children);
                    }
                }
                _ => {
                    // A kind this engine does not align ends the block;
                    // the node itself passes through untouched.
                    self.flush(children, &mut pending, &mut measure);
                }
            }
        }
        self.flush(children, &mut pending, &mut measure);
    }

    fn flush(
        &mut self,
        children: &mut [Child],
        pending: &mut Vec<usize>,
        measure: &mut BlockMeasure,
    ) {
        for index in pending.drain(..) {
            if let Child::Node(node) = &mut children[index] {
                self.format_data_declaration(node, measure);
            }
        }
        *measure = BlockMeasure::default();
    }

    fn format_module(&mut self, module: &mut SyntaxNode) {
        for child in &mut module.children {
            if let Child::Node(header) = child {
                if header.kind == SyntaxKind::ModuleHeader {
                    for header_child in &mut header.children {
                        if let Child::Node(list) = header_child {
                            if list.kind == SyntaxKind::AnsiPortList {
                                self.format_port_list(list);
                            }
                        }
                    }
                }
            }
        }
        self.walk_container(&mut module.children);
    }

    // ------------------------------------------------------------------
    // Data declarations
    // ------------------------------------------------------------------

    fn format_data_declaration(&mut self, node: &mut SyntaxNode, measure: &BlockMeasure) {
        let mut budget = 0usize;
        let mut first = true;
        let mut modifier_col = 0usize;
        let mut declarator_done = false;

        for child in &mut node.children {
            match child {
                Child::Token(token) if matches!(token.kind, TokenKind::Keyword(_)) => {
                    // Modifier column.
                    if first {
                        self.engine.indent(token, 0);
                        first = false;
                    } else {
                        self.engine.replace_spacing(token, budget);
                    }
                    let width = measure
                        .modifier_sizes
                        .get(modifier_col)
                        .copied()
                        .unwrap_or(token.text.len());
                    budget = (width + 1).saturating_sub(token.text.len());
                    modifier_col += 1;
                }
                Child::Node(ty)
                    if matches!(ty.kind, SyntaxKind::IntegerType | SyntaxKind::NamedType) =>
                {
                    if modifier_col < measure.modifier_sizes.len() {
                        budget += measure.modifier_sizes[modifier_col..]
                            .iter()
                            .map(|w| w + 1)
                            .sum::<usize>();
                    }
                    if modifier_col != 0 && budget == 0 {
                        budget = 1;
                    }
                    budget = self.format_data_type(ty, first, budget, measure);
                    first = false;
                }
                Child::Node(declarator)
                    if declarator.kind == SyntaxKind::Declarator && !declarator_done =>
                {
                    budget = self.format_declarator(declarator, budget, measure, false);
                    declarator_done = true;
                }
                Child::Token(token) if token.kind == TokenKind::Semicolon => {
                    self.engine.replace_spacing(token, budget);
                    budget = 0;
                }
                _ => {}
            }
        }
    }

    /// Aligns the declarator name and unpacked dimensions; returns the
    /// residual budget for the terminator. Data declarations attach the
    /// semicolon directly when the block has no unpacked dimensions;
    /// port lists always carry the residual so commas align.
    fn format_declarator(
        &mut self,
        declarator: &mut SyntaxNode,
        budget: usize,
        measure: &BlockMeasure,
        keep_residual: bool,
    ) -> usize {
        let mut name_len = 0usize;
        if let Some(token) = declarator_name_mut(declarator) {
            name_len = token.text.len();
            self.engine.replace_spacing(token, budget);
        }

        let dims: Vec<&mut SyntaxNode> = declarator
            .children
            .iter_mut()
            .filter_map(|c| match c {
                Child::Node(node) if node.kind == SyntaxKind::RangeDimension => Some(node),
                _ => None,
            })
            .collect();

        if !keep_residual && measure.array_sizes.is_empty() && dims.is_empty() {
            return 0;
        }
        self.engine.align_dimension(
            dims,
            &measure.array_sizes,
            (measure.var_name_size + 1).saturating_sub(name_len),
        )
    }

    /// Type keyword, signing, and packed dimension columns. Returns the
    /// budget carried to the name column.
    fn format_data_type(
        &mut self,
        ty: &mut SyntaxNode,
        first: bool,
        budget: usize,
        measure: &BlockMeasure,
    ) -> usize {
        let mut budget = budget;
        let mut signing_seen = false;

        match ty.kind {
            SyntaxKind::IntegerType => {
                let mut keyword_seen = false;
                for child in &mut ty.children {
                    if let Child::Token(token) = child {
                        if !keyword_seen {
                            if first {
                                self.engine.indent(token, budget);
                            } else {
                                self.engine.replace_spacing(token, budget);
                            }
                            budget = (measure.type_keyword_size + 1)
                                .saturating_sub(token.text.len());
                            keyword_seen = true;
                        } else if matches!(
                            token.kind,
                            TokenKind::Keyword(Kw::Signed) | TokenKind::Keyword(Kw::Unsigned)
                        ) {
                            self.engine.replace_spacing(token, budget);
                            budget = (measure.type_signing_size + 1)
                                .saturating_sub(token.text.len());
                            signing_seen = true;
                        }
                    }
                }
            }
            SyntaxKind::NamedType => {
                if let Some(token) = ty.first_token_mut() {
                    if first {
                        self.engine.indent(token, budget);
                    } else {
                        self.engine.replace_spacing(token, budget);
                    }
                    budget = (measure.type_keyword_size + 1).saturating_sub(token.text.len());
                }
            }
            _ => return budget,
        }

        if measure.type_signing_size > 0 && !signing_seen {
            budget += measure.type_signing_size + 1;
        }

        let dims: Vec<&mut SyntaxNode> = type_dimensions_mut(ty);
        let has_dims = !dims.is_empty();
        let mut remaining = self.engine.align_dimension(dims, &measure.type_sizes, budget);
        // The name column starts one separator after the dimension
        // group; rows without brackets carry the separator themselves.
        if has_dims {
            if remaining == 0 {
                remaining = 1;
            }
        } else {
            remaining += 1;
        }
        remaining
    }

    // ------------------------------------------------------------------
    // Port lists
    // ------------------------------------------------------------------

    fn format_port_list(&mut self, list: &mut SyntaxNode) {
        let mut measure = BlockMeasure::default();
        for port in list.child_nodes() {
            if port.kind == SyntaxKind::ImplicitAnsiPort {
                measure_port(port, &mut measure);
            }
        }

        let mut residual = 0usize;
        for child in &mut list.children {
            match child {
                Child::Node(port) if port.kind == SyntaxKind::ImplicitAnsiPort => {
                    residual = self.format_port(port, &measure);
                }
                Child::Token(token)
                    if matches!(token.kind, TokenKind::Comma | TokenKind::RParen) =>
                {
                    // Terminators align to the widest member; this also
                    // parks the closing paren after the last port.
                    self.engine.replace_spacing(token, residual);
                    residual = 0;
                }
                _ => {}
            }
        }
    }

    fn format_port(&mut self, port: &mut SyntaxNode, measure: &BlockMeasure) -> usize {
        let mut budget = 0usize;
        let mut first = true;
        let mut modifier_col = 0usize;
        let mut had_type = false;

        for child in &mut port.children {
            match child {
                Child::Node(header) if header.kind == SyntaxKind::VariablePortHeader => {
                    for header_child in &mut header.children {
                        match header_child {
                            Child::Token(token) => {
                                if first {
                                    self.engine.indent(token, 0);
                                    first = false;
                                } else {
                                    self.engine.replace_spacing(token, budget);
                                }
                                let width = measure
                                    .modifier_sizes
                                    .get(modifier_col)
                                    .copied()
                                    .unwrap_or(token.text.len());
                                budget = (width + 1).saturating_sub(token.text.len());
                                modifier_col += 1;
                            }
                            Child::Node(ty)
                                if matches!(
                                    ty.kind,
                                    SyntaxKind::IntegerType | SyntaxKind::NamedType
                                ) =>
                            {
                                if modifier_col < measure.modifier_sizes.len() {
                                    budget += measure.modifier_sizes[modifier_col..]
                                        .iter()
                                        .map(|w| w + 1)
                                        .sum::<usize>();
                                }
                                if modifier_col != 0 && budget == 0 {
                                    budget = 1;
                                }
                                budget = self.format_data_type(ty, first, budget, measure);
                                first = false;
                                had_type = true;
                            }
                            Child::Node(_) => {}
                        }
                    }
                }
                Child::Node(header) if header.kind == SyntaxKind::InterfacePortHeader => {
                    // Interface ports are indented but not columnized.
                    if let Some(token) = header.first_token_mut() {
                        self.engine.indent(token, 0);
                        first = false;
                    }
                    budget = 1;
                    had_type = true;
                }
                Child::Node(declarator) if declarator.kind == SyntaxKind::Declarator => {
                    if !had_type {
                        // Headerless continuation port: compensate for
                        // the type columns it does not occupy.
                        if modifier_col < measure.modifier_sizes.len() {
                            budget += measure.modifier_sizes[modifier_col..]
                                .iter()
                                .map(|w| w + 1)
                                .sum::<usize>();
                        }
                        budget += measure.type_keyword_size + 1;
                        if measure.type_signing_size > 0 {
                            budget += measure.type_signing_size + 1;
                        }
                        let mut remaining = self.engine.align_dimension(
                            Vec::new(),
                            &measure.type_sizes,
                            budget,
                        );
                        remaining += 1;
                        if first {
                            // No header at all: the name opens the line.
                            if let Some(token) = declarator_name_mut(declarator) {
                                self.engine.indent(token, remaining);
                            }
                            first = false;
                            budget = 0;
                            let residual = self.format_declarator_dims(declarator, measure);
                            return residual;
                        }
                        budget = remaining;
                    }
                    return self.format_declarator(declarator, budget, measure, true);
                }
                _ => {}
            }
        }
        budget
    }

    /// Unpacked dimensions only (name already placed).
    fn format_declarator_dims(
        &mut self,
        declarator: &mut SyntaxNode,
        measure: &BlockMeasure,
    ) -> usize {
        let name_len = declarator_name_len(declarator);
        let dims: Vec<&mut SyntaxNode> = declarator
            .children
            .iter_mut()
            .filter_map(|c| match c {
                Child::Node(node) if node.kind == SyntaxKind::RangeDimension => Some(node),
                _ => None,
            })
            .collect();
        self.engine.align_dimension(
            dims,
            &measure.array_sizes,
            (measure.var_name_size + 1).saturating_sub(name_len),
        )
    }

    // ------------------------------------------------------------------
    // Instantiations
    // ------------------------------------------------------------------

    fn format_instantiation(&mut self, node: &mut SyntaxNode) {
        let mut measure = ConnMeasure::default();
        measure_instantiation(node, &mut measure);

        if let Some(Child::Token(token)) = node
            .children
            .iter_mut()
            .find(|c| matches!(c, Child::Token(t) if t.kind == TokenKind::Identifier))
        {
            self.engine.indent(token, 0);
        }

        for child in &mut node.children {
            match child {
                Child::Node(params) if params.kind == SyntaxKind::ParameterValueAssignment => {
                    self.format_param_assignment(params, &measure);
                }
                Child::Node(hier) if hier.kind == SyntaxKind::HierarchicalInstance => {
                    self.format_hierarchical_instance(hier, &measure);
                }
                _ => {}
            }
        }
    }

    fn format_param_assignment(&mut self, params: &mut SyntaxNode, measure: &ConnMeasure) {
        for child in &mut params.children {
            if let Child::Token(token) = child {
                match token.kind {
                    TokenKind::Hash => self.engine.replace_spacing(token, 1),
                    TokenKind::LParen => self.engine.remove_spacing(token),
                    _ => {}
                }
            }
        }

        {
            let _bind_indent = IndentGuard::new(self.engine);
            for child in &mut params.children {
                if let Child::Node(named) = child {
                    if named.kind == SyntaxKind::NamedParamAssignment {
                        self.format_named_connection(
                            named,
                            measure.param_name_size,
                            measure.param_value_size,
                        );
                    }
                }
            }
        }

        // The closing paren sits back at the surrounding level.
        if let Some(Child::Token(token)) = params
            .children
            .iter_mut()
            .rev()
            .find(|c| matches!(c, Child::Token(t) if t.kind == TokenKind::RParen))
        {
            self.engine.indent(token, 0);
        }
    }

    fn format_hierarchical_instance(&mut self, hier: &mut SyntaxNode, measure: &ConnMeasure) {
        let mut open_seen = false;
        for child in &mut hier.children {
            match child {
                Child::Node(declarator) if declarator.kind == SyntaxKind::Declarator => {
                    if let Some(token) = declarator_name_mut(declarator) {
                        self.engine.replace_spacing(token, 1);
                    }
                }
                Child::Token(token) if token.kind == TokenKind::LParen && !open_seen => {
                    self.engine.replace_spacing(token, 1);
                    open_seen = true;
                }
                _ => {}
            }
        }

        {
            let _port_indent = IndentGuard::new(self.engine);
            for child in &mut hier.children {
                match child {
                    Child::Node(conn) if conn.kind == SyntaxKind::NamedPortConnection => {
                        self.format_named_connection(
                            conn,
                            measure.port_name_size,
                            measure.port_value_size,
                        );
                    }
                    Child::Token(token) if token.kind == TokenKind::Comma => {
                        self.engine.remove_spacing(token);
                    }
                    _ => {}
                }
            }
        }

        if let Some(Child::Token(token)) = hier
            .children
            .iter_mut()
            .rev()
            .find(|c| matches!(c, Child::Token(t) if t.kind == TokenKind::RParen))
        {
            self.engine.indent(token, 0);
        }
    }

    /// `.name (value)` with the parens aligned across the list.
    fn format_named_connection(&mut self, conn: &mut SyntaxNode, name_size: usize, value_size: usize) {
        let mut name_len = 0usize;
        let value_len = conn
            .child_nodes()
            .find(|n| n.kind == SyntaxKind::Expression)
            .map(|n| n.raw_text().len());

        for child in &mut conn.children {
            if let Child::Token(token) = child {
                match token.kind {
                    TokenKind::Dot => self.engine.indent(token, 0),
                    TokenKind::Identifier => name_len = token.text.len(),
                    TokenKind::LParen => {
                        self.engine
                            .replace_spacing(token, name_size.saturating_sub(name_len));
                    }
                    TokenKind::RParen => {
                        let spacing = match value_len {
                            Some(len) => value_size.saturating_sub(len),
                            None => value_size,
                        };
                        self.engine.replace_spacing(token, spacing);
                    }
                    _ => {}
                }
            }
        }
    }
}

// ----------------------------------------------------------------------
// Measurement helpers
// ----------------------------------------------------------------------

fn measure_data_declaration(node: &SyntaxNode, measure: &mut BlockMeasure) {
    let modifiers: Vec<usize> = node
        .child_tokens()
        .filter(|t| matches!(t.kind, TokenKind::Keyword(_)))
        .map(|t| t.text.len())
        .collect();
    grow_max(&mut measure.modifier_sizes, &modifiers);

    if let Some(ty) = node
        .child_nodes()
        .find(|n| matches!(n.kind, SyntaxKind::IntegerType | SyntaxKind::NamedType))
    {
        measure_type(ty, measure);
    }

    for declarator in node.child_nodes() {
        if declarator.kind == SyntaxKind::Declarator {
            measure_declarator(declarator, measure);
        }
    }
}

fn measure_port(port: &SyntaxNode, measure: &mut BlockMeasure) {
    if let Some(header) = port.find_node(SyntaxKind::VariablePortHeader) {
        let modifiers: Vec<usize> = header
            .child_tokens()
            .filter(|t| matches!(t.kind, TokenKind::Keyword(_)))
            .map(|t| t.text.len())
            .collect();
        grow_max(&mut measure.modifier_sizes, &modifiers);
        if let Some(ty) = header
            .child_nodes()
            .find(|n| matches!(n.kind, SyntaxKind::IntegerType | SyntaxKind::NamedType))
        {
            measure_type(ty, measure);
        }
    }
    if let Some(declarator) = port.find_node(SyntaxKind::Declarator) {
        measure_declarator(declarator, measure);
    }
}

fn measure_type(ty: &SyntaxNode, measure: &mut BlockMeasure) {
    match ty.kind {
        SyntaxKind::IntegerType => {
            let mut tokens = ty.child_tokens();
            if let Some(keyword) = tokens.next() {
                measure.type_keyword_size = measure.type_keyword_size.max(keyword.text.len());
            }
            for token in tokens {
                if matches!(
                    token.kind,
                    TokenKind::Keyword(Kw::Signed) | TokenKind::Keyword(Kw::Unsigned)
                ) {
                    measure.type_signing_size = measure.type_signing_size.max(token.text.len());
                }
            }
            let dims: Vec<&SyntaxNode> = ty
                .child_nodes()
                .filter(|n| n.kind == SyntaxKind::RangeDimension)
                .collect();
            measure_dimensions(&dims, &mut measure.type_sizes);
        }
        SyntaxKind::NamedType => {
            if let Some(token) = ty.first_token() {
                measure.type_keyword_size = measure.type_keyword_size.max(token.text.len());
            }
        }
        _ => {}
    }
}

fn measure_declarator(declarator: &SyntaxNode, measure: &mut BlockMeasure) {
    if let Some(token) = declarator.child_tokens().next() {
        measure.var_name_size = measure.var_name_size.max(token.text.len());
    }
    let dims: Vec<&SyntaxNode> = declarator
        .child_nodes()
        .filter(|n| n.kind == SyntaxKind::RangeDimension)
        .collect();
    measure_dimensions(&dims, &mut measure.array_sizes);
}

/// Half-widths of each `[hi:lo]`; a bare `[expr]` registers half its
/// collapsed length on each side.
fn measure_dimensions(dims: &[&SyntaxNode], sizes: &mut Vec<(usize, usize)>) {
    if dims.len() > sizes.len() {
        sizes.resize(dims.len(), (0, 0));
    }
    for (index, dim) in dims.iter().enumerate() {
        let has_colon = dim.child_tokens().any(|t| t.kind == TokenKind::Colon);
        let exprs: Vec<usize> = dim
            .child_nodes()
            .filter(|n| n.kind == SyntaxKind::Expression)
            .map(|n| n.raw_text().len())
            .collect();
        let (hi, lo) = if has_colon {
            (
                exprs.first().copied().unwrap_or(0),
                exprs.get(1).copied().unwrap_or(0),
            )
        } else {
            let len = exprs.first().copied().unwrap_or(0);
            (len / 2, len / 2)
        };
        sizes[index].0 = sizes[index].0.max(hi);
        sizes[index].1 = sizes[index].1.max(lo);
    }
}

fn measure_instantiation(node: &SyntaxNode, measure: &mut ConnMeasure) {
    if let Some(params) = node.find_node(SyntaxKind::ParameterValueAssignment) {
        for named in params.child_nodes() {
            if named.kind == SyntaxKind::NamedParamAssignment {
                if let Some(name) = named
                    .child_tokens()
                    .find(|t| t.kind == TokenKind::Identifier)
                {
                    measure.param_name_size = measure.param_name_size.max(name.text.len());
                }
                if let Some(expr) = named.find_node(SyntaxKind::Expression) {
                    measure.param_value_size =
                        measure.param_value_size.max(expr.raw_text().len());
                }
            }
        }
    }
    for hier in node.child_nodes() {
        if hier.kind != SyntaxKind::HierarchicalInstance {
            continue;
        }
        for conn in hier.child_nodes() {
            if conn.kind != SyntaxKind::NamedPortConnection {
                continue;
            }
            if let Some(name) = conn
                .child_tokens()
                .find(|t| t.kind == TokenKind::Identifier)
            {
                measure.port_name_size = measure.port_name_size.max(name.text.len());
            }
            if let Some(expr) = conn.find_node(SyntaxKind::Expression) {
                measure.port_value_size = measure.port_value_size.max(expr.raw_text().len());
            }
        }
    }
}

fn grow_max(sizes: &mut Vec<usize>, widths: &[usize]) {
    if widths.len() > sizes.len() {
        sizes.resize(widths.len(), 0);
    }
    for (index, width) in widths.iter().enumerate() {
        sizes[index] = sizes[index].max(*width);
    }
}

fn declarator_name_mut(declarator: &mut SyntaxNode) -> Option<&mut sv_syntax::Token> {
    declarator.children.iter_mut().find_map(|c| match c {
        Child::Token(token) if token.kind == TokenKind::Identifier => Some(token),
        _ => None,
    })
}

fn declarator_name_len(declarator: &SyntaxNode) -> usize {
    declarator
        .child_tokens()
        .find(|t| t.kind == TokenKind::Identifier)
        .map(|t| t.text.len())
        .unwrap_or(0)
}

fn type_dimensions_mut(ty: &mut SyntaxNode) -> Vec<&mut SyntaxNode> {
    ty.children
        .iter_mut()
        .filter_map(|c| match c {
            Child::Node(node) if node.kind == SyntaxKind::RangeDimension => Some(node),
            _ => None,
        })
        .collect()
}
