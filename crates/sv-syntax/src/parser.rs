//! Recursive-descent parser producing the trivia-preserving CST.
//!
//! The grammar covers the declaration-level subset the diplomat tools
//! consume: modules with ANSI headers, packages, data/net declarations,
//! continuous assigns, hierarchy instantiations, generate constructs,
//! procedural blocks, functions/tasks, and structured name syntaxes inside
//! expressions. Anything else is preserved as an `Unknown` node so later
//! passes can reproduce the source byte-for-byte.

use crate::node::{SyntaxKind, SyntaxNode};
use crate::source::FileId;
use crate::token::{Kw, Token, TokenKind};

/// Parser failure: the offending offset lets the caller render a proper
/// location through the source manager.
#[derive(Debug, thiserror::Error)]
#[error("{message} (offset {offset})")]
pub struct ParseError {
    pub message: String,
    pub file: FileId,
    pub offset: u32,
}

/// Parses a lexed token stream into a `CompilationUnit` CST.
pub fn parse_tokens(file: FileId, mut tokens: Vec<Token>) -> Result<SyntaxNode, ParseError> {
    if tokens.is_empty() {
        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            trivia: Vec::new(),
            file,
            offset: 0,
            expansion: None,
        });
    }
    let mut parser = Parser { tokens, pos: 0, file };
    parser.compilation_unit()
}

/// Keywords that close an enclosing construct; expression and recovery
/// scans never consume them.
fn is_structural_keyword(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Keyword(
            Kw::End
                | Kw::Endmodule
                | Kw::Endpackage
                | Kw::Endgenerate
                | Kw::Endfunction
                | Kw::Endtask
                | Kw::Endcase
                | Kw::Begin
                | Kw::Else
        )
    )
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: FileId,
}

impl Parser {
    fn peek(&self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn nth(&self, lookahead: usize) -> &Token {
        let index = (self.pos + lookahead).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_kw(&self, kw: Kw) -> bool {
        self.peek().kind == TokenKind::Keyword(kw)
    }

    fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            file: self.file,
            offset: self.peek().offset,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected {what}, found {:?}", self.peek().kind)))
        }
    }

    fn expect_kw(&mut self, kw: Kw, what: &str) -> Result<Token, ParseError> {
        self.expect(TokenKind::Keyword(kw), what)
    }

    // ------------------------------------------------------------------
    // Top level
    // ------------------------------------------------------------------

    fn compilation_unit(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut unit = SyntaxNode::new(SyntaxKind::CompilationUnit);
        loop {
            if self.at_eof() {
                unit.push_token(self.bump());
                return Ok(unit);
            }
            match self.peek().kind {
                TokenKind::Keyword(Kw::Module) => unit.push_node(self.module_declaration()?),
                TokenKind::Keyword(Kw::Package) => unit.push_node(self.package_declaration()?),
                // $unit-scope declarations share the module-item grammar.
                _ => unit.push_node(self.module_item()?),
            }
        }
    }

    fn module_declaration(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut module = SyntaxNode::new(SyntaxKind::ModuleDeclaration);
        module.push_node(self.module_header()?);
        while !self.at_kw(Kw::Endmodule) && !self.at_eof() {
            module.push_node(self.module_item()?);
        }
        module.push_token(self.expect_kw(Kw::Endmodule, "`endmodule`")?);
        Ok(module)
    }

    fn module_header(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut header = SyntaxNode::new(SyntaxKind::ModuleHeader);
        header.push_token(self.expect_kw(Kw::Module, "`module`")?);
        header.push_token(self.expect(TokenKind::Identifier, "module name")?);
        if self.at(TokenKind::Hash) && self.nth(1).kind == TokenKind::LParen {
            header.push_node(self.parameter_port_list()?);
        }
        if self.at(TokenKind::LParen) {
            header.push_node(self.ansi_port_list()?);
        }
        header.push_token(self.expect(TokenKind::Semicolon, "`;` after module header")?);
        Ok(header)
    }

    fn parameter_port_list(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut list = SyntaxNode::new(SyntaxKind::ParameterPortList);
        list.push_token(self.bump()); // #
        list.push_token(self.bump()); // (
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            if self.at(TokenKind::Comma) {
                list.push_token(self.bump());
            } else {
                list.push_node(self.parameter_declaration(false)?);
            }
        }
        list.push_token(self.expect(TokenKind::RParen, "`)` after parameter ports")?);
        Ok(list)
    }

    fn parameter_declaration(&mut self, item_form: bool) -> Result<SyntaxNode, ParseError> {
        let mut decl = SyntaxNode::new(SyntaxKind::ParameterDeclaration);
        if self.at_kw(Kw::Parameter) || self.at_kw(Kw::Localparam) {
            decl.push_token(self.bump());
        }
        // `parameter W = 8` has no type; a named type needs a second
        // identifier after it.
        let keyword_type = matches!(
            self.peek().kind,
            TokenKind::Keyword(kw) if kw.is_integer_type() || kw.is_net_type()
        );
        let named_type = self.at(TokenKind::Identifier)
            && self.nth(1).kind == TokenKind::Identifier;
        if keyword_type || named_type {
            if let Some(data_type) = self.try_data_type() {
                decl.push_node(data_type?);
            }
        }
        decl.push_node(self.declarator()?);
        if item_form {
            while self.at(TokenKind::Comma) {
                decl.push_token(self.bump());
                decl.push_node(self.declarator()?);
            }
            decl.push_token(self.expect(TokenKind::Semicolon, "`;` after parameter")?);
        }
        Ok(decl)
    }

    fn ansi_port_list(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut list = SyntaxNode::new(SyntaxKind::AnsiPortList);
        list.push_token(self.bump()); // (
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            if self.at(TokenKind::Comma) {
                list.push_token(self.bump());
            } else {
                list.push_node(self.ansi_port()?);
            }
        }
        list.push_token(self.expect(TokenKind::RParen, "`)` after port list")?);
        Ok(list)
    }

    fn ansi_port(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut port = SyntaxNode::new(SyntaxKind::ImplicitAnsiPort);

        // `iface.modport name` interface ports.
        if self.at(TokenKind::Identifier) && self.nth(1).kind == TokenKind::Dot {
            let mut header = SyntaxNode::new(SyntaxKind::InterfacePortHeader);
            header.push_token(self.bump()); // interface name
            header.push_token(self.bump()); // .
            header.push_token(self.expect(TokenKind::Identifier, "modport name")?);
            port.push_node(header);
            port.push_node(self.declarator()?);
            return Ok(port);
        }

        let mut header = SyntaxNode::new(SyntaxKind::VariablePortHeader);
        if self.at_kw(Kw::Const) {
            header.push_token(self.bump());
        }
        if let TokenKind::Keyword(kw) = self.peek().kind {
            if kw.is_direction() {
                header.push_token(self.bump());
            }
        }
        if self.at_kw(Kw::Var) {
            header.push_token(self.bump());
        }
        // A lone identifier is the port name, not a named type.
        let named_type_ahead = self.at(TokenKind::Identifier)
            && self.nth(1).kind == TokenKind::Identifier;
        let keyword_type_ahead = matches!(
            self.peek().kind,
            TokenKind::Keyword(kw) if kw.is_integer_type() || kw.is_net_type()
        );
        if keyword_type_ahead || named_type_ahead {
            if let Some(data_type) = self.try_data_type() {
                header.push_node(data_type?);
            }
        }
        port.push_node(header);
        port.push_node(self.declarator()?);
        Ok(port)
    }

    // ------------------------------------------------------------------
    // Module items
    // ------------------------------------------------------------------

    fn module_item(&mut self) -> Result<SyntaxNode, ParseError> {
        match self.peek().kind {
            TokenKind::Keyword(Kw::Parameter) | TokenKind::Keyword(Kw::Localparam) => {
                self.parameter_declaration(true)
            }
            TokenKind::Keyword(kw)
                if kw.is_integer_type()
                    || kw.is_net_type()
                    || matches!(kw, Kw::Const | Kw::Static | Kw::Automatic | Kw::Var) =>
            {
                self.data_declaration()
            }
            TokenKind::Keyword(Kw::Assign) => self.continuous_assign(),
            TokenKind::Keyword(Kw::Genvar) => self.genvar_declaration(),
            TokenKind::Keyword(Kw::Generate) => self.generate_region(),
            TokenKind::Keyword(Kw::For) => self.loop_generate(),
            TokenKind::Keyword(Kw::If) => self.conditional_generate(),
            TokenKind::Keyword(Kw::Begin) => self.generate_block(),
            TokenKind::Keyword(Kw::Function) => self.function_declaration(),
            TokenKind::Keyword(Kw::Task) => self.task_declaration(),
            TokenKind::Keyword(Kw::Typedef) => self.typedef_declaration(),
            TokenKind::Keyword(Kw::Import) => self.package_import(),
            TokenKind::Keyword(kw) if kw.is_procedural() => self.procedural_block(),
            TokenKind::MacroIdent => self.macro_usage(),
            TokenKind::Identifier => {
                if self.at_instantiation() {
                    self.hierarchy_instantiation()
                } else if self.nth(1).kind == TokenKind::Identifier
                    && matches!(
                        self.nth(2).kind,
                        TokenKind::Semicolon
                            | TokenKind::Comma
                            | TokenKind::Assign
                            | TokenKind::LBracket
                    )
                {
                    // Named-type declaration: `my_type_t x;`
                    self.data_declaration()
                } else {
                    Ok(self.unknown_statement())
                }
            }
            _ => Ok(self.unknown_statement()),
        }
    }

    /// `ident #(` or `ident ident (` begins an instantiation.
    fn at_instantiation(&self) -> bool {
        if self.nth(1).kind == TokenKind::Hash {
            return true;
        }
        self.nth(1).kind == TokenKind::Identifier && self.nth(2).kind == TokenKind::LParen
    }

    fn data_declaration(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut decl = SyntaxNode::new(SyntaxKind::DataDeclaration);
        while matches!(
            self.peek().kind,
            TokenKind::Keyword(Kw::Const)
                | TokenKind::Keyword(Kw::Static)
                | TokenKind::Keyword(Kw::Automatic)
                | TokenKind::Keyword(Kw::Var)
        ) {
            decl.push_token(self.bump());
        }
        match self.try_data_type() {
            Some(data_type) => decl.push_node(data_type?),
            None => return Err(self.error("expected a data type")),
        }
        decl.push_node(self.declarator()?);
        while self.at(TokenKind::Comma) {
            decl.push_token(self.bump());
            decl.push_node(self.declarator()?);
        }
        decl.push_token(self.expect(TokenKind::Semicolon, "`;` after declaration")?);
        Ok(decl)
    }

    /// Integer/net types and named types; `None` when the cursor is not at
    /// a type.
    fn try_data_type(&mut self) -> Option<Result<SyntaxNode, ParseError>> {
        match self.peek().kind {
            TokenKind::Keyword(kw) if kw.is_integer_type() || kw.is_net_type() => {
                let mut node = SyntaxNode::new(SyntaxKind::IntegerType);
                node.push_token(self.bump());
                if self.at_kw(Kw::Signed) || self.at_kw(Kw::Unsigned) {
                    node.push_token(self.bump());
                }
                while self.at(TokenKind::LBracket) {
                    match self.range_dimension() {
                        Ok(dim) => node.push_node(dim),
                        Err(err) => return Some(Err(err)),
                    }
                }
                Some(Ok(node))
            }
            TokenKind::Identifier => {
                let mut node = SyntaxNode::new(SyntaxKind::NamedType);
                match self.name_syntax() {
                    Ok(name) => node.push_node(name),
                    Err(err) => return Some(Err(err)),
                }
                Some(Ok(node))
            }
            _ => None,
        }
    }

    fn range_dimension(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut dim = SyntaxNode::new(SyntaxKind::RangeDimension);
        dim.push_token(self.expect(TokenKind::LBracket, "`[`")?);
        dim.push_node(self.expression(&[TokenKind::Colon, TokenKind::RBracket])?);
        if self.at(TokenKind::Colon) {
            dim.push_token(self.bump());
            dim.push_node(self.expression(&[TokenKind::RBracket])?);
        }
        dim.push_token(self.expect(TokenKind::RBracket, "`]`")?);
        Ok(dim)
    }

    fn declarator(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut decl = SyntaxNode::new(SyntaxKind::Declarator);
        decl.push_token(self.expect(TokenKind::Identifier, "declarator name")?);
        while self.at(TokenKind::LBracket) {
            decl.push_node(self.range_dimension()?);
        }
        if self.at(TokenKind::Assign) {
            let mut init = SyntaxNode::new(SyntaxKind::EqualsInitializer);
            init.push_token(self.bump());
            init.push_node(self.expression(&[TokenKind::Comma, TokenKind::RParen])?);
            decl.push_node(init);
        }
        Ok(decl)
    }

    fn continuous_assign(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut assign = SyntaxNode::new(SyntaxKind::ContinuousAssign);
        assign.push_token(self.bump()); // assign
        assign.push_node(self.expression(&[])?);
        assign.push_token(self.expect(TokenKind::Semicolon, "`;` after assign")?);
        Ok(assign)
    }

    fn genvar_declaration(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut decl = SyntaxNode::new(SyntaxKind::GenvarDeclaration);
        decl.push_token(self.bump()); // genvar
        decl.push_node(self.declarator()?);
        while self.at(TokenKind::Comma) {
            decl.push_token(self.bump());
            decl.push_node(self.declarator()?);
        }
        decl.push_token(self.expect(TokenKind::Semicolon, "`;` after genvar")?);
        Ok(decl)
    }

    fn generate_region(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut region = SyntaxNode::new(SyntaxKind::GenerateRegion);
        region.push_token(self.bump()); // generate
        while !self.at_kw(Kw::Endgenerate) && !self.at_eof() {
            region.push_node(self.module_item()?);
        }
        region.push_token(self.expect_kw(Kw::Endgenerate, "`endgenerate`")?);
        Ok(region)
    }

    fn loop_generate(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut looped = SyntaxNode::new(SyntaxKind::LoopGenerate);
        looped.push_token(self.bump()); // for
        looped.push_token(self.expect(TokenKind::LParen, "`(` after for")?);
        if self.at_kw(Kw::Genvar) {
            looped.push_token(self.bump());
        }
        looped.push_node(self.expression(&[])?);
        looped.push_token(self.expect(TokenKind::Semicolon, "`;` in for header")?);
        looped.push_node(self.expression(&[])?);
        looped.push_token(self.expect(TokenKind::Semicolon, "`;` in for header")?);
        looped.push_node(self.expression(&[TokenKind::RParen])?);
        looped.push_token(self.expect(TokenKind::RParen, "`)` after for header")?);
        looped.push_node(self.generate_body_item()?);
        Ok(looped)
    }

    fn conditional_generate(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut cond = SyntaxNode::new(SyntaxKind::ConditionalGenerate);
        cond.push_token(self.bump()); // if
        cond.push_token(self.expect(TokenKind::LParen, "`(` after if")?);
        cond.push_node(self.expression(&[TokenKind::RParen])?);
        cond.push_token(self.expect(TokenKind::RParen, "`)` after condition")?);
        cond.push_node(self.generate_body_item()?);
        if self.at_kw(Kw::Else) {
            cond.push_token(self.bump());
            cond.push_node(self.generate_body_item()?);
        }
        Ok(cond)
    }

    fn generate_body_item(&mut self) -> Result<SyntaxNode, ParseError> {
        if self.at_kw(Kw::Begin) {
            self.generate_block()
        } else {
            self.module_item()
        }
    }

    fn generate_block(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut block = SyntaxNode::new(SyntaxKind::GenerateBlock);
        block.push_token(self.expect_kw(Kw::Begin, "`begin`")?);
        if self.at(TokenKind::Colon) {
            block.push_token(self.bump());
            block.push_token(self.expect(TokenKind::Identifier, "block label")?);
        }
        while !self.at_kw(Kw::End) && !self.at_eof() {
            block.push_node(self.module_item()?);
        }
        block.push_token(self.expect_kw(Kw::End, "`end`")?);
        if self.at(TokenKind::Colon) {
            block.push_token(self.bump());
            block.push_token(self.expect(TokenKind::Identifier, "block label")?);
        }
        Ok(block)
    }

    fn hierarchy_instantiation(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut inst = SyntaxNode::new(SyntaxKind::HierarchyInstantiation);
        inst.push_token(self.bump()); // module type
        if self.at(TokenKind::Hash) {
            inst.push_node(self.parameter_value_assignment()?);
        }
        inst.push_node(self.hierarchical_instance()?);
        while self.at(TokenKind::Comma) {
            inst.push_token(self.bump());
            inst.push_node(self.hierarchical_instance()?);
        }
        inst.push_token(self.expect(TokenKind::Semicolon, "`;` after instantiation")?);
        Ok(inst)
    }

    fn parameter_value_assignment(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut params = SyntaxNode::new(SyntaxKind::ParameterValueAssignment);
        params.push_token(self.bump()); // #
        params.push_token(self.expect(TokenKind::LParen, "`(` after #")?);
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            if self.at(TokenKind::Comma) {
                params.push_token(self.bump());
            } else if self.at(TokenKind::Dot) {
                let mut named = SyntaxNode::new(SyntaxKind::NamedParamAssignment);
                named.push_token(self.bump()); // .
                named.push_token(self.expect(TokenKind::Identifier, "parameter name")?);
                named.push_token(self.expect(TokenKind::LParen, "`(` after parameter name")?);
                if !self.at(TokenKind::RParen) {
                    named.push_node(self.expression(&[TokenKind::RParen])?);
                }
                named.push_token(self.expect(TokenKind::RParen, "`)` after parameter value")?);
                params.push_node(named);
            } else {
                let mut ordered = SyntaxNode::new(SyntaxKind::OrderedParamAssignment);
                ordered.push_node(self.expression(&[TokenKind::Comma, TokenKind::RParen])?);
                params.push_node(ordered);
            }
        }
        params.push_token(self.expect(TokenKind::RParen, "`)` after parameters")?);
        Ok(params)
    }

    fn hierarchical_instance(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut instance = SyntaxNode::new(SyntaxKind::HierarchicalInstance);
        instance.push_node(self.declarator()?);
        instance.push_token(self.expect(TokenKind::LParen, "`(` after instance name")?);
        while !self.at(TokenKind::RParen) && !self.at_eof() {
            if self.at(TokenKind::Comma) {
                instance.push_token(self.bump());
            } else if self.at(TokenKind::Dot) {
                let mut named = SyntaxNode::new(SyntaxKind::NamedPortConnection);
                named.push_token(self.bump()); // .
                if self.at(TokenKind::Operator) && self.peek().text == "*" {
                    named.push_token(self.bump()); // .* wildcard
                } else {
                    named.push_token(self.expect(TokenKind::Identifier, "port name")?);
                    if self.at(TokenKind::LParen) {
                        named.push_token(self.bump());
                        if !self.at(TokenKind::RParen) {
                            named.push_node(self.expression(&[TokenKind::RParen])?);
                        }
                        named.push_token(self.expect(TokenKind::RParen, "`)` after connection")?);
                    }
                }
                instance.push_node(named);
            } else {
                let mut ordered = SyntaxNode::new(SyntaxKind::OrderedPortConnection);
                ordered.push_node(self.expression(&[TokenKind::Comma, TokenKind::RParen])?);
                instance.push_node(ordered);
            }
        }
        instance.push_token(self.expect(TokenKind::RParen, "`)` after connections")?);
        Ok(instance)
    }

    fn procedural_block(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut block = SyntaxNode::new(SyntaxKind::ProceduralBlock);
        block.push_token(self.bump()); // always / initial / ...
        if self.at(TokenKind::At) {
            let mut event = SyntaxNode::new(SyntaxKind::Unknown);
            event.push_token(self.bump()); // @
            if self.at(TokenKind::LParen) {
                event.push_token(self.bump());
                event.push_node(self.expression(&[TokenKind::RParen])?);
                event.push_token(self.expect(TokenKind::RParen, "`)` after event")?);
            } else if self.at(TokenKind::Operator) && self.peek().text == "*" {
                event.push_token(self.bump());
            }
            block.push_node(event);
        }
        block.push_node(self.statement()?);
        Ok(block)
    }

    fn statement(&mut self) -> Result<SyntaxNode, ParseError> {
        match self.peek().kind {
            TokenKind::Keyword(Kw::Begin) => self.sequential_block(),
            TokenKind::Keyword(Kw::If) => {
                let mut stmt = SyntaxNode::new(SyntaxKind::Statement);
                stmt.push_token(self.bump());
                stmt.push_token(self.expect(TokenKind::LParen, "`(` after if")?);
                stmt.push_node(self.expression(&[TokenKind::RParen])?);
                stmt.push_token(self.expect(TokenKind::RParen, "`)` after condition")?);
                stmt.push_node(self.statement()?);
                if self.at_kw(Kw::Else) {
                    stmt.push_token(self.bump());
                    stmt.push_node(self.statement()?);
                }
                Ok(stmt)
            }
            TokenKind::Keyword(Kw::For) | TokenKind::Keyword(Kw::While) => {
                let mut stmt = SyntaxNode::new(SyntaxKind::Statement);
                stmt.push_token(self.bump());
                stmt.push_token(self.expect(TokenKind::LParen, "`(` after loop keyword")?);
                while !self.at(TokenKind::RParen) && !self.at_eof() {
                    if self.at(TokenKind::Semicolon) {
                        stmt.push_token(self.bump());
                    } else {
                        stmt.push_node(
                            self.expression(&[TokenKind::RParen])?,
                        );
                    }
                }
                stmt.push_token(self.expect(TokenKind::RParen, "`)` after loop header")?);
                stmt.push_node(self.statement()?);
                Ok(stmt)
            }
            TokenKind::Keyword(Kw::Case) => self.case_statement(),
            TokenKind::Keyword(Kw::Return) => {
                let mut stmt = SyntaxNode::new(SyntaxKind::Statement);
                stmt.push_token(self.bump());
                if !self.at(TokenKind::Semicolon) {
                    stmt.push_node(self.expression(&[])?);
                }
                stmt.push_token(self.expect(TokenKind::Semicolon, "`;` after return")?);
                Ok(stmt)
            }
            TokenKind::MacroIdent => {
                let mut stmt = SyntaxNode::new(SyntaxKind::Statement);
                stmt.push_node(self.macro_usage()?);
                if self.at(TokenKind::Semicolon) {
                    stmt.push_token(self.bump());
                }
                Ok(stmt)
            }
            _ => {
                let mut stmt = SyntaxNode::new(SyntaxKind::Statement);
                stmt.push_node(self.expression(&[])?);
                stmt.push_token(self.expect(TokenKind::Semicolon, "`;` after statement")?);
                Ok(stmt)
            }
        }
    }

    fn case_statement(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut stmt = SyntaxNode::new(SyntaxKind::Statement);
        stmt.push_token(self.bump()); // case
        stmt.push_token(self.expect(TokenKind::LParen, "`(` after case")?);
        stmt.push_node(self.expression(&[TokenKind::RParen])?);
        stmt.push_token(self.expect(TokenKind::RParen, "`)` after case expression")?);
        while !self.at_kw(Kw::Endcase) && !self.at_eof() {
            if self.at_kw(Kw::Default) {
                stmt.push_token(self.bump());
            } else {
                stmt.push_node(self.expression(&[TokenKind::Colon])?);
            }
            stmt.push_token(self.expect(TokenKind::Colon, "`:` after case item")?);
            stmt.push_node(self.statement()?);
        }
        stmt.push_token(self.expect_kw(Kw::Endcase, "`endcase`")?);
        Ok(stmt)
    }

    fn sequential_block(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut block = SyntaxNode::new(SyntaxKind::SequentialBlock);
        block.push_token(self.expect_kw(Kw::Begin, "`begin`")?);
        if self.at(TokenKind::Colon) {
            block.push_token(self.bump());
            block.push_token(self.expect(TokenKind::Identifier, "block label")?);
        }
        while !self.at_kw(Kw::End) && !self.at_eof() {
            if self.at_data_declaration() {
                block.push_node(self.data_declaration()?);
            } else {
                block.push_node(self.statement()?);
            }
        }
        block.push_token(self.expect_kw(Kw::End, "`end`")?);
        if self.at(TokenKind::Colon) {
            block.push_token(self.bump());
            block.push_token(self.expect(TokenKind::Identifier, "block label")?);
        }
        Ok(block)
    }

    fn at_data_declaration(&self) -> bool {
        match self.peek().kind {
            TokenKind::Keyword(kw) => {
                kw.is_integer_type()
                    || kw.is_net_type()
                    || matches!(kw, Kw::Const | Kw::Static | Kw::Automatic | Kw::Var)
            }
            _ => false,
        }
    }

    fn function_declaration(&mut self) -> Result<SyntaxNode, ParseError> {
        self.routine_declaration(SyntaxKind::FunctionDeclaration, Kw::Function, Kw::Endfunction)
    }

    fn task_declaration(&mut self) -> Result<SyntaxNode, ParseError> {
        self.routine_declaration(SyntaxKind::TaskDeclaration, Kw::Task, Kw::Endtask)
    }

    fn routine_declaration(
        &mut self,
        kind: SyntaxKind,
        open: Kw,
        close: Kw,
    ) -> Result<SyntaxNode, ParseError> {
        let mut routine = SyntaxNode::new(kind);
        routine.push_token(self.expect_kw(open, "routine keyword")?);
        if self.at_kw(Kw::Automatic) || self.at_kw(Kw::Static) {
            routine.push_token(self.bump());
        }
        // Optional return type: only when another identifier follows it.
        let keyword_type = matches!(
            self.peek().kind,
            TokenKind::Keyword(kw) if kw.is_integer_type()
        );
        let named_type = self.at(TokenKind::Identifier)
            && self.nth(1).kind == TokenKind::Identifier;
        if keyword_type || named_type {
            if let Some(data_type) = self.try_data_type() {
                routine.push_node(data_type?);
            }
        }
        routine.push_token(self.expect(TokenKind::Identifier, "routine name")?);
        if self.at(TokenKind::LParen) {
            routine.push_node(self.ansi_port_list()?);
        }
        routine.push_token(self.expect(TokenKind::Semicolon, "`;` after routine header")?);
        while !self.at_kw(close) && !self.at_eof() {
            if self.at_data_declaration() {
                routine.push_node(self.data_declaration()?);
            } else {
                routine.push_node(self.statement()?);
            }
        }
        routine.push_token(self.expect_kw(close, "routine end keyword")?);
        if self.at(TokenKind::Colon) {
            routine.push_token(self.bump());
            routine.push_token(self.expect(TokenKind::Identifier, "routine label")?);
        }
        Ok(routine)
    }

    fn package_declaration(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut package = SyntaxNode::new(SyntaxKind::PackageDeclaration);
        package.push_token(self.bump()); // package
        package.push_token(self.expect(TokenKind::Identifier, "package name")?);
        package.push_token(self.expect(TokenKind::Semicolon, "`;` after package name")?);
        while !self.at_kw(Kw::Endpackage) && !self.at_eof() {
            package.push_node(self.module_item()?);
        }
        package.push_token(self.expect_kw(Kw::Endpackage, "`endpackage`")?);
        Ok(package)
    }

    fn package_import(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut import = SyntaxNode::new(SyntaxKind::PackageImport);
        import.push_token(self.bump()); // import
        while !self.at(TokenKind::Semicolon) && !self.at_eof() {
            import.push_token(self.bump());
        }
        import.push_token(self.expect(TokenKind::Semicolon, "`;` after import")?);
        Ok(import)
    }

    fn typedef_declaration(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut typedef = SyntaxNode::new(SyntaxKind::TypedefDeclaration);
        typedef.push_token(self.bump()); // typedef
        if self.at_kw(Kw::Struct) || self.at_kw(Kw::Enum) {
            // Consume the aggregate body as raw tokens up to the closing
            // brace; the interesting part for the tools is the new name.
            let mut depth = 0usize;
            loop {
                if self.at_eof() {
                    return Err(self.error("unterminated typedef body"));
                }
                let token = self.bump();
                let kind = token.kind;
                typedef.push_token(token);
                match kind {
                    TokenKind::LBrace => depth += 1,
                    TokenKind::RBrace => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        } else if let Some(data_type) = self.try_data_type() {
            typedef.push_node(data_type?);
        }
        typedef.push_token(self.expect(TokenKind::Identifier, "typedef name")?);
        while self.at(TokenKind::LBracket) {
            typedef.push_node(self.range_dimension()?);
        }
        typedef.push_token(self.expect(TokenKind::Semicolon, "`;` after typedef")?);
        Ok(typedef)
    }

    fn macro_usage(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut usage = SyntaxNode::new(SyntaxKind::MacroUsage);
        usage.push_token(self.expect(TokenKind::MacroIdent, "macro name")?);
        if self.at(TokenKind::LParen) {
            usage.push_token(self.bump());
            while !self.at(TokenKind::RParen) && !self.at_eof() {
                if self.at(TokenKind::Comma) {
                    usage.push_token(self.bump());
                } else {
                    usage.push_node(self.expression(&[TokenKind::Comma, TokenKind::RParen])?);
                }
            }
            usage.push_token(self.expect(TokenKind::RParen, "`)` after macro arguments")?);
        }
        Ok(usage)
    }

    /// Consumes through the next `;` (or up to a structural keyword)
    /// into an `Unknown` node. Keeps the parser moving over constructs
    /// outside the subset without eating an enclosing `end`.
    fn unknown_statement(&mut self) -> SyntaxNode {
        let mut unknown = SyntaxNode::new(SyntaxKind::Unknown);
        loop {
            if self.at_eof() {
                break;
            }
            if !unknown.children.is_empty() && is_structural_keyword(self.peek().kind) {
                break;
            }
            let token = self.bump();
            let kind = token.kind;
            unknown.push_token(token);
            if kind == TokenKind::Semicolon {
                break;
            }
        }
        unknown
    }

    // ------------------------------------------------------------------
    // Expressions and names
    // ------------------------------------------------------------------

    /// Flat expression scan: structured name syntaxes become sub-nodes,
    /// everything else stays a token. Stops at `;`, an unbalanced closer,
    /// or any of `stops` at bracket depth zero.
    fn expression(&mut self, stops: &[TokenKind]) -> Result<SyntaxNode, ParseError> {
        let mut expr = SyntaxNode::new(SyntaxKind::Expression);
        loop {
            let kind = self.peek().kind;
            if kind == TokenKind::Eof
                || kind == TokenKind::Semicolon
                || kind == TokenKind::RParen
                || kind == TokenKind::RBracket
                || kind == TokenKind::RBrace
                || stops.contains(&kind)
                || is_structural_keyword(kind)
            {
                return Ok(expr);
            }
            match kind {
                TokenKind::Identifier => expr.push_node(self.name_syntax()?),
                TokenKind::MacroIdent => expr.push_node(self.macro_usage()?),
                TokenKind::LParen => {
                    expr.push_token(self.bump());
                    expr.push_node(self.expression(&[])?);
                    expr.push_token(self.expect(TokenKind::RParen, "`)`")?);
                }
                TokenKind::LBrace => {
                    expr.push_token(self.bump());
                    loop {
                        if self.at(TokenKind::RBrace) || self.at_eof() {
                            break;
                        }
                        if self.at(TokenKind::Comma) {
                            expr.push_token(self.bump());
                        } else {
                            expr.push_node(
                                self.expression(&[TokenKind::Comma, TokenKind::RBrace])?,
                            );
                        }
                    }
                    expr.push_token(self.expect(TokenKind::RBrace, "`}`")?);
                }
                TokenKind::LBracket => {
                    expr.push_node(self.element_select()?);
                }
                _ => expr.push_token(self.bump()),
            }
        }
    }

    /// `ident`, `ident[...]...`, `a.b`, `pkg::sym` and combinations.
    fn name_syntax(&mut self) -> Result<SyntaxNode, ParseError> {
        let name_token = self.expect(TokenKind::Identifier, "identifier")?;
        let mut base = if self.at(TokenKind::LBracket) {
            let mut select = SyntaxNode::new(SyntaxKind::IdentifierSelectName);
            select.push_token(name_token);
            while self.at(TokenKind::LBracket) {
                select.push_node(self.element_select()?);
            }
            select
        } else {
            let mut ident = SyntaxNode::new(SyntaxKind::IdentifierName);
            ident.push_token(name_token);
            ident
        };

        // Scoped continuation: `a.b`, `pkg::sym`. A dot not followed by an
        // identifier belongs to the caller (e.g. `.name(` connections).
        while (self.at(TokenKind::Dot) || self.at(TokenKind::ColonColon))
            && self.nth(1).kind == TokenKind::Identifier
        {
            let mut scoped = SyntaxNode::new(SyntaxKind::ScopedName);
            scoped.push_node(base);
            scoped.push_token(self.bump()); // . or ::
            let right_token = self.expect(TokenKind::Identifier, "identifier")?;
            let right = if self.at(TokenKind::LBracket) {
                let mut select = SyntaxNode::new(SyntaxKind::IdentifierSelectName);
                select.push_token(right_token);
                while self.at(TokenKind::LBracket) {
                    select.push_node(self.element_select()?);
                }
                select
            } else {
                let mut ident = SyntaxNode::new(SyntaxKind::IdentifierName);
                ident.push_token(right_token);
                ident
            };
            scoped.push_node(right);
            base = scoped;
        }
        Ok(base)
    }

    fn element_select(&mut self) -> Result<SyntaxNode, ParseError> {
        let mut select = SyntaxNode::new(SyntaxKind::ElementSelect);
        select.push_token(self.expect(TokenKind::LBracket, "`[`")?);
        select.push_node(self.expression(&[TokenKind::Colon])?);
        if self.at(TokenKind::Colon) {
            select.push_token(self.bump());
            select.push_node(self.expression(&[])?);
        }
        select.push_token(self.expect(TokenKind::RBracket, "`]`")?);
        Ok(select)
    }
}
