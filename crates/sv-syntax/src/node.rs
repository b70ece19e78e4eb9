//! The concrete syntax tree.
//!
//! Nodes are a tagged variant over [`SyntaxKind`] with an ordered child
//! list mixing sub-nodes and tokens. Consumers dispatch centrally on the
//! kind and pattern-match the children they understand; unknown kinds are
//! passed through untouched.

use crate::token::{Token, TriviaKind};

/// Node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SyntaxKind {
    CompilationUnit,
    ModuleDeclaration,
    ModuleHeader,
    ParameterPortList,
    ParameterDeclaration,
    AnsiPortList,
    ImplicitAnsiPort,
    VariablePortHeader,
    InterfacePortHeader,
    DataDeclaration,
    IntegerType,
    NamedType,
    RangeDimension,
    Declarator,
    EqualsInitializer,
    ContinuousAssign,
    HierarchyInstantiation,
    ParameterValueAssignment,
    NamedParamAssignment,
    OrderedParamAssignment,
    HierarchicalInstance,
    NamedPortConnection,
    OrderedPortConnection,
    IdentifierName,
    ScopedName,
    IdentifierSelectName,
    ElementSelect,
    Expression,
    GenerateRegion,
    LoopGenerate,
    ConditionalGenerate,
    GenerateBlock,
    GenvarDeclaration,
    ProceduralBlock,
    SequentialBlock,
    Statement,
    FunctionDeclaration,
    TaskDeclaration,
    PackageDeclaration,
    PackageImport,
    TypedefDeclaration,
    MacroUsage,
    Unknown,
}

/// One slot of a node's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Node(SyntaxNode),
    Token(Token),
}

impl Child {
    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            Child::Node(node) => Some(node),
            Child::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Child::Token(token) => Some(token),
            Child::Node(_) => None,
        }
    }
}

/// A CST node: kind plus ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub children: Vec<Child>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind) -> Self {
        Self { kind, children: Vec::new() }
    }

    pub fn push_token(&mut self, token: Token) {
        self.children.push(Child::Token(token));
    }

    pub fn push_node(&mut self, node: SyntaxNode) {
        self.children.push(Child::Node(node));
    }

    /// Child nodes only.
    pub fn child_nodes(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter_map(Child::as_node)
    }

    /// Direct child tokens only.
    pub fn child_tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(Child::as_token)
    }

    /// First token in document order, descending into sub-nodes.
    pub fn first_token(&self) -> Option<&Token> {
        for child in &self.children {
            match child {
                Child::Token(token) => return Some(token),
                Child::Node(node) => {
                    if let Some(token) = node.first_token() {
                        return Some(token);
                    }
                }
            }
        }
        None
    }

    /// Mutable access to the first token in document order.
    pub fn first_token_mut(&mut self) -> Option<&mut Token> {
        for child in &mut self.children {
            match child {
                Child::Token(token) => return Some(token),
                Child::Node(node) => {
                    if let Some(token) = node.first_token_mut() {
                        return Some(token);
                    }
                }
            }
        }
        None
    }

    /// Last token in document order.
    pub fn last_token(&self) -> Option<&Token> {
        for child in self.children.iter().rev() {
            match child {
                Child::Token(token) => return Some(token),
                Child::Node(node) => {
                    if let Some(token) = node.last_token() {
                        return Some(token);
                    }
                }
            }
        }
        None
    }

    /// All tokens of the subtree in document order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        for child in &self.children {
            match child {
                Child::Token(token) => out.push(token),
                Child::Node(node) => node.collect_tokens(out),
            }
        }
    }

    /// Token text of the subtree with whitespace collapsed: wherever a
    /// token carried any whitespace trivia a single space is emitted.
    /// Used for measuring expressions during alignment.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        for token in self.tokens() {
            if token.trivia.iter().any(|t| {
                matches!(t.kind, TriviaKind::Whitespace | TriviaKind::EndOfLine)
            }) && !out.is_empty()
            {
                out.push(' ');
            }
            out.push_str(&token.text);
        }
        out
    }

    /// Reconstructs the exact source text of the subtree (trivia + text).
    pub fn write_source(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Child::Token(token) => token.write_to(out),
                Child::Node(node) => node.write_source(out),
            }
        }
    }

    /// The exact source text of the subtree.
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    /// First direct child node of the given kind.
    pub fn find_node(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.child_nodes().find(|n| n.kind == kind)
    }

    /// First direct child token satisfying `pred`.
    pub fn find_token(&self, pred: impl Fn(&Token) -> bool) -> Option<&Token> {
        self.child_tokens().find(|t| pred(t))
    }
}
