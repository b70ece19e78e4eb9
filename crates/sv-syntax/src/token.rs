//! Tokens and trivia.
//!
//! Every token carries its *leading* trivia: the whitespace, newlines,
//! comments, and preprocessor directives that preceded it in the source.
//! Rewriters (the alignment formatter) replace a token's trivia wholesale;
//! the token text itself is never altered after lexing.

use crate::source::FileId;

/// Classification of a trivia piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    /// Spaces and tabs.
    Whitespace,
    /// One line terminator (`\n` or `\r\n`). Consecutive newlines are
    /// separate trivia so block splitting can count them.
    EndOfLine,
    /// `// ...` up to but excluding the newline.
    LineComment,
    /// `/* ... */`, possibly spanning lines.
    BlockComment,
    /// A preprocessor directive line (`` `define``, `` `include``, ...).
    Directive,
}

/// A single piece of trivia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub text: String,
}

impl Trivia {
    pub fn new(kind: TriviaKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

/// Keywords the front end distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Kw {
    Module,
    Endmodule,
    Package,
    Endpackage,
    Interface,
    Endinterface,
    Modport,
    Parameter,
    Localparam,
    Input,
    Output,
    Inout,
    Ref,
    Logic,
    Wire,
    Tri,
    Wand,
    Wor,
    Uwire,
    Supply0,
    Supply1,
    Reg,
    Bit,
    Byte,
    Int,
    Integer,
    Shortint,
    Longint,
    Time,
    Real,
    Signed,
    Unsigned,
    Var,
    Const,
    Static,
    Automatic,
    Assign,
    Begin,
    End,
    Generate,
    Endgenerate,
    Genvar,
    If,
    Else,
    For,
    While,
    Case,
    Endcase,
    Default,
    Function,
    Endfunction,
    Task,
    Endtask,
    Return,
    Typedef,
    Struct,
    Enum,
    Packed,
    Import,
    Always,
    AlwaysComb,
    AlwaysFf,
    AlwaysLatch,
    Initial,
    Final,
    Posedge,
    Negedge,
}

impl Kw {
    /// Maps an identifier to its keyword, if it is one.
    pub fn from_str(text: &str) -> Option<Kw> {
        Some(match text {
            "module" => Kw::Module,
            "endmodule" => Kw::Endmodule,
            "package" => Kw::Package,
            "endpackage" => Kw::Endpackage,
            "interface" => Kw::Interface,
            "endinterface" => Kw::Endinterface,
            "modport" => Kw::Modport,
            "parameter" => Kw::Parameter,
            "localparam" => Kw::Localparam,
            "input" => Kw::Input,
            "output" => Kw::Output,
            "inout" => Kw::Inout,
            "ref" => Kw::Ref,
            "logic" => Kw::Logic,
            "wire" => Kw::Wire,
            "tri" => Kw::Tri,
            "wand" => Kw::Wand,
            "wor" => Kw::Wor,
            "uwire" => Kw::Uwire,
            "supply0" => Kw::Supply0,
            "supply1" => Kw::Supply1,
            "reg" => Kw::Reg,
            "bit" => Kw::Bit,
            "byte" => Kw::Byte,
            "int" => Kw::Int,
            "integer" => Kw::Integer,
            "shortint" => Kw::Shortint,
            "longint" => Kw::Longint,
            "time" => Kw::Time,
            "real" => Kw::Real,
            "signed" => Kw::Signed,
            "unsigned" => Kw::Unsigned,
            "var" => Kw::Var,
            "const" => Kw::Const,
            "static" => Kw::Static,
            "automatic" => Kw::Automatic,
            "assign" => Kw::Assign,
            "begin" => Kw::Begin,
            "end" => Kw::End,
            "generate" => Kw::Generate,
            "endgenerate" => Kw::Endgenerate,
            "genvar" => Kw::Genvar,
            "if" => Kw::If,
            "else" => Kw::Else,
            "for" => Kw::For,
            "while" => Kw::While,
            "case" => Kw::Case,
            "endcase" => Kw::Endcase,
            "default" => Kw::Default,
            "function" => Kw::Function,
            "endfunction" => Kw::Endfunction,
            "task" => Kw::Task,
            "endtask" => Kw::Endtask,
            "return" => Kw::Return,
            "typedef" => Kw::Typedef,
            "struct" => Kw::Struct,
            "enum" => Kw::Enum,
            "packed" => Kw::Packed,
            "import" => Kw::Import,
            "always" => Kw::Always,
            "always_comb" => Kw::AlwaysComb,
            "always_ff" => Kw::AlwaysFf,
            "always_latch" => Kw::AlwaysLatch,
            "initial" => Kw::Initial,
            "final" => Kw::Final,
            "posedge" => Kw::Posedge,
            "negedge" => Kw::Negedge,
            _ => return None,
        })
    }

    /// Integer/vector data type keywords (`logic [7:0]` and friends).
    pub fn is_integer_type(self) -> bool {
        matches!(
            self,
            Kw::Logic
                | Kw::Reg
                | Kw::Bit
                | Kw::Byte
                | Kw::Int
                | Kw::Integer
                | Kw::Shortint
                | Kw::Longint
                | Kw::Time
                | Kw::Real
        )
    }

    /// Net type keywords (`wire`, `tri`, ...).
    pub fn is_net_type(self) -> bool {
        matches!(
            self,
            Kw::Wire | Kw::Tri | Kw::Wand | Kw::Wor | Kw::Uwire | Kw::Supply0 | Kw::Supply1
        )
    }

    /// Port direction keywords.
    pub fn is_direction(self) -> bool {
        matches!(self, Kw::Input | Kw::Output | Kw::Inout | Kw::Ref)
    }

    /// Procedural block introducers.
    pub fn is_procedural(self) -> bool {
        matches!(
            self,
            Kw::Always | Kw::AlwaysComb | Kw::AlwaysFf | Kw::AlwaysLatch | Kw::Initial | Kw::Final
        )
    }
}

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain or escaped identifier.
    Identifier,
    /// `$display` and other system identifiers.
    SystemIdentifier,
    /// Any numeric literal, including based literals (`8'hFF`).
    Number,
    /// A double-quoted string.
    StringLit,
    /// A reserved word.
    Keyword(Kw),
    /// `` `NAME`` usage left unexpanded (function-like or unknown macro).
    MacroIdent,
    Hash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,
    Colon,
    ColonColon,
    At,
    Question,
    /// Bare `=` (assignment / initializer).
    Assign,
    /// Any other operator chunk (`==`, `<=`, `+`, `&&`, ...).
    Operator,
    Unknown,
    /// Synthetic end-of-file marker; carries trailing trivia.
    Eof,
}

/// Where an expanded token came from.
///
/// Tokens spliced out of an object-like macro body keep their spelling
/// offsets (inside the `` `define`` line) and record the span of the
/// `` `NAME`` usage here. Position queries resolve through this record to
/// the usage site, the token's location in the original buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionSite {
    /// Byte offset of the `` `NAME`` usage.
    pub offset: u32,
    /// Byte length of the `` `NAME`` usage.
    pub len: u32,
}

/// A lexed token: classification, text, leading trivia, and provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The token's own text, excluding trivia. Never altered after lexing.
    pub text: String,
    /// Leading trivia, in source order.
    pub trivia: Vec<Trivia>,
    /// File the token was spelled in.
    pub file: FileId,
    /// Byte offset of `text` within the file buffer.
    pub offset: u32,
    /// Present when the token was produced by a macro expansion.
    pub expansion: Option<ExpansionSite>,
}

impl Token {
    /// Byte length of the token text.
    #[inline]
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    /// True for zero-length synthetic tokens.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Counts end-of-line trivia preceding this token.
    pub fn leading_newlines(&self) -> usize {
        self.trivia.iter().filter(|t| t.kind == TriviaKind::EndOfLine).count()
    }

    /// Writes trivia then text into `out` (exact source reproduction).
    pub fn write_to(&self, out: &mut String) {
        for trivia in &self.trivia {
            out.push_str(&trivia.text);
        }
        out.push_str(&self.text);
    }
}
