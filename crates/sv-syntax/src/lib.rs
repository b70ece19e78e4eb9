//! SystemVerilog front end for the diplomat tools.
//!
//! A trivia-preserving lexer and recursive-descent parser producing a
//! concrete syntax tree, plus the source manager that turns byte offsets
//! into canonical file/line/column locations and resolves macro-expanded
//! tokens back to their original buffers.
//!
//! # Pipeline
//!
//! ```text
//! text -> lex (tokens + trivia, `define expansion) -> parse (CST)
//!                      SourceManager: offsets -> SourceLocation
//! ```
//!
//! The CST reproduces the input byte-for-byte via
//! [`SyntaxNode::source_text`]; rewriters only ever touch trivia.

pub mod lexer;
pub mod node;
pub mod parser;
pub mod print;
pub mod source;
pub mod token;

pub use node::{Child, SyntaxKind, SyntaxNode};
pub use parser::ParseError;
pub use source::{FileId, SourceManager};
pub use token::{ExpansionSite, Kw, Token, TokenKind, Trivia, TriviaKind};

use std::path::Path;

/// Lexes and parses an already-registered buffer.
pub fn parse(sm: &SourceManager, file: FileId) -> Result<SyntaxNode, ParseError> {
    let tokens = lexer::lex(file, sm.text(file));
    parser::parse_tokens(file, tokens)
}

/// Registers `text` under `path` and parses it.
pub fn parse_text(
    sm: &mut SourceManager,
    path: &Path,
    text: String,
) -> (FileId, Result<SyntaxNode, ParseError>) {
    let file = sm.add_file(path, text);
    let parsed = parse(sm, file);
    (file, parsed)
}

/// Loads `path` from disk and parses it.
pub fn parse_file(
    sm: &mut SourceManager,
    path: &Path,
) -> std::io::Result<(FileId, Result<SyntaxNode, ParseError>)> {
    let file = sm.load_file(path)?;
    let parsed = parse(sm, file);
    Ok((file, parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str) -> SyntaxNode {
        let mut sm = SourceManager::new();
        let (_, parsed) = parse_text(&mut sm, Path::new("/test/unit.sv"), text.to_string());
        parsed.unwrap()
    }

    #[test]
    fn round_trips_source_exactly() {
        let text = "module m #(parameter W=8) (input logic [W-1:0] a);\n  logic [W-1:0] b;\n  assign b = a;\nendmodule\n";
        let unit = parse_str(text);
        assert_eq!(unit.source_text(), text);
    }

    #[test]
    fn module_structure() {
        let unit = parse_str("module m;\n  logic x;\nendmodule\n");
        let module = unit.find_node(SyntaxKind::ModuleDeclaration).unwrap();
        let header = module.find_node(SyntaxKind::ModuleHeader).unwrap();
        assert_eq!(header.child_tokens().nth(1).unwrap().text, "m");
        assert!(module.find_node(SyntaxKind::DataDeclaration).is_some());
    }

    #[test]
    fn instantiation_with_connections() {
        let text = "module top;\n  sub #(.W(4)) u_sub (.a(x), .b(y));\nendmodule\n";
        let unit = parse_str(text);
        let module = unit.find_node(SyntaxKind::ModuleDeclaration).unwrap();
        let inst = module.find_node(SyntaxKind::HierarchyInstantiation).unwrap();
        assert_eq!(inst.child_tokens().next().unwrap().text, "sub");
        let params = inst.find_node(SyntaxKind::ParameterValueAssignment).unwrap();
        assert!(params.find_node(SyntaxKind::NamedParamAssignment).is_some());
        let hier = inst.find_node(SyntaxKind::HierarchicalInstance).unwrap();
        assert_eq!(hier.child_nodes().filter(|n| n.kind == SyntaxKind::NamedPortConnection).count(), 2);
        assert_eq!(unit.source_text(), text);
    }

    #[test]
    fn generate_loop_with_label() {
        let text = "module g;\n  genvar i;\n  generate\n    for (genvar i = 0; i < 4; i++) begin : gen_row\n      logic r;\n    end\n  endgenerate\nendmodule\n";
        let unit = parse_str(text);
        assert_eq!(unit.source_text(), text);
        let module = unit.find_node(SyntaxKind::ModuleDeclaration).unwrap();
        let region = module.find_node(SyntaxKind::GenerateRegion).unwrap();
        let looped = region.find_node(SyntaxKind::LoopGenerate).unwrap();
        let block = looped.find_node(SyntaxKind::GenerateBlock).unwrap();
        let label = block
            .child_tokens()
            .find(|t| t.kind == TokenKind::Identifier)
            .unwrap();
        assert_eq!(label.text, "gen_row");
    }

    #[test]
    fn unknown_constructs_pass_through() {
        let text = "module u;\n  defparam u0.p = 1;\nendmodule\n";
        let unit = parse_str(text);
        assert_eq!(unit.source_text(), text);
        let module = unit.find_node(SyntaxKind::ModuleDeclaration).unwrap();
        assert!(module.find_node(SyntaxKind::Unknown).is_some());
    }

    #[test]
    fn interface_port_header() {
        let text = "module m (bus_if.slave bus);\nendmodule\n";
        let unit = parse_str(text);
        let module = unit.find_node(SyntaxKind::ModuleDeclaration).unwrap();
        let header = module.find_node(SyntaxKind::ModuleHeader).unwrap();
        let ports = header.find_node(SyntaxKind::AnsiPortList).unwrap();
        let port = ports.find_node(SyntaxKind::ImplicitAnsiPort).unwrap();
        assert!(port.find_node(SyntaxKind::InterfacePortHeader).is_some());
    }

    #[test]
    fn expanded_macro_range_points_at_usage() {
        let mut sm = SourceManager::new();
        let text = "`define W 8\nmodule m;\n  logic [`W-1:0] v;\nendmodule\n";
        let (_, parsed) = parse_text(&mut sm, Path::new("/test/macro.sv"), text.to_string());
        let unit = parsed.unwrap();
        let tokens = unit.tokens();
        let expanded = tokens.iter().find(|t| t.expansion.is_some()).unwrap();
        let range = sm.token_range(expanded);
        // `W usage sits on line 3.
        assert_eq!(range.start.line, 3);
        assert_eq!(range.end.line, 3);
    }
}
