//! Debug rendering of the CST as an indented tree.

use crate::node::{Child, SyntaxNode};
use crate::token::TriviaKind;
use std::fmt::Write as _;

/// Renders the tree of node kinds, tokens, and trivia, one element per
/// line. Used by `ast-print` and the formatter's `--debug` flag.
pub fn render_tree(node: &SyntaxNode) -> String {
    let mut out = String::new();
    render_node(node, 0, &mut out);
    out
}

fn lead(out: &mut String, level: usize, marker: &str) {
    for _ in 0..level {
        out.push_str("| ");
    }
    out.push_str(marker);
}

fn render_node(node: &SyntaxNode, level: usize, out: &mut String) {
    lead(out, level, "> ");
    let _ = writeln!(out, "{:?}", node.kind);
    for child in &node.children {
        match child {
            Child::Node(sub) => render_node(sub, level + 1, out),
            Child::Token(token) => {
                for trivia in &token.trivia {
                    lead(out, level + 1, "~ ");
                    match trivia.kind {
                        TriviaKind::LineComment | TriviaKind::BlockComment | TriviaKind::Directive => {
                            let _ = writeln!(out, "{:?} {:?}", trivia.kind, trivia.text);
                        }
                        _ => {
                            let _ = writeln!(out, "{:?}", trivia.kind);
                        }
                    }
                }
                if !token.is_empty() {
                    lead(out, level + 1, "- ");
                    let _ = writeln!(out, "{:?} {:?}", token.kind, token.text);
                }
            }
        }
    }
}
