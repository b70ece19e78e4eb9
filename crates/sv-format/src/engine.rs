//! Spacing engine: primitive trivia rewrites.
//!
//! All operations replace a token's leading trivia; the token text is
//! never touched. Rewrites happen inside the formatting pass's cloned
//! tree, which is dropped with the run.

use std::cell::Cell;
use sv_syntax::{SyntaxKind, SyntaxNode, Token, Trivia, TriviaKind};

/// Indentation and alignment primitives.
///
/// The indent level is interior-mutable so [`IndentGuard`] can restore
/// it on drop while the engine is shared immutably by the pass.
pub struct SpacingEngine {
    level: Cell<u32>,
    spaces_per_level: u32,
    use_tabs: bool,
}

impl SpacingEngine {
    pub fn new(spaces_per_level: u32, use_tabs: bool) -> Self {
        Self { level: Cell::new(0), spaces_per_level, use_tabs }
    }

    /// Current indent level.
    pub fn level(&self) -> u32 {
        self.level.get()
    }

    pub fn add_level(&self, to_add: u32) {
        self.level.set(self.level.get() + to_add);
    }

    pub fn sub_level(&self, to_sub: u32) {
        self.level.set(self.level.get().saturating_sub(to_sub));
    }

    fn indent_text(&self, extra_spaces: usize) -> String {
        let mut text = if self.use_tabs {
            "\t".repeat(self.level.get() as usize)
        } else {
            " ".repeat((self.level.get() * self.spaces_per_level) as usize)
        };
        text.push_str(&" ".repeat(extra_spaces));
        text
    }

    /// Replaces all trivia with `spaces` space characters.
    pub fn replace_spacing(&self, token: &mut Token, spaces: usize) {
        token.trivia = if spaces == 0 {
            Vec::new()
        } else {
            vec![Trivia::new(TriviaKind::Whitespace, " ".repeat(spaces))]
        };
    }

    /// Strips all trivia.
    pub fn remove_spacing(&self, token: &mut Token) {
        self.replace_spacing(token, 0);
    }

    /// Puts the token at the start of an indented line.
    ///
    /// Whitespace following each newline is replaced by the canonical
    /// indent plus `extra_spaces`; comments, directives, and blank lines
    /// survive in their original order. A token with no newline trivia
    /// gets a synthetic one, except at the very start of the file.
    pub fn indent(&self, token: &mut Token, extra_spaces: usize) {
        let trivia_len: usize = token.trivia.iter().map(|t| t.text.len()).sum();
        let at_file_start = token.offset as usize == trivia_len && token.expansion.is_none();

        let indent_text = self.indent_text(extra_spaces);
        let mut kept: Vec<Trivia> = Vec::new();
        let mut skip_spacings = at_file_start;
        let mut newline_clean = false;

        for trivia in &token.trivia {
            match trivia.kind {
                TriviaKind::Whitespace => {
                    if !skip_spacings {
                        kept.push(trivia.clone());
                    }
                }
                TriviaKind::EndOfLine => {
                    skip_spacings = true;
                    newline_clean = true;
                    kept.push(trivia.clone());
                    if !indent_text.is_empty() {
                        kept.push(Trivia::new(TriviaKind::Whitespace, indent_text.clone()));
                    }
                }
                _ => {
                    skip_spacings = false;
                    newline_clean = false;
                    kept.push(trivia.clone());
                }
            }
        }

        if !newline_clean {
            if !at_file_start {
                kept.push(Trivia::new(TriviaKind::EndOfLine, "\n"));
            }
            if !indent_text.is_empty() {
                kept.push(Trivia::new(TriviaKind::Whitespace, indent_text));
            }
        }

        token.trivia = kept;
    }

    /// Pads left so `spaces + text` spans `width` columns. With
    /// `allow_zero = false` at least one space is kept even when the
    /// token overflows the requested width.
    pub fn token_align_right(&self, token: &mut Token, width: usize, allow_zero: bool) {
        let len = token.text.len();
        let spacing = if width > len {
            width - len
        } else if allow_zero {
            0
        } else {
            1
        };
        self.replace_spacing(token, spacing);
    }

    /// Right-aligns each `[hi:lo]` (or `[expr]`) dimension against the
    /// pre-measured per-column widths, padding both sides of the colon.
    ///
    /// Returns the residual alignment budget: columns this member does
    /// not occupy, which the caller carries to the next column group.
    pub fn align_dimension(
        &self,
        dims: Vec<&mut SyntaxNode>,
        sizes: &[(usize, usize)],
        first_alignment: usize,
    ) -> usize {
        let mut remaining = 0usize;
        let mut dim_index = 0usize;
        let mut first_element = true;

        if dims.is_empty() {
            // Compensate for the first bracket alignment when there is
            // no bracket at all.
            remaining += first_alignment.saturating_sub(1);
        }

        for dim in dims {
            let Some(&(hi_width, lo_width)) = sizes.get(dim_index) else { break };
            dim_index += 1;

            align_dimension_node(self, dim, hi_width, lo_width, first_element, first_alignment);
            first_element = false;
        }

        // Members missing trailing dimensions compensate with the `[:]`
        // punctuation plus the measured widths.
        if dim_index < sizes.len() {
            let missing = sizes.len() - dim_index;
            let widths: usize = sizes[dim_index..].iter().map(|(h, l)| h + l).sum();
            remaining += 1 + 3 * missing + widths;
        }

        remaining
    }
}

/// One dimension node: `[`, hi expression, optional `:` and lo
/// expression, `]`.
fn align_dimension_node(
    engine: &SpacingEngine,
    dim: &mut SyntaxNode,
    hi_width: usize,
    lo_width: usize,
    first_element: bool,
    first_alignment: usize,
) {
    let has_colon = dim
        .child_tokens()
        .any(|t| t.kind == sv_syntax::TokenKind::Colon);

    // Bracket and colon tokens.
    let mut exprs_done = 0usize;
    for child in &mut dim.children {
        match child {
            sv_syntax::Child::Token(token) => match token.kind {
                sv_syntax::TokenKind::LBracket => {
                    if first_element {
                        engine.token_align_right(token, first_alignment + 1, false);
                    } else {
                        engine.remove_spacing(token);
                    }
                }
                sv_syntax::TokenKind::Colon | sv_syntax::TokenKind::RBracket => {
                    engine.remove_spacing(token);
                }
                _ => {}
            },
            sv_syntax::Child::Node(expr) if expr.kind == SyntaxKind::Expression => {
                let raw_len = expr.raw_text().len();
                if let Some(token) = expr.first_token_mut() {
                    let token_len = token.text.len();
                    let lead = raw_len.saturating_sub(token_len);
                    let width = if has_colon {
                        if exprs_done == 0 {
                            hi_width.saturating_sub(lead)
                        } else {
                            lo_width.saturating_sub(lead)
                        }
                    } else {
                        (1 + hi_width + lo_width).saturating_sub(lead)
                    };
                    engine.token_align_right(token, width, true);
                }
                exprs_done += 1;
            }
            sv_syntax::Child::Node(_) => {}
        }
    }
}

/// Scoped indent increment, undone on drop.
pub struct IndentGuard<'a> {
    engine: &'a SpacingEngine,
    added: u32,
}

impl<'a> IndentGuard<'a> {
    pub fn new(engine: &'a SpacingEngine) -> Self {
        Self::with_levels(engine, 1)
    }

    pub fn with_levels(engine: &'a SpacingEngine, levels: u32) -> Self {
        engine.add_level(levels);
        Self { engine, added: levels }
    }
}

impl Drop for IndentGuard<'_> {
    fn drop(&mut self) {
        self.engine.sub_level(self.added);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_syntax::{FileId, TokenKind};

    fn token(text: &str, offset: u32, trivia: Vec<Trivia>) -> Token {
        Token {
            kind: TokenKind::Identifier,
            text: text.to_string(),
            trivia,
            file: FileId(0),
            offset,
            expansion: None,
        }
    }

    fn trivia_text(token: &Token) -> String {
        token.trivia.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn replace_spacing_rewrites_trivia() {
        let engine = SpacingEngine::new(4, false);
        let mut tok = token("x", 10, vec![Trivia::new(TriviaKind::Whitespace, "   ")]);
        engine.replace_spacing(&mut tok, 2);
        assert_eq!(trivia_text(&tok), "  ");
        engine.remove_spacing(&mut tok);
        assert_eq!(trivia_text(&tok), "");
    }

    #[test]
    fn indent_replaces_line_leading_whitespace() {
        let engine = SpacingEngine::new(4, false);
        engine.add_level(1);
        let mut tok = token(
            "logic",
            12,
            vec![
                Trivia::new(TriviaKind::EndOfLine, "\n"),
                Trivia::new(TriviaKind::Whitespace, "        "),
            ],
        );
        engine.indent(&mut tok, 0);
        assert_eq!(trivia_text(&tok), "\n    ");
    }

    #[test]
    fn indent_preserves_comments_and_blank_lines() {
        let engine = SpacingEngine::new(4, false);
        engine.add_level(1);
        let mut tok = token(
            "logic",
            30,
            vec![
                Trivia::new(TriviaKind::EndOfLine, "\n"),
                Trivia::new(TriviaKind::EndOfLine, "\n"),
                Trivia::new(TriviaKind::Whitespace, "  "),
                Trivia::new(TriviaKind::LineComment, "// keep me"),
                Trivia::new(TriviaKind::EndOfLine, "\n"),
            ],
        );
        engine.indent(&mut tok, 0);
        assert_eq!(trivia_text(&tok), "\n    \n    // keep me\n    ");
    }

    #[test]
    fn indent_adds_newline_when_missing() {
        let engine = SpacingEngine::new(4, false);
        engine.add_level(1);
        let mut tok = token("logic", 9, vec![Trivia::new(TriviaKind::Whitespace, " ")]);
        engine.indent(&mut tok, 0);
        assert_eq!(trivia_text(&tok), " \n    ");
    }

    #[test]
    fn indent_at_file_start_has_no_newline() {
        let engine = SpacingEngine::new(4, false);
        engine.add_level(1);
        // Offset equals trivia length: the token opens the file.
        let mut tok = token("logic", 4, vec![Trivia::new(TriviaKind::Whitespace, "    ")]);
        engine.indent(&mut tok, 0);
        assert_eq!(trivia_text(&tok), "    ");
        let mut fresh = token("logic", 0, vec![]);
        engine.indent(&mut fresh, 0);
        assert_eq!(trivia_text(&fresh), "    ");
    }

    #[test]
    fn align_right_keeps_one_space_unless_allowed() {
        let engine = SpacingEngine::new(4, false);
        let mut tok = token("wide_name", 0, vec![]);
        engine.token_align_right(&mut tok, 4, false);
        assert_eq!(trivia_text(&tok), " ");
        engine.token_align_right(&mut tok, 4, true);
        assert_eq!(trivia_text(&tok), "");
        engine.token_align_right(&mut tok, 12, true);
        assert_eq!(trivia_text(&tok), "   ");
    }

    #[test]
    fn indent_guard_restores_level_on_drop() {
        let engine = SpacingEngine::new(2, false);
        engine.add_level(1);
        {
            let _guard = IndentGuard::new(&engine);
            assert_eq!(engine.level(), 2);
            {
                let _inner = IndentGuard::with_levels(&engine, 2);
                assert_eq!(engine.level(), 4);
            }
            assert_eq!(engine.level(), 2);
        }
        assert_eq!(engine.level(), 1);
    }

    #[test]
    fn tabs_indent_one_per_level() {
        let engine = SpacingEngine::new(4, true);
        engine.add_level(2);
        let mut tok = token("x", 5, vec![Trivia::new(TriviaKind::EndOfLine, "\n")]);
        engine.indent(&mut tok, 1);
        assert_eq!(trivia_text(&tok), "\n\t\t ");
    }
}
