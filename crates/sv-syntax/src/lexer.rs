//! Trivia-preserving lexer with a light preprocessor.
//!
//! Object-like `` `define`` macros are expanded at their usage sites; the
//! spliced tokens remember the usage span so position queries resolve to
//! the original buffer. Function-like and unknown macro usages are kept as
//! [`TokenKind::MacroIdent`] tokens for the parser to wrap in a
//! `MacroUsage` node. All other directives become [`TriviaKind::Directive`]
//! trivia attached to the next token.

use crate::source::FileId;
use crate::token::{ExpansionSite, Kw, Token, TokenKind, Trivia, TriviaKind};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct MacroDef {
    body: String,
    body_offset: u32,
    function_like: bool,
}

/// Directives consumed as trivia (everything except macro usages).
fn is_trivia_directive(name: &str) -> bool {
    matches!(
        name,
        "define"
            | "undef"
            | "include"
            | "timescale"
            | "default_nettype"
            | "ifdef"
            | "ifndef"
            | "elsif"
            | "else"
            | "endif"
            | "pragma"
            | "resetall"
            | "celldefine"
            | "endcelldefine"
    )
}

/// Lexes a whole buffer. The returned stream always ends with an
/// [`TokenKind::Eof`] token carrying any trailing trivia.
pub fn lex(file: FileId, src: &str) -> Vec<Token> {
    let mut defines = HashMap::new();
    lex_with_defines(file, src, 0, &mut defines, true)
}

fn lex_with_defines(
    file: FileId,
    src: &str,
    base_offset: u32,
    defines: &mut HashMap<String, MacroDef>,
    emit_eof: bool,
) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut pos = 0usize;
    let mut tokens = Vec::new();
    let mut pending: Vec<Trivia> = Vec::new();

    while pos < bytes.len() || emit_eof {
        // Trivia run.
        loop {
            let start = pos;
            match collect_one_trivia(src, &mut pos, defines) {
                Some(trivia) => pending.push(trivia),
                None => {
                    debug_assert_eq!(start, pos);
                    break;
                }
            }
        }

        if pos >= bytes.len() {
            if emit_eof {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    trivia: std::mem::take(&mut pending),
                    file,
                    offset: base_offset + pos as u32,
                    expansion: None,
                });
            }
            break;
        }

        if bytes[pos] == b'`' {
            let usage_start = pos;
            pos += 1;
            let name_start = pos;
            while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                pos += 1;
            }
            let name = &src[name_start..pos];
            let usage_len = (pos - usage_start) as u32;

            let expandable = defines
                .get(name)
                .filter(|def| !def.function_like)
                .cloned();
            if let Some(def) = expandable {
                let site = ExpansionSite {
                    offset: base_offset + usage_start as u32,
                    len: usage_len,
                };
                let mut spliced =
                    lex_with_defines(file, &def.body, def.body_offset, defines, false);
                for token in &mut spliced {
                    token.expansion = Some(site);
                }
                if let Some(first) = spliced.first_mut() {
                    let mut trivia = std::mem::take(&mut pending);
                    trivia.append(&mut first.trivia);
                    first.trivia = trivia;
                }
                tracing::trace!(macro_name = name, count = spliced.len(), "expanded macro");
                tokens.extend(spliced);
            } else {
                tokens.push(Token {
                    kind: TokenKind::MacroIdent,
                    text: src[usage_start..pos].to_string(),
                    trivia: std::mem::take(&mut pending),
                    file,
                    offset: base_offset + usage_start as u32,
                    expansion: None,
                });
            }
            continue;
        }

        let start = pos;
        let kind = scan_token(src, &mut pos);
        tokens.push(Token {
            kind,
            text: src[start..pos].to_string(),
            trivia: std::mem::take(&mut pending),
            file,
            offset: base_offset + start as u32,
            expansion: None,
        });
    }

    tokens
}

fn collect_one_trivia(
    src: &str,
    pos: &mut usize,
    defines: &mut HashMap<String, MacroDef>,
) -> Option<Trivia> {
    let bytes = src.as_bytes();
    let start = *pos;
    if start >= bytes.len() {
        return None;
    }
    match bytes[start] {
        b' ' | b'\t' => {
            let mut end = start;
            while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
                end += 1;
            }
            *pos = end;
            Some(Trivia::new(TriviaKind::Whitespace, &src[start..end]))
        }
        b'\n' => {
            *pos = start + 1;
            Some(Trivia::new(TriviaKind::EndOfLine, "\n"))
        }
        b'\r' if bytes.get(start + 1) == Some(&b'\n') => {
            *pos = start + 2;
            Some(Trivia::new(TriviaKind::EndOfLine, "\r\n"))
        }
        b'/' if bytes.get(start + 1) == Some(&b'/') => {
            let mut end = start;
            while end < bytes.len() && bytes[end] != b'\n' {
                end += 1;
            }
            *pos = end;
            Some(Trivia::new(TriviaKind::LineComment, &src[start..end]))
        }
        b'/' if bytes.get(start + 1) == Some(&b'*') => {
            let mut end = start + 2;
            while end + 1 < bytes.len() && !(bytes[end] == b'*' && bytes[end + 1] == b'/') {
                end += 1;
            }
            let end = (end + 2).min(bytes.len());
            *pos = end;
            Some(Trivia::new(TriviaKind::BlockComment, &src[start..end]))
        }
        b'`' => {
            let mut cursor = start + 1;
            let name_start = cursor;
            while cursor < bytes.len() && is_ident_continue(bytes[cursor]) {
                cursor += 1;
            }
            let name = &src[name_start..cursor];
            if !is_trivia_directive(name) {
                return None; // Macro usage: handled as a token.
            }
            // Consume the directive line, honoring backslash continuations.
            let mut end = cursor;
            loop {
                while end < bytes.len() && bytes[end] != b'\n' {
                    end += 1;
                }
                let continued = end > start && bytes[end - 1] == b'\\';
                if continued && end < bytes.len() {
                    end += 1; // keep the newline inside the directive
                } else {
                    break;
                }
            }
            if name == "define" {
                record_define(src, name_start + name.len(), end, defines);
            } else if name == "undef" {
                let arg = src[cursor..end].trim();
                defines.remove(arg);
            }
            *pos = end;
            Some(Trivia::new(TriviaKind::Directive, &src[start..end]))
        }
        _ => None,
    }
}

fn record_define(
    src: &str,
    after_keyword: usize,
    line_end: usize,
    defines: &mut HashMap<String, MacroDef>,
) {
    let bytes = src.as_bytes();
    let mut cursor = after_keyword;
    while cursor < line_end && (bytes[cursor] == b' ' || bytes[cursor] == b'\t') {
        cursor += 1;
    }
    let name_start = cursor;
    while cursor < line_end && is_ident_continue(bytes[cursor]) {
        cursor += 1;
    }
    if cursor == name_start {
        return;
    }
    let name = src[name_start..cursor].to_string();

    // A parenthesis glued to the name makes the macro function-like.
    let function_like = bytes.get(cursor) == Some(&b'(');
    if function_like {
        let mut depth = 0i32;
        while cursor < line_end {
            match bytes[cursor] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        cursor += 1;
                        break;
                    }
                }
                _ => {}
            }
            cursor += 1;
        }
    }

    let body_offset = cursor as u32;
    let body = src[cursor..line_end].replace("\\\n", "\n").replace("\\\r\n", "\n");
    tracing::debug!(macro_name = %name, function_like, "recorded define");
    defines.insert(name, MacroDef { body, body_offset, function_like });
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

fn scan_token(src: &str, pos: &mut usize) -> TokenKind {
    let bytes = src.as_bytes();
    let start = *pos;
    let first = bytes[start];

    if is_ident_start(first) {
        let mut end = start;
        while end < bytes.len() && is_ident_continue(bytes[end]) {
            end += 1;
        }
        *pos = end;
        return match Kw::from_str(&src[start..end]) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier,
        };
    }

    if first == b'$' {
        let mut end = start + 1;
        while end < bytes.len() && is_ident_continue(bytes[end]) {
            end += 1;
        }
        *pos = end;
        return TokenKind::SystemIdentifier;
    }

    if first == b'\\' {
        // Escaped identifier: up to the next whitespace.
        let mut end = start + 1;
        while end < bytes.len() && !bytes[end].is_ascii_whitespace() {
            end += 1;
        }
        *pos = end;
        return TokenKind::Identifier;
    }

    if first.is_ascii_digit() {
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
            end += 1;
        }
        if bytes.get(end) == Some(&b'\'') {
            end = scan_based_tail(bytes, end);
        } else if bytes.get(end) == Some(&b'.')
            && bytes.get(end + 1).is_some_and(|b| b.is_ascii_digit())
        {
            end += 1;
            while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'_') {
                end += 1;
            }
        }
        *pos = end;
        return TokenKind::Number;
    }

    if first == b'\'' {
        let based = scan_based_tail(bytes, start);
        if based > start + 1 {
            *pos = based;
            return TokenKind::Number;
        }
        *pos = start + 1;
        return TokenKind::Operator;
    }

    if first == b'"' {
        let mut end = start + 1;
        while end < bytes.len() {
            match bytes[end] {
                b'\\' => end += 2,
                b'"' => {
                    end += 1;
                    break;
                }
                _ => end += 1,
            }
        }
        *pos = end.min(bytes.len());
        return TokenKind::StringLit;
    }

    // Multi-byte operators, longest first.
    const MULTI: &[&str] = &[
        "<<<=", ">>>=", "===", "!==", "<<<", ">>>", "<<=", ">>=", "<->", "<=", ">=", "==", "!=",
        "&&", "||", "<<", ">>", "**", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "++", "--",
        "->",
    ];
    for op in MULTI {
        if src[start..].starts_with(op) {
            *pos = start + op.len();
            return TokenKind::Operator;
        }
    }
    if src[start..].starts_with("::") {
        *pos = start + 2;
        return TokenKind::ColonColon;
    }

    *pos = start + 1;
    match first {
        b'=' => TokenKind::Assign,
        b'#' => TokenKind::Hash,
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b'[' => TokenKind::LBracket,
        b']' => TokenKind::RBracket,
        b'{' => TokenKind::LBrace,
        b'}' => TokenKind::RBrace,
        b';' => TokenKind::Semicolon,
        b',' => TokenKind::Comma,
        b'.' => TokenKind::Dot,
        b':' => TokenKind::Colon,
        b'@' => TokenKind::At,
        b'?' => TokenKind::Question,
        b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^' | b'~' | b'!' | b'<' | b'>' => {
            TokenKind::Operator
        }
        _ => TokenKind::Unknown,
    }
}

/// Scans the `'sB<digits>` tail of a based literal, returning the end
/// offset (or `start` when the apostrophe does not begin a literal).
fn scan_based_tail(bytes: &[u8], start: usize) -> usize {
    let mut end = start + 1; // consume '
    if bytes.get(end).is_some_and(|b| *b == b's' || *b == b'S') {
        end += 1;
    }
    match bytes.get(end) {
        Some(b) if matches!(b.to_ascii_lowercase(), b'b' | b'o' | b'd' | b'h') => end += 1,
        Some(b) if matches!(b.to_ascii_lowercase(), b'0' | b'1' | b'x' | b'z') => {
            return end + 1; // unsized fill literal like '0
        }
        _ => return start,
    }
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'?')
    {
        end += 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_text(src: &str) -> Vec<Token> {
        lex(FileId(0), src)
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text.as_str())
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = lex_text("module m;");
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Kw::Module));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Semicolon);
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn trivia_attaches_to_following_token() {
        let tokens = lex_text("logic  // note\n  a;");
        let a = &tokens[1];
        assert_eq!(a.text, "a");
        let kinds: Vec<_> = a.trivia.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TriviaKind::Whitespace,
                TriviaKind::LineComment,
                TriviaKind::EndOfLine,
                TriviaKind::Whitespace
            ]
        );
    }

    #[test]
    fn based_literals_are_single_tokens() {
        let tokens = lex_text("8'hFF 4'b10_10 'x 12");
        assert_eq!(texts(&tokens), vec!["8'hFF", "4'b10_10", "'x", "12"]);
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn object_macro_expands_with_usage_site() {
        let tokens = lex_text("`define WIDTH 8\nlogic [`WIDTH-1:0] a;");
        let expanded: Vec<_> = tokens.iter().filter(|t| t.expansion.is_some()).collect();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].text, "8");
        // The usage span covers the whole `WIDTH.
        let site = expanded[0].expansion.unwrap();
        assert_eq!(site.len, "`WIDTH".len() as u32);
        // The define line rides along as directive trivia.
        assert!(tokens[0]
            .trivia
            .iter()
            .any(|t| t.kind == TriviaKind::Directive && t.text.starts_with("`define")));
    }

    #[test]
    fn function_like_macro_stays_a_token() {
        let tokens = lex_text("`define CHECK(x) (x)\n`CHECK(sig)");
        let usage = tokens.iter().find(|t| t.kind == TokenKind::MacroIdent).unwrap();
        assert_eq!(usage.text, "`CHECK");
    }

    #[test]
    fn ifdef_lines_become_directive_trivia() {
        let tokens = lex_text("`ifdef SIM\nlogic dbg;\n`endif\n");
        assert_eq!(texts(&tokens), vec!["logic", "dbg", ";"]);
        let eof = tokens.last().unwrap();
        assert!(eof.trivia.iter().any(|t| t.kind == TriviaKind::Directive));
    }

    #[test]
    fn operators_longest_match() {
        let tokens = lex_text("a <= b === c :: d");
        let ops: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Operator | TokenKind::ColonColon))
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["<=", "===", "::"]);
    }
}
