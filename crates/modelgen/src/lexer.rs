//! Character stream → token stream.
//!
//! Single-pass, longest-match, at most one byte of lookahead beyond the
//! current character (two for compound operators and comment-form
//! selection). Mirrors `original_source/src/tokenize.c`.

use crate::token::{Literal, Pos, Token, TokenKind};

pub struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    offset: usize,
    pos: Pos,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            offset: 0,
            pos: Pos::START,
        }
    }

    /// Lexes the entire buffer into a token vector, terminated by `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.offset + ahead).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.offset += 1;
        if b == b'\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(b)
    }

    fn next_token(&mut self) -> Token {
        let begin = self.pos;
        let start_offset = self.offset;

        let Some(b) = self.peek() else {
            return Token::new(TokenKind::Eof, begin, begin, (start_offset, start_offset));
        };

        match b {
            b' ' | b'\t' | b'\r' => self.lex_whitespace(begin, start_offset),
            b'\n' => {
                self.advance();
                self.finish(TokenKind::Newline, begin, start_offset)
            }
            b'#' => self.lex_comment(begin, start_offset),
            b'"' => self.lex_string(begin, start_offset),
            b'0'..=b'9' => self.lex_number(begin, start_offset),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(begin, start_offset),
            c if c.is_ascii_alphabetic() || c == b'_' => self.lex_identifier(begin, start_offset),
            _ => self.lex_operator(begin, start_offset),
        }
    }

    fn finish(&self, kind: TokenKind, begin: Pos, start_offset: usize) -> Token {
        Token::new(kind, begin, self.pos, (start_offset, self.offset))
    }

    fn lex_whitespace(&mut self, begin: Pos, start_offset: usize) -> Token {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.advance();
        }
        self.finish(TokenKind::Whitespace, begin, start_offset)
    }

    fn lex_comment(&mut self, begin: Pos, start_offset: usize) -> Token {
        self.advance(); // '#'
        if self.peek() == Some(b'[') {
            self.advance();
            loop {
                match self.peek() {
                    None => break,
                    Some(b'#') if self.peek_at(1) == Some(b']') => {
                        self.advance();
                        self.advance();
                        break;
                    }
                    Some(_) => {
                        self.advance();
                    }
                }
            }
        } else {
            while !matches!(self.peek(), None | Some(b'\n')) {
                self.advance();
            }
        }
        self.finish(TokenKind::Comment, begin, start_offset)
    }

    fn lex_string(&mut self, begin: Pos, start_offset: usize) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return self.finish(TokenKind::Invalid, begin, start_offset);
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.peek() {
                        Some(c) => {
                            self.advance();
                            value.push(match c {
                                b'a' => '\u{07}',
                                b'b' => '\u{08}',
                                b'f' => '\u{0C}',
                                b'n' => '\n',
                                b'r' => '\r',
                                b't' => '\t',
                                b'v' => '\u{0B}',
                                b'\\' => '\\',
                                b'"' => '"',
                                other => {
                                    value.push('\\');
                                    other as char
                                }
                            });
                        }
                        None => return self.finish(TokenKind::Invalid, begin, start_offset),
                    }
                }
                Some(_) => {
                    // Re-decode a full UTF-8 scalar from the remaining bytes.
                    let rest = &self.source[self.offset..];
                    let ch = rest.chars().next().expect("non-empty remainder");
                    for _ in 0..ch.len_utf8() {
                        self.advance();
                    }
                    value.push(ch);
                }
            }
        }
        self.finish(TokenKind::Str, begin, start_offset)
            .with_literal(Literal::Str(value))
    }

    fn lex_number(&mut self, begin: Pos, start_offset: usize) -> Token {
        if self.peek() == Some(b'0') {
            match self.peek_at(1) {
                Some(b'x' | b'X') => return self.lex_radix_int(begin, start_offset, 16),
                Some(b'o' | b'O') => return self.lex_radix_int(begin, start_offset, 8),
                Some(b'b' | b'B') => return self.lex_radix_int(begin, start_offset, 2),
                _ => {}
            }
        }

        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut ahead = 1;
            if matches!(self.peek_at(ahead), Some(b'+' | b'-')) {
                ahead += 1;
            }
            if self.peek_at(ahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.advance(); // e/E
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.advance();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.source[start_offset..self.offset];
        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            self.finish(TokenKind::Float, begin, start_offset)
                .with_literal(Literal::Float(value))
        } else {
            let value: i64 = text.parse().unwrap_or(0);
            self.finish(TokenKind::Int, begin, start_offset)
                .with_literal(Literal::Int(value))
        }
    }

    fn lex_radix_int(&mut self, begin: Pos, start_offset: usize, radix: u32) -> Token {
        self.advance(); // '0'
        self.advance(); // x/o/b
        let digits_start = self.offset;
        while self.peek().is_some_and(|c| (c as char).is_digit(radix)) {
            self.advance();
        }
        let digits = &self.source[digits_start..self.offset];
        let value = i64::from_str_radix(digits, radix).unwrap_or(0);
        self.finish(TokenKind::Int, begin, start_offset)
            .with_literal(Literal::Int(value))
    }

    fn lex_identifier(&mut self, begin: Pos, start_offset: usize) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let text = &self.source[start_offset..self.offset];
        let kind = TokenKind::keyword_from_str(text).unwrap_or(TokenKind::Identifier);
        self.finish(kind, begin, start_offset)
    }

    fn lex_operator(&mut self, begin: Pos, start_offset: usize) -> Token {
        let two = (self.peek(), self.peek_at(1));
        let (kind, len) = match two {
            (Some(b'='), Some(b'=')) => (TokenKind::EqEq, 2),
            (Some(b'!'), Some(b'=')) => (TokenKind::NotEq, 2),
            (Some(b'<'), Some(b'=')) => (TokenKind::LtEq, 2),
            (Some(b'>'), Some(b'=')) => (TokenKind::GtEq, 2),
            (Some(b'+'), Some(b'=')) => (TokenKind::PlusEq, 2),
            (Some(b'-'), Some(b'=')) => (TokenKind::MinusEq, 2),
            (Some(b'*'), Some(b'=')) => (TokenKind::StarEq, 2),
            (Some(b'/'), Some(b'=')) => (TokenKind::SlashEq, 2),
            (Some(b'%'), Some(b'=')) => (TokenKind::PercentEq, 2),
            (Some(b'/'), Some(b'/')) => (TokenKind::SlashSlash, 2),
            (Some(b'('), _) => (TokenKind::LParen, 1),
            (Some(b')'), _) => (TokenKind::RParen, 1),
            (Some(b'['), _) => (TokenKind::LBracket, 1),
            (Some(b']'), _) => (TokenKind::RBracket, 1),
            (Some(b'{'), _) => (TokenKind::LBrace, 1),
            (Some(b'}'), _) => (TokenKind::RBrace, 1),
            (Some(b'.'), _) => (TokenKind::Dot, 1),
            (Some(b','), _) => (TokenKind::Comma, 1),
            (Some(b':'), _) => (TokenKind::Colon, 1),
            (Some(b'+'), _) => (TokenKind::Plus, 1),
            (Some(b'-'), _) => (TokenKind::Minus, 1),
            (Some(b'*'), _) => (TokenKind::Star, 1),
            (Some(b'/'), _) => (TokenKind::Slash, 1),
            (Some(b'%'), _) => (TokenKind::Percent, 1),
            (Some(b'='), _) => (TokenKind::Eq, 1),
            (Some(b'<'), _) => (TokenKind::Lt, 1),
            (Some(b'>'), _) => (TokenKind::Gt, 1),
            _ => (TokenKind::Invalid, 1),
        };
        for _ in 0..len {
            self.advance();
        }
        self.finish(kind, begin, start_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn partitions_the_buffer() {
        let src = "x = 1 + 2\n";
        let tokens = Lexer::new(src).tokenize();
        let mut cursor = 0usize;
        for tok in &tokens {
            if tok.kind == TokenKind::Eof {
                break;
            }
            assert_eq!(tok.span.0, cursor);
            cursor = tok.span.1;
        }
    }

    #[test]
    fn numeric_prefixes() {
        let tokens = Lexer::new("0x1F 0o17 0b101 3.5 2e3 1").tokenize();
        let literals: Vec<_> = tokens.iter().filter_map(|t| t.literal.clone()).collect();
        assert_eq!(
            literals,
            vec![
                Literal::Int(31),
                Literal::Int(15),
                Literal::Int(5),
                Literal::Float(3.5),
                Literal::Float(2000.0),
                Literal::Int(1),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        let tokens = Lexer::new(r#""a\nb\q""#).tokenize();
        assert_eq!(tokens[0].literal, Some(Literal::Str("a\nb\\q".to_string())));
    }

    #[test]
    fn unterminated_string_is_invalid() {
        let tokens = Lexer::new("\"abc").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
    }

    #[test]
    fn keywords_are_retagged() {
        assert_eq!(
            kinds("for x in range(3)"),
            vec![
                TokenKind::For,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::Whitespace,
                TokenKind::In,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Int,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_comment() {
        let tokens = Lexer::new("#[ hi\nthere #]x").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn invalid_byte_consumes_one_and_continues() {
        let tokens = Lexer::new("@x").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }
}
