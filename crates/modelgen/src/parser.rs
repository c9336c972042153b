//! Token stream → [`Ast`], by recursive descent over the fixed
//! operator-precedence table in §4.2.
//!
//! The lexer hands back trivia tokens (whitespace, newline, comment)
//! inline; this module is the only place that decides when a newline is
//! significant. Between top-level expressions, and inside any bracketed
//! list (tuple/list/map literal, call args, index keys), newlines are
//! skipped along with whitespace and comments. Within a single expression
//! — between an operator and its operand — only whitespace and comments
//! are skipped; a newline there ends the expression.

use std::rc::Rc;

use crate::ast::{AssignOp, Ast, BinOp, Expr, IndexKey, Param, ProcDef, Span, UnaryOp};
use crate::error::ParseError;
use crate::token::{Literal, Pos, Token, TokenKind};

pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, tokens: Vec<Token>) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
        }
    }

    pub fn parse_module(mut self) -> PResult<Ast> {
        let begin = self.cur().begin;
        let mut body = Vec::new();

        self.skip_lines();
        while self.cur().kind != TokenKind::Eof {
            body.push(self.parse_expression()?);
            self.skip_lines();
        }
        let end = self.cur().end;

        if self.cur().kind != TokenKind::Eof {
            return Err(self.unexpected("end of input"));
        }

        Ok(Ast {
            body,
            span: Span { begin, end },
        })
    }

    // ---- token-stream plumbing -------------------------------------

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    /// Skip whitespace and comments only; a newline is left in place.
    fn skip_line(&mut self) {
        while matches!(
            self.tokens[self.pos].kind,
            TokenKind::Whitespace | TokenKind::Comment
        ) {
            self.pos += 1;
        }
    }

    /// Skip whitespace, comments, and newlines.
    fn skip_lines(&mut self) {
        while matches!(
            self.tokens[self.pos].kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::Newline
        ) {
            self.pos += 1;
        }
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        self.skip_line();
        self.cur().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<Token> {
        self.eat(kind).ok_or_else(|| self.unexpected(expected))
    }

    fn unexpected(&mut self, expected: &str) -> ParseError {
        self.skip_line();
        ParseError::unexpected(self.cur().begin, self.cur().kind, expected)
    }

    fn text(&self, tok: &Token) -> &'s str {
        tok.text(self.source)
    }

    // ---- expressions, loosest to tightest ---------------------------

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let target = self.parse_or()?;

        self.skip_line();
        let op = match self.cur().kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PercentEq => AssignOp::ModAssign,
            _ => return Ok(target),
        };
        self.advance();
        self.skip_line();
        let value = self.parse_assignment()?;
        let span = Span {
            begin: target.span().begin,
            end: value.span().end,
        };
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
            span,
        })
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        loop {
            self.skip_line();
            if self.cur().kind != TokenKind::Or {
                break;
            }
            self.advance();
            self.skip_line();
            let rhs = self.parse_and()?;
            lhs = bin(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_equality()?;
        loop {
            self.skip_line();
            if self.cur().kind != TokenKind::And {
                break;
            }
            self.advance();
            self.skip_line();
            let rhs = self.parse_equality()?;
            lhs = bin(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            self.skip_line();
            let op = match self.cur().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            self.skip_line();
            let rhs = self.parse_relational()?;
            lhs = bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            self.skip_line();
            let op = match self.cur().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            self.skip_line();
            let rhs = self.parse_additive()?;
            lhs = bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            self.skip_line();
            let op = match self.cur().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.skip_line();
            let rhs = self.parse_multiplicative()?;
            lhs = bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_line();
            let op = match self.cur().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::SlashSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            self.skip_line();
            let rhs = self.parse_unary()?;
            lhs = bin(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        self.skip_line();
        let op = match self.cur().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let begin = self.advance().begin;
        self.skip_line();
        let operand = self.parse_unary()?;
        let span = Span {
            begin,
            end: operand.span().end,
        };
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            self.skip_line();
            match self.cur().kind {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_expression_list(TokenKind::RParen)?;
                    let end = self.expect(TokenKind::RParen, "')'")?.end;
                    let span = Span {
                        begin: expr.span().begin,
                        end,
                    };
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_index_key()?;
                    let end = self.expect(TokenKind::RBracket, "']'")?.end;
                    let span = Span {
                        begin: expr.span().begin,
                        end,
                    };
                    expr = Expr::Index {
                        target: Box::new(expr),
                        key: Box::new(key),
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    self.skip_line();
                    let name_tok = self.expect(TokenKind::Identifier, "an attribute name")?;
                    let name = self.text(&name_tok).to_string();
                    let span = Span {
                        begin: expr.span().begin,
                        end: name_tok.end,
                    };
                    expr = Expr::Attr {
                        target: Box::new(expr),
                        name,
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_index_key(&mut self) -> PResult<IndexKey> {
        self.skip_lines();
        let start = if self.cur().kind == TokenKind::Colon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.skip_lines();
        if self.eat(TokenKind::Colon).is_some() {
            self.skip_lines();
            let stop = if self.cur().kind == TokenKind::RBracket {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.skip_lines();
            return Ok(IndexKey::Slice(start, stop));
        }
        match start {
            Some(e) => Ok(IndexKey::Single(e)),
            None => Err(self.unexpected("an index expression")),
        }
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        self.skip_line();
        let tok = self.cur().clone();
        match tok.kind {
            TokenKind::Int => {
                self.advance();
                let n = match tok.literal {
                    Some(Literal::Int(n)) => n,
                    _ => unreachable!("int token without decoded literal"),
                };
                Ok(Expr::Int(n, Span {
                    begin: tok.begin,
                    end: tok.end,
                }))
            }
            TokenKind::Float => {
                self.advance();
                let f = match tok.literal {
                    Some(Literal::Float(f)) => f,
                    _ => unreachable!("float token without decoded literal"),
                };
                Ok(Expr::Float(f, Span {
                    begin: tok.begin,
                    end: tok.end,
                }))
            }
            TokenKind::Str => {
                self.advance();
                let s = match tok.literal {
                    Some(Literal::Str(s)) => s,
                    _ => unreachable!("string token without decoded literal"),
                };
                Ok(Expr::Str(s, Span {
                    begin: tok.begin,
                    end: tok.end,
                }))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Identifier(
                    self.text(&tok).to_string(),
                    Span {
                        begin: tok.begin,
                        end: tok.end,
                    },
                ))
            }
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Proc => self.parse_proc(),
            TokenKind::Emit => self.parse_emit(),
            TokenKind::Break => {
                self.advance();
                Ok(Expr::Break(Span {
                    begin: tok.begin,
                    end: tok.end,
                }))
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Expr::Continue(Span {
                    begin: tok.begin,
                    end: tok.end,
                }))
            }
            TokenKind::Return => self.parse_return(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// `( expr )` is grouping; `( )` / `(expr,)` / `(a, b, ...)` is a tuple.
    fn parse_paren(&mut self) -> PResult<Expr> {
        let begin = self.advance().begin;
        self.skip_lines();
        if self.cur().kind == TokenKind::RParen {
            let end = self.advance().end;
            return Ok(Expr::Tuple(Vec::new(), Span { begin, end }));
        }

        let first = self.parse_expression()?;
        self.skip_lines();
        if self.eat(TokenKind::Comma).is_some() {
            let mut items = vec![first];
            self.skip_lines();
            while self.cur().kind != TokenKind::RParen {
                items.push(self.parse_expression()?);
                self.skip_lines();
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
                self.skip_lines();
            }
            let end = self.expect(TokenKind::RParen, "')'")?.end;
            Ok(Expr::Tuple(items, Span { begin, end }))
        } else {
            let end = self.expect(TokenKind::RParen, "')'")?.end;
            let _ = end;
            Ok(first)
        }
    }

    fn parse_list(&mut self) -> PResult<Expr> {
        let begin = self.advance().begin;
        let items = self.parse_expression_list(TokenKind::RBracket)?;
        let end = self.expect(TokenKind::RBracket, "']'")?.end;
        Ok(Expr::List(items, Span { begin, end }))
    }

    /// `{ "key": value, ... }`, an insertion-ordered map literal.
    fn parse_map(&mut self) -> PResult<Expr> {
        let begin = self.advance().begin;
        self.skip_lines();
        let mut entries = Vec::new();
        while self.cur().kind != TokenKind::RBrace {
            let key = self.parse_expression()?;
            self.skip_lines();
            self.expect(TokenKind::Colon, "':'")?;
            self.skip_lines();
            let value = self.parse_expression()?;
            entries.push((key, value));
            self.skip_lines();
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
            self.skip_lines();
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.end;
        Ok(Expr::Map(entries, Span { begin, end }))
    }

    /// Comma-separated expressions up to (not consuming) `end`, skipping
    /// newlines freely between items as well as around commas.
    fn parse_expression_list(&mut self, end: TokenKind) -> PResult<Vec<Expr>> {
        self.skip_lines();
        let mut items = Vec::new();
        if self.cur().kind == end {
            return Ok(items);
        }
        items.push(self.parse_expression()?);
        self.skip_lines();
        while self.eat(TokenKind::Comma).is_some() {
            self.skip_lines();
            if self.cur().kind == end {
                break;
            }
            items.push(self.parse_expression()?);
            self.skip_lines();
        }
        Ok(items)
    }

    /// The body following a `:` in a control-flow production: a single
    /// expression, wrapped in a `Block` so the AST shape matches other
    /// newline-separated sequences (no indentation-sensitive grammar is
    /// defined, so a colon body is always exactly one expression wide).
    fn parse_body(&mut self) -> PResult<Expr> {
        self.skip_line();
        let expr = self.parse_expression()?;
        let span = expr.span();
        Ok(Expr::Block(vec![expr], span))
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        let begin = self.advance().begin;
        self.skip_line();
        let cond = self.parse_expression()?;
        self.skip_line();
        self.expect(TokenKind::Colon, "':'")?;
        let then_branch = self.parse_body()?;
        let mut end = then_branch.span().end;

        let save = self.pos;
        self.skip_lines();
        let else_branch = if self.cur().kind == TokenKind::Else {
            self.advance();
            self.skip_line();
            self.expect(TokenKind::Colon, "':'")?;
            let branch = self.parse_body()?;
            end = branch.span().end;
            Some(Box::new(branch))
        } else {
            self.pos = save;
            None
        };

        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
            span: Span { begin, end },
        })
    }

    fn parse_for(&mut self) -> PResult<Expr> {
        let begin = self.advance().begin;
        self.skip_line();
        let var_tok = self.expect(TokenKind::Identifier, "a loop variable")?;
        let var = self.text(&var_tok).to_string();
        self.skip_line();
        self.expect(TokenKind::In, "'in'")?;
        self.skip_line();
        let iter = self.parse_expression()?;
        self.skip_line();
        self.expect(TokenKind::Colon, "':'")?;
        let body = self.parse_body()?;
        let end = body.span().end;

        Ok(Expr::For {
            var,
            iter: Box::new(iter),
            body: Box::new(body),
            span: Span { begin, end },
        })
    }

    fn parse_proc(&mut self) -> PResult<Expr> {
        let begin = self.advance().begin;
        self.skip_line();
        let name_tok = self.expect(TokenKind::Identifier, "a procedure name")?;
        let name = self.text(&name_tok).to_string();
        self.skip_line();
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.parse_params()?;
        let mut end = self.expect(TokenKind::RParen, "')'")?.end;

        let save = self.pos;
        self.skip_line();
        let body = if self.cur().kind == TokenKind::Colon {
            self.advance();
            let b = self.parse_body()?;
            end = b.span().end;
            Some(Box::new(b))
        } else {
            self.pos = save;
            None
        };

        Ok(Expr::Proc(Rc::new(ProcDef {
            name,
            params,
            body,
            span: Span { begin, end },
        })))
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.skip_lines();
        let mut params = Vec::new();
        if self.cur().kind == TokenKind::RParen {
            return Ok(params);
        }
        loop {
            self.skip_lines();
            let name_tok = self.expect(TokenKind::Identifier, "a parameter name")?;
            let name = self.text(&name_tok).to_string();
            self.skip_line();
            let default = if self.eat(TokenKind::Eq).is_some() {
                self.skip_line();
                Some(Box::new(self.parse_expression()?))
            } else {
                None
            };
            params.push(Param { name, default });
            self.skip_lines();
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
            self.skip_lines();
            if self.cur().kind == TokenKind::RParen {
                break;
            }
        }
        Ok(params)
    }

    fn parse_emit(&mut self) -> PResult<Expr> {
        let begin = self.advance().begin;
        self.skip_line();
        let value = self.parse_expression()?;
        let end = value.span().end;
        Ok(Expr::Emit {
            value: Box::new(value),
            span: Span { begin, end },
        })
    }

    fn parse_return(&mut self) -> PResult<Expr> {
        let tok = self.advance();
        let begin = tok.begin;
        let mut end = tok.end;

        let save = self.pos;
        self.skip_line();
        let at_terminator = matches!(
            self.cur().kind,
            TokenKind::Newline | TokenKind::Eof | TokenKind::Else
        );
        let value = if at_terminator {
            self.pos = save;
            None
        } else {
            let expr = self.parse_expression()?;
            end = expr.span().end;
            Some(Box::new(expr))
        };

        Ok(Expr::Return {
            value,
            span: Span { begin, end },
        })
    }
}

fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = Span {
        begin: lhs.span().begin,
        end: rhs.span().end,
    };
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span,
    }
}

/// Parses a complete source buffer into an [`Ast`].
pub fn parse(source: &str) -> PResult<Ast> {
    let tokens = crate::lexer::Lexer::new(source).tokenize();
    Parser::new(source, tokens).parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(src: &str) -> Vec<Expr> {
        parse(src).unwrap().body
    }

    #[test]
    fn precedence_multiplicative_over_additive() {
        let b = body("1 + 2 * 3\n");
        assert_eq!(b.len(), 1);
        match &b[0] {
            Expr::Binary { op: BinOp::Add, lhs, rhs, .. } => {
                assert!(matches!(**lhs, Expr::Int(1, _)));
                match &**rhs {
                    Expr::Binary { op: BinOp::Mul, .. } => {}
                    other => panic!("expected Mul on the rhs, got {other:?}"),
                }
            }
            other => panic!("expected top-level Add, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let b = body("a = b = 1\n");
        match &b[0] {
            Expr::Assign { op: AssignOp::Assign, target, value, .. } => {
                assert!(matches!(**target, Expr::Identifier(ref n, _) if n == "a"));
                match &**value {
                    Expr::Assign { op: AssignOp::Assign, .. } => {}
                    other => panic!("expected nested assignment, got {other:?}"),
                }
            }
            other => panic!("expected top-level Assign, got {other:?}"),
        }
    }

    #[test]
    fn grouping_is_not_a_tuple() {
        let b = body("(1 + 2)\n");
        assert!(matches!(b[0], Expr::Binary { .. }));
    }

    #[test]
    fn trailing_comma_makes_a_one_tuple() {
        let b = body("(1,)\n");
        match &b[0] {
            Expr::Tuple(items, _) => assert_eq!(items.len(), 1),
            other => panic!("expected a one-tuple, got {other:?}"),
        }
    }

    #[test]
    fn list_literal_is_distinct_from_tuple() {
        let b = body("[1, 2, 3]\n");
        match &b[0] {
            Expr::List(items, _) => assert_eq!(items.len(), 3),
            other => panic!("expected a List, got {other:?}"),
        }
    }

    #[test]
    fn call_args_may_span_newlines() {
        let b = body("f(\n  1,\n  2,\n)\n");
        match &b[0] {
            Expr::Call { args, .. } => assert_eq!(args.len(), 2),
            other => panic!("expected a Call, got {other:?}"),
        }
    }

    #[test]
    fn if_else_parses_both_branches() {
        let b = body("if x: 1\nelse: 2\n");
        match &b[0] {
            Expr::If { else_branch: Some(_), .. } => {}
            other => panic!("expected an If with an else branch, got {other:?}"),
        }
    }

    #[test]
    fn bodyless_proc_is_a_declaration() {
        let b = body("proc f(a, b = 1)\n");
        match &b[0] {
            Expr::Proc(def) => {
                assert_eq!(def.name, "f");
                assert_eq!(def.params.len(), 2);
                assert!(def.body.is_none());
            }
            other => panic!("expected a Proc declaration, got {other:?}"),
        }
    }

    #[test]
    fn attribute_and_index_chain_postfix() {
        let b = body("a.b[0](1)\n");
        assert!(matches!(b[0], Expr::Call { .. }));
    }

    #[test]
    fn slice_index_allows_open_bounds() {
        let b = body("xs[1:]\n");
        match &b[0] {
            Expr::Index { key, .. } => {
                assert!(matches!(**key, IndexKey::Slice(Some(_), None)));
            }
            other => panic!("expected an Index, got {other:?}"),
        }
    }

    #[test]
    fn two_statements_separated_by_newline() {
        let b = body("a = 1\nb = 2\n");
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn map_literal_collects_key_value_pairs() {
        let b = body("{\"a\": 1, \"b\": 2}\n");
        match &b[0] {
            Expr::Map(entries, _) => assert_eq!(entries.len(), 2),
            other => panic!("expected a Map, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_token_is_a_parse_error() {
        assert!(parse("1 +\n").is_err());
    }
}
