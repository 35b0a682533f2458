//! Recursive-descent parser for the textual expression form.
//!
//! ```text
//! expr    := or
//! or      := and (("or" | "||") and)*
//! and     := unary (("and" | "&&") unary)*
//! unary   := ("not" | "!") unary | primary
//! primary := "(" expr ")" | "permitAll" ["()"] | "denyAll" ["()"] | call
//! call    := hasRole(str) | hasAnyRole(str, ..) | hasAuthority(str)
//!          | hasAnyAuthority(str, ..) | isOwner(str | #ref)
//! ```
//!
//! Keywords and function names are case-insensitive. Strings use single or
//! double quotes with backslash escapes.
//!
//! Input that would nest deeper than [`MAX_DEPTH`] is rejected before the
//! parser recurses into it.

use std::str::FromStr;

use thiserror::Error;

use super::{AuthorityExpression, MAX_DEPTH, OwnerRef, has_authority, has_role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid authority expression at offset {offset}: {message}")]
pub struct ExpressionError {
    pub offset: usize,
    pub message: String,
}

impl ExpressionError {
    fn at(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    fn too_deep(offset: usize) -> Self {
        Self::at(offset, format!("expression nested deeper than {MAX_DEPTH} levels"))
    }
}

/// A parsed subtree and its depth.
type Node = (AuthorityExpression, usize);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Str(String),
    Ref(String),
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
}

fn lex(input: &str) -> Result<Vec<(usize, Tok)>, ExpressionError> {
    let mut out = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                out.push((pos, Tok::LParen));
            }
            ')' => {
                chars.next();
                out.push((pos, Tok::RParen));
            }
            ',' => {
                chars.next();
                out.push((pos, Tok::Comma));
            }
            '!' => {
                chars.next();
                out.push((pos, Tok::Not));
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, n)) if n == c => {
                        out.push((pos, if c == '&' { Tok::And } else { Tok::Or }));
                    }
                    _ => return Err(ExpressionError::at(pos, format!("expected '{c}{c}'"))),
                }
            }
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(ExpressionError::at(pos, "unterminated string"));
                }
                out.push((pos, Tok::Str(value)));
            }
            '#' => {
                chars.next();
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || matches!(ch, '_' | '.' | '-') {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(ExpressionError::at(pos, "empty resource reference"));
                }
                out.push((pos, Tok::Ref(name)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let tok = match word.to_ascii_lowercase().as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    _ => Tok::Ident(word),
                };
                out.push((pos, tok));
            }
            other => {
                return Err(ExpressionError::at(pos, format!("unexpected character {other:?}")));
            }
        }
    }

    Ok(out)
}

struct Parser {
    toks: Vec<(usize, Tok)>,
    pos: usize,
    end: usize,
    /// Open `not`s and parentheses around the current position.
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.toks.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).map(|(_, t)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Tok, what: &str) -> Result<(), ExpressionError> {
        let offset = self.offset();
        match self.bump() {
            Some(ref t) if t == want => Ok(()),
            _ => Err(ExpressionError::at(offset, format!("expected {what}"))),
        }
    }

    fn descend(&mut self, offset: usize) -> Result<(), ExpressionError> {
        if self.nesting >= MAX_DEPTH {
            return Err(ExpressionError::too_deep(offset));
        }
        self.nesting += 1;
        Ok(())
    }

    fn or(&mut self) -> Result<Node, ExpressionError> {
        let (mut lhs, mut depth) = self.and()?;
        while self.peek() == Some(&Tok::Or) {
            let offset = self.offset();
            self.pos += 1;
            let (rhs, rhs_depth) = self.and()?;
            depth = joined_depth(offset, depth, rhs_depth)?;
            lhs = lhs.or(rhs);
        }
        Ok((lhs, depth))
    }

    fn and(&mut self) -> Result<Node, ExpressionError> {
        let (mut lhs, mut depth) = self.unary()?;
        while self.peek() == Some(&Tok::And) {
            let offset = self.offset();
            self.pos += 1;
            let (rhs, rhs_depth) = self.unary()?;
            depth = joined_depth(offset, depth, rhs_depth)?;
            lhs = lhs.and(rhs);
        }
        Ok((lhs, depth))
    }

    fn unary(&mut self) -> Result<Node, ExpressionError> {
        if self.peek() != Some(&Tok::Not) {
            return self.primary();
        }
        let offset = self.offset();
        self.pos += 1;
        self.descend(offset)?;
        let (inner, depth) = self.unary()?;
        self.nesting -= 1;
        if depth >= MAX_DEPTH {
            return Err(ExpressionError::too_deep(offset));
        }
        Ok((inner.negate(), depth + 1))
    }

    fn primary(&mut self) -> Result<Node, ExpressionError> {
        let offset = self.offset();
        match self.bump() {
            Some(Tok::LParen) => {
                self.descend(offset)?;
                let inner = self.or()?;
                self.nesting -= 1;
                self.expect(&Tok::RParen, "')'")?;
                Ok(inner)
            }
            Some(Tok::Ident(name)) => self.call(offset, &name),
            Some(_) => Err(ExpressionError::at(offset, "expected a predicate or '('")),
            None => Err(ExpressionError::at(offset, "unexpected end of expression")),
        }
    }

    fn call(&mut self, offset: usize, name: &str) -> Result<Node, ExpressionError> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "permitall" | "denyall" => {
                if self.peek() == Some(&Tok::LParen) {
                    self.pos += 1;
                    self.expect(&Tok::RParen, "')'")?;
                }
                let expr = if lower == "permitall" {
                    AuthorityExpression::PermitAll
                } else {
                    AuthorityExpression::DenyAll
                };
                Ok((expr, 1))
            }
            "hasrole" | "hasauthority" | "hasanyrole" | "hasanyauthority" => {
                let single = matches!(lower.as_str(), "hasrole" | "hasauthority");
                let args = self.string_args(single)?;
                let build: fn(String) -> AuthorityExpression = if lower.ends_with("role") {
                    has_role
                } else {
                    has_authority
                };
                let (expr, depth) = any_of(args.into_iter().map(build).collect())
                    .ok_or_else(|| ExpressionError::at(offset, "expected at least one argument"))?;
                if depth > MAX_DEPTH {
                    return Err(ExpressionError::too_deep(offset));
                }
                Ok((expr, depth))
            }
            "isowner" => {
                self.expect(&Tok::LParen, "'('")?;
                let arg_offset = self.offset();
                let owner = match self.bump() {
                    Some(Tok::Str(s)) => OwnerRef::Literal(s),
                    Some(Tok::Ref(r)) => OwnerRef::Resource(r),
                    _ => {
                        return Err(ExpressionError::at(
                            arg_offset,
                            "isOwner expects a quoted owner id or #resource reference",
                        ));
                    }
                };
                self.expect(&Tok::RParen, "')'")?;
                Ok((AuthorityExpression::IsOwner(owner), 1))
            }
            _ => Err(ExpressionError::at(offset, format!("unknown predicate '{name}'"))),
        }
    }

    fn string_args(&mut self, single: bool) -> Result<Vec<String>, ExpressionError> {
        self.expect(&Tok::LParen, "'('")?;
        let mut args = Vec::new();
        loop {
            let offset = self.offset();
            match self.bump() {
                Some(Tok::Str(s)) => args.push(s),
                _ => return Err(ExpressionError::at(offset, "expected a quoted string")),
            }
            if single || self.peek() != Some(&Tok::Comma) {
                break;
            }
            self.pos += 1;
        }
        self.expect(&Tok::RParen, "')'")?;
        Ok(args)
    }
}

fn joined_depth(offset: usize, lhs: usize, rhs: usize) -> Result<usize, ExpressionError> {
    let depth = lhs.max(rhs) + 1;
    if depth > MAX_DEPTH {
        return Err(ExpressionError::too_deep(offset));
    }
    Ok(depth)
}

/// Balanced `or` over the list, so long `hasAny*` lists stay shallow. Up to
/// three operands this is the same left-leaning chain `a or b or c` parses to.
fn any_of(mut items: Vec<AuthorityExpression>) -> Option<Node> {
    if items.len() <= 1 {
        return items.pop().map(|only| (only, 1));
    }
    let right = items.split_off(items.len().div_ceil(2));
    let (lhs, lhs_depth) = any_of(items)?;
    let (rhs, rhs_depth) = any_of(right)?;
    Some((lhs.or(rhs), lhs_depth.max(rhs_depth) + 1))
}

impl FromStr for AuthorityExpression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            toks: lex(s)?,
            pos: 0,
            end: s.len(),
            nesting: 0,
        };
        let (expr, _) = parser.or()?;
        if parser.pos != parser.toks.len() {
            return Err(ExpressionError::at(parser.offset(), "unexpected trailing input"));
        }
        Ok(expr)
    }
}
