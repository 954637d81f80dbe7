//! Plural-forms rules.
//!
//! A catalog declares its plural rule in the `Plural-Forms` header, e.g.
//! `nplurals=3; plural=(n%10==1 && n%100!=11 ? 0 : n%10>=2 && n%10<=4 && (n%100<10 || n%100>=20) ? 1 : 2);`.
//! The expression is the C subset gettext uses; it is parsed once into an
//! [`Expr`] tree and evaluated for every plural lookup.

use crate::i18n::error::PluralParseError;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();

/// A compiled plural rule: the number of forms and the selector expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluralRule {
    nplurals: usize,
    expr: Expr,
}

impl PluralRule {
    /// The English rule (`nplurals=2; plural=n != 1;`), used whenever a
    /// catalog has no usable `Plural-Forms` header.
    pub fn english() -> Self {
        Self {
            nplurals: 2,
            expr: Expr::Binary(BinOp::Ne, Box::new(Expr::N), Box::new(Expr::Num(1))),
        }
    }

    /// Compile a bare `plural=` expression.
    pub fn parse(expression: &str, nplurals: usize) -> Result<Self, PluralParseError> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_expression()?;
        if let Some(token) = parser.peek() {
            return Err(PluralParseError::UnexpectedToken(format!("{:?}", token)));
        }
        Ok(Self { nplurals, expr })
    }

    /// Build the rule from a `Plural-Forms` header value.
    ///
    /// Headers that do not match `nplurals=N; plural=EXPR` or whose
    /// expression does not parse fall back to [`PluralRule::english`].
    pub fn from_header(header: &str) -> Self {
        let regex = HEADER_REGEX.get_or_init(|| {
            Regex::new(r"^\s*nplurals\s*=\s*(\d+)\s*;\s*plural\s*=\s*(.+)$").unwrap()
        });

        let Some(captures) = regex.captures(header.trim()) else {
            return Self::english();
        };

        let nplurals = captures[1].parse().unwrap_or(2);
        let expression = captures[2].trim().trim_end_matches(';').trim();

        match Self::parse(expression, nplurals) {
            Ok(rule) => rule,
            Err(e) => {
                warn!("Invalid plural expression '{}': {}", expression, e);
                Self::english()
            }
        }
    }

    /// Number of plural forms declared by the catalog.
    pub fn nplurals(&self) -> usize {
        self.nplurals
    }

    /// Evaluate the rule for `n`. The result is a raw form index; callers
    /// treat anything outside `0..nplurals` as form 0.
    pub fn evaluate(&self, n: u64) -> i64 {
        self.expr.eval(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl Default for PluralRule {
    fn default() -> Self {
        Self::english()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne => 3,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    N,
    Num(i64),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, n: i64) -> i64 {
        match self {
            Expr::N => n,
            Expr::Num(value) => *value,
            Expr::Not(inner) => i64::from(inner.eval(n) == 0),
            Expr::Neg(inner) => inner.eval(n).wrapping_neg(),
            Expr::Ternary(cond, then, otherwise) => {
                if cond.eval(n) != 0 {
                    then.eval(n)
                } else {
                    otherwise.eval(n)
                }
            }
            // Short-circuit like C
            Expr::Binary(BinOp::And, lhs, rhs) => i64::from(lhs.eval(n) != 0 && rhs.eval(n) != 0),
            Expr::Binary(BinOp::Or, lhs, rhs) => i64::from(lhs.eval(n) != 0 || rhs.eval(n) != 0),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(n), rhs.eval(n));
                match op {
                    BinOp::Mul => a.wrapping_mul(b),
                    BinOp::Div => a.checked_div(b).unwrap_or(0),
                    BinOp::Mod => a.checked_rem(b).unwrap_or(0),
                    BinOp::Add => a.wrapping_add(b),
                    BinOp::Sub => a.wrapping_sub(b),
                    BinOp::Lt => i64::from(a < b),
                    BinOp::Le => i64::from(a <= b),
                    BinOp::Gt => i64::from(a > b),
                    BinOp::Ge => i64::from(a >= b),
                    BinOp::Eq => i64::from(a == b),
                    BinOp::Ne => i64::from(a != b),
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Num(i64),
    N,
    Not,
    Op(BinOp),
    Question,
    Colon,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, PluralParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '0'..='9' => {
                let mut value = i64::from(c as u8 - b'0');
                while let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
                    chars.next();
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(i64::from(digit)))
                        .ok_or(PluralParseError::LiteralOverflow)?;
                }
                Token::Num(value)
            }
            'n' => Token::N,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '?' => Token::Question,
            ':' => Token::Colon,
            '*' => Token::Op(BinOp::Mul),
            '/' => Token::Op(BinOp::Div),
            '%' => Token::Op(BinOp::Mod),
            '+' => Token::Op(BinOp::Add),
            '-' => Token::Op(BinOp::Sub),
            '<' if chars.next_if_eq(&'=').is_some() => Token::Op(BinOp::Le),
            '<' => Token::Op(BinOp::Lt),
            '>' if chars.next_if_eq(&'=').is_some() => Token::Op(BinOp::Ge),
            '>' => Token::Op(BinOp::Gt),
            '=' if chars.next_if_eq(&'=').is_some() => Token::Op(BinOp::Eq),
            '!' if chars.next_if_eq(&'=').is_some() => Token::Op(BinOp::Ne),
            '!' => Token::Not,
            '&' if chars.next_if_eq(&'&').is_some() => Token::Op(BinOp::And),
            '|' if chars.next_if_eq(&'|').is_some() => Token::Op(BinOp::Or),
            other => return Err(PluralParseError::UnexpectedChar(other)),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), PluralParseError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(PluralParseError::UnexpectedToken(format!("{:?}", token))),
            None => Err(PluralParseError::UnexpectedEnd),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, PluralParseError> {
        let condition = self.parse_binary(1)?;
        if self.peek() != Some(Token::Question) {
            return Ok(condition);
        }
        self.pos += 1;
        let then = self.parse_expression()?;
        self.expect(Token::Colon)?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Ternary(
            Box::new(condition),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, PluralParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_binary(precedence + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, PluralParseError> {
        match self.next() {
            Some(Token::Num(value)) => Ok(Expr::Num(value)),
            Some(Token::N) => Ok(Expr::N),
            Some(Token::Not) => Ok(Expr::Not(Box::new(self.parse_unary()?))),
            Some(Token::Op(BinOp::Sub)) => Ok(Expr::Neg(Box::new(self.parse_unary()?))),
            Some(Token::LParen) => {
                let inner = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(PluralParseError::UnexpectedToken(format!("{:?}", token))),
            None => Err(PluralParseError::UnexpectedEnd),
        }
    }
}
