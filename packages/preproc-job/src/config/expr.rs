//! Arithmetic literals
//!
//! Numeric options may be written as small expressions (`2*1.5`, `(36-1)/2`).
//! Only numbers, `+ - * /`, unary signs and parentheses are accepted.

use std::fmt;
use thiserror::Error;

/// Result of evaluating an arithmetic literal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Integral value, if there is one without loss
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(f as i64),
            Number::Float(_) => None,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("malformed number '{0}'")]
    BadNumber(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected trailing input at offset {0}")]
    Trailing(usize),

    #[error("unbalanced parentheses")]
    Unbalanced,

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        let token = match c {
            ' ' | '\t' => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < bytes.len() {
                    match bytes[i] {
                        b'0'..=b'9' => i += 1,
                        b'.' => {
                            is_float = true;
                            i += 1;
                        }
                        b'e' | b'E' => {
                            is_float = true;
                            i += 1;
                            if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
                let text = &input[start..i];
                let number = if is_float {
                    text.parse::<f64>()
                        .map(Number::Float)
                        .map_err(|_| ExprError::BadNumber(text.to_string()))?
                } else {
                    text.parse::<i64>()
                        .map(Number::Int)
                        .map_err(|_| ExprError::BadNumber(text.to_string()))?
                };
                tokens.push((Token::Num(number), start));
                continue;
            }
            other => {
                // only ASCII has been consumed so far, so `i` is a char boundary
                let ch = input[i..].chars().next().unwrap_or(other);
                return Err(ExprError::UnexpectedChar(ch, i));
            }
        };
        tokens.push((token, i));
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number, ExprError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek() {
            let op = op.clone();
            match op {
                Token::Plus | Token::Minus => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = apply(&op, lhs, rhs)?;
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<Number, ExprError> {
        let mut lhs = self.factor()?;
        while let Some(op) = self.peek() {
            let op = op.clone();
            match op {
                Token::Star | Token::Slash => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    lhs = apply(&op, lhs, rhs)?;
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    // factor := ('+' | '-') factor | number | '(' expr ')'
    fn factor(&mut self) -> Result<Number, ExprError> {
        match self.next() {
            Some(Token::Plus) => self.factor(),
            Some(Token::Minus) => match self.factor()? {
                Number::Int(i) => i.checked_neg().map(Number::Int).ok_or(ExprError::Overflow),
                Number::Float(f) => Ok(Number::Float(-f)),
            },
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) | None => Err(ExprError::Unbalanced),
                }
            }
            Some(Token::RParen) => Err(ExprError::Unbalanced),
            Some(_) | None => Err(ExprError::UnexpectedEnd),
        }
    }
}

fn apply(op: &Token, lhs: Number, rhs: Number) -> Result<Number, ExprError> {
    if let Token::Slash = op {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(ExprError::DivisionByZero);
        }
        return Ok(Number::Float(lhs.as_f64() / divisor));
    }

    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => {
            let result = match op {
                Token::Plus => a.checked_add(b),
                Token::Minus => a.checked_sub(b),
                Token::Star => a.checked_mul(b),
                _ => None,
            };
            result.map(Number::Int).ok_or(ExprError::Overflow)
        }
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            Ok(Number::Float(match op {
                Token::Plus => a + b,
                Token::Minus => a - b,
                _ => a * b,
            }))
        }
    }
}

/// Evaluate an arithmetic literal
pub fn evaluate(input: &str) -> Result<Number, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if let Some((token, offset)) = parser.tokens.get(parser.pos) {
        return Err(match token {
            Token::RParen => ExprError::Unbalanced,
            _ => ExprError::Trailing(*offset),
        });
    }
    Ok(value)
}
