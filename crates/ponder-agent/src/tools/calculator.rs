//! Arithmetic calculator tool.
//!
//! Evaluates `+ - * / % ^` over decimal numbers with parentheses and unary
//! signs. `^` (or `**`) binds tighter than unary minus and is
//! right-associative, so `-2^2` is `-4` and `2^3^2` is `512`.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::tool::{CalculateParams, Tool, ToolResult};

/// Error evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("expression nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

/// Nesting limit for parentheses, signs and exponents.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let token = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Num(value));
                continue;
            }
            '+' => Token::Plus,
            '-' | '−' => Token::Minus,
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Caret
            }
            '*' | '×' => Token::Star,
            '/' | '÷' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '(' | '（' => Token::LParen,
            ')' | '）' => Token::RParen,
            other => return Err(CalcError::UnexpectedChar { ch: other, pos: i }),
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> std::result::Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> std::result::Result<f64, CalcError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(op @ (Token::Slash | Token::Percent)) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value = if op == Token::Slash {
                        value / rhs
                    } else {
                        value % rhs
                    };
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> std::result::Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> std::result::Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> std::result::Result<f64, CalcError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> std::result::Result<f64, CalcError> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(self.unexpected()),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(_) => Err(self.unexpected()),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn unexpected(&self) -> CalcError {
        let ch = match self.tokens.get(self.pos.saturating_sub(1)) {
            Some(Token::Plus) => '+',
            Some(Token::Minus) => '-',
            Some(Token::Star) => '*',
            Some(Token::Slash) => '/',
            Some(Token::Percent) => '%',
            Some(Token::Caret) => '^',
            Some(Token::LParen) => '(',
            Some(Token::RParen) => ')',
            Some(Token::Num(_)) | None => '?',
        };
        CalcError::UnexpectedChar {
            ch,
            pos: self.pos.saturating_sub(1),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> std::result::Result<f64, CalcError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(CalcError::UnexpectedEnd);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        parser.pos += 1;
        return Err(parser.unexpected());
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Render a result without a trailing `.0` for whole numbers.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Tool that evaluates arithmetic expressions.
#[derive(Debug, Default, Clone)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses and decimals."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. \"(15 + 3) * 2\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        let params = CalculateParams::try_from(params)?;
        match evaluate(&params.expression) {
            Ok(value) => Ok(ToolResult::text(format!(
                "{} = {}",
                params.expression,
                format_number(value)
            ))),
            Err(e) => Ok(ToolResult::error(format!(
                "could not evaluate '{}': {}",
                params.expression, e
            ))),
        }
    }
}
