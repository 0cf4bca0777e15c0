//! `calculate`: arithmetic for recipe scaling and unit conversions.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::tools::{CallContext, FunctionResult, Tool};

#[derive(Debug, Error, PartialEq)]
pub enum MathError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected '{0}'")]
    UnexpectedToken(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("the expression is nested too deeply")]
    TooDeep,

    #[error("the expression is too long")]
    TooLong,
}

/// Longest expression accepted, in characters.
pub const MAX_EXPRESSION_LEN: usize = 256;

/// Deepest recursion of the parser; each parenthesis costs two levels.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
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

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "{}", n),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Caret => write!(f, "^"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, MathError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut text = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = text.parse().map_err(|_| MathError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Num(n));
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' | 'x' | '×' => {
                chars.next();
                // `**` is accepted as power
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::Caret);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' | '÷' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            other => return Err(MathError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn descend(&mut self) -> Result<(), MathError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(MathError::TooDeep);
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, MathError> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.next();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.next();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64, MathError> {
        let mut value = self.unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.next();
                    value *= self.unary()?;
                }
                Token::Slash | Token::Percent => {
                    let is_div = *op == Token::Slash;
                    self.next();
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err(MathError::DivisionByZero);
                    }
                    value = if is_div { value / rhs } else { value % rhs };
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> Result<f64, MathError> {
        self.descend()?;
        let value = match self.peek() {
            Some(Token::Minus) => {
                self.next();
                self.unary().map(|v| -v)
            }
            Some(Token::Plus) => {
                self.next();
                self.unary()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        value
    }

    // power := primary ('^' unary)?
    fn power(&mut self) -> Result<f64, MathError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.next();
            let exp = self.unary()?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, MathError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(MathError::UnexpectedToken(other.to_string())),
                    None => Err(MathError::UnexpectedEnd),
                }
            }
            Some(other) => Err(MathError::UnexpectedToken(other.to_string())),
            None => Err(MathError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, MathError> {
    if expression.chars().count() > MAX_EXPRESSION_LEN {
        return Err(MathError::TooLong);
    }
    let mut parser = Parser {
        tokens: tokenize(expression)?,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(MathError::UnexpectedToken(extra.to_string()));
    }
    if !value.is_finite() {
        return Err(MathError::NotFinite);
    }
    Ok(value)
}

/// Round to `precision` decimals and drop trailing zeros.
pub fn format_number(value: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, value);
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

/// The `calculate` tool.
pub struct Calculate {
    pub precision: usize,
}

#[async_trait]
impl Tool for Calculate {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Perform a mathematical calculation, such as scaling a recipe or converting measurements"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression using + - * / % ^ and parentheses, e.g. '2.5 * 4'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value, _call: &CallContext) -> anyhow::Result<FunctionResult> {
        let expression = args["expression"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'expression' argument"))?;

        let response = match evaluate(expression) {
            Ok(value) => format!(
                "The result of {} is {}.",
                expression.trim(),
                format_number(value, self.precision)
            ),
            Err(e) => {
                tracing::debug!("Calculation of {:?} failed: {}", expression, e);
                format!("I couldn't calculate that: {}.", e)
            }
        };
        Ok(FunctionResult::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("2 ** -1").unwrap(), 0.5);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("17 % 5").unwrap(), 2.0);
        assert_eq!(evaluate("3 x 1.5").unwrap(), 4.5);
    }

    #[test]
    fn errors_are_reported() {
        assert_eq!(evaluate("1 / 0").unwrap_err(), MathError::DivisionByZero);
        assert_eq!(evaluate("2 +").unwrap_err(), MathError::UnexpectedEnd);
        assert_eq!(evaluate("2 $ 3").unwrap_err(), MathError::UnexpectedChar('$'));
        assert_eq!(evaluate("(1 + 2").unwrap_err(), MathError::UnexpectedEnd);
        assert_eq!(evaluate("1 2").unwrap_err(), MathError::UnexpectedToken("2".into()));
    }

    #[test]
    fn nesting_and_length_are_bounded() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(evaluate(&nested(20)).unwrap(), 1.0);
        assert_eq!(evaluate(&nested(70)).unwrap_err(), MathError::TooDeep);
        assert_eq!(evaluate(&format!("{}1", "-".repeat(200))).unwrap_err(), MathError::TooDeep);
        assert_eq!(evaluate(&nested(100_000)).unwrap_err(), MathError::TooLong);
    }

    #[test]
    fn numbers_are_rounded_for_speech() {
        assert_eq!(format_number(2.0 / 3.0, 2), "0.67");
        assert_eq!(format_number(4.0, 2), "4");
        assert_eq!(format_number(2.5, 2), "2.5");
        assert_eq!(format_number(-0.001, 2), "0");
    }

    #[tokio::test]
    async fn tool_speaks_result_or_error() {
        let calc = Calculate { precision: 2 };
        let ok = calc
            .execute(json!({"expression": "1.5 * 4 / 3"}), &CallContext::default())
            .await
            .unwrap();
        assert_eq!(ok.response, "The result of 1.5 * 4 / 3 is 2.");

        let bad = calc
            .execute(json!({"expression": "4 / (2 - 2)"}), &CallContext::default())
            .await
            .unwrap();
        assert_eq!(bad.response, "I couldn't calculate that: division by zero.");

        let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let deep = calc
            .execute(json!({ "expression": deep }), &CallContext::default())
            .await
            .unwrap();
        assert_eq!(deep.response, "I couldn't calculate that: the expression is too long.");
    }
}
