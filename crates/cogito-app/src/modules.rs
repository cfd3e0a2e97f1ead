//! Knowledge modules bundled with the binary.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;

use cogito_core::{ContextSnapshot, ModuleResponse, ResponsePayload};
use cogito_engine::{KnowledgeModule, ModuleError};

const ARITHMETIC_CONFIDENCE: f64 = 0.95;

// "3 x 4" and "3 × 4" mean multiplication only between operands.
static TIMES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d|\))\s*[x×]\s*(\d|\()").expect("Invalid times regex"));

static EXPRESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+*/().\d\s]*\d[-+*/().\d\s]*").expect("Invalid expression regex")
});

/// Evaluates arithmetic expressions with `+ - * /`, parentheses and
/// unary minus, honoring operator precedence.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArithmeticModule;

impl ArithmeticModule {
    pub const NAME: &'static str = "mathematics";

    /// The arithmetic expression embedded in `input`, normalized.
    pub fn find_expression(input: &str) -> Option<String> {
        let normalized = TIMES_RE.replace_all(input, "$1 * $2").replace('÷', "/");
        EXPRESSION_RE
            .find_iter(&normalized)
            .map(|m| m.as_str().trim().trim_end_matches('.').trim().to_string())
            .filter(|expr| expr.chars().any(|c| "+-*/".contains(c)))
            .max_by_key(|expr| expr.len())
    }
}

#[async_trait]
impl KnowledgeModule for ArithmeticModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn process(
        &self,
        input: &str,
        _context: &ContextSnapshot,
    ) -> Result<ModuleResponse, ModuleError> {
        let expression = Self::find_expression(input)
            .ok_or_else(|| ModuleError::failed(Self::NAME, "no arithmetic expression found"))?;
        let value =
            evaluate(&expression).map_err(|reason| ModuleError::failed(Self::NAME, reason))?;
        tracing::debug!(%expression, value, "Evaluated expression");
        Ok(ModuleResponse::success(
            Self::NAME,
            ARITHMETIC_CONFIDENCE,
            ResponsePayload::Numeric {
                expression: Some(expression),
                value,
            },
            Utc::now(),
        ))
    }
}

// =============================================================================
// Expression evaluation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
}

fn lex(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{}'", literal))?;
                tokens.push(Token::Number(value));
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
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
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else if rhs == 0.0 {
                return Err("division by zero".to_string());
            } else {
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Op('-')) => Ok(-self.factor()?),
            Some(Token::Op('+')) => self.factor(),
            Some(Token::Open) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err("unbalanced parentheses".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected token {:?}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Evaluate a normalized arithmetic expression.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let mut parser = Parser {
        tokens: lex(expr)?,
        pos: 0,
    };
    let value = parser.expression()?;
    if parser.pos < parser.tokens.len() {
        return Err("trailing input after expression".to_string());
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}
