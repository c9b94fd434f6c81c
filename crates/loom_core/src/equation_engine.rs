use crate::polynomial::BivariatePolynomial;
use anyhow::{anyhow, bail, Result};
use num_complex::Complex64;
use std::collections::HashMap;

/// Name of the sheet coordinate in curve expressions.
pub const SHEET_VARIABLE: &str = "x";
/// Name of the base coordinate in curve expressions.
pub const BASE_VARIABLE: &str = "z";
/// Name of the imaginary unit in curve expressions.
pub const IMAGINARY_UNIT: &str = "I";

// --- AST & Parser ---

/// Abstract Syntax Tree nodes for curve expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // char is operator +, -, *, /, ^
    Unary(char, Box<Expr>),             // -
}

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("Unexpected trailing token {:?}", token)),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() || c == '.' {
            let mut num_str = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    num_str.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            // Exponent notation, e.g. 1.5e-3.
            if let Some(&e) = chars.peek() {
                if e == 'e' || e == 'E' {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    let mut exponent = String::new();
                    if let Some(&sign) = lookahead.peek() {
                        if sign == '+' || sign == '-' {
                            exponent.push(sign);
                            lookahead.next();
                        }
                    }
                    let mut has_digits = false;
                    while let Some(&d) = lookahead.peek() {
                        if d.is_ascii_digit() {
                            exponent.push(d);
                            has_digits = true;
                            lookahead.next();
                        } else {
                            break;
                        }
                    }
                    if has_digits {
                        num_str.push('e');
                        num_str.push_str(&exponent);
                        chars = lookahead;
                    }
                }
            }
            let value = num_str
                .parse()
                .map_err(|_| format!("Invalid number '{}'", num_str))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                other => return Err(format!("Unexpected character '{}'", other)),
            };
            tokens.push(token);
            chars.next();
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
        self.tokens.get(self.pos).cloned()
    }

    fn consume(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_expression(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_term()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => '+',
                Token::Minus => '-',
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => '*',
                Token::Slash => '/',
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    // Unary minus binds looser than '^': -x^2 is -(x^2).
    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let expr = self.parse_unary()?;
                Ok(Expr::Unary('-', Box::new(expr)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // '^' is right associative: a^b^c is a^(b^c).
    fn parse_power(&mut self) -> Result<Expr, String> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), '^', Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    Err(format!("Function calls are not polynomial: '{}'", name))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                if let Some(Token::RParen) = self.consume() {
                    Ok(expr)
                } else {
                    Err("Expected ')'".to_string())
                }
            }
            Some(token) => Err(format!("Unexpected token {:?}", token)),
            None => Err("Unexpected end of expression".to_string()),
        }
    }
}

// --- Expansion ---

/// Expands parsed expressions into dense polynomials in `x` and `z`.
///
/// Named parameters are substituted by their values. Division is only
/// allowed by expressions that expand to nonzero constants and `^` only by
/// non-negative integer constants.
pub struct PolynomialExpander {
    params: HashMap<String, Complex64>,
}

impl PolynomialExpander {
    pub fn new(params: &[(String, Complex64)]) -> Result<Self> {
        let mut map = HashMap::new();
        for (name, value) in params {
            if name == SHEET_VARIABLE || name == BASE_VARIABLE || name == IMAGINARY_UNIT {
                bail!("Parameter name '{}' is reserved.", name);
            }
            if map.insert(name.clone(), *value).is_some() {
                bail!("Duplicate parameter '{}'.", name);
            }
        }
        Ok(Self { params: map })
    }

    pub fn expand(&self, expr: &Expr) -> Result<BivariatePolynomial> {
        match expr {
            Expr::Number(n) => Ok(BivariatePolynomial::constant(Complex64::new(*n, 0.0))),
            Expr::Variable(name) => match name.as_str() {
                SHEET_VARIABLE => Ok(BivariatePolynomial::x()),
                BASE_VARIABLE => Ok(BivariatePolynomial::z()),
                IMAGINARY_UNIT => Ok(BivariatePolynomial::constant(Complex64::i())),
                other => self
                    .params
                    .get(other)
                    .map(|&value| BivariatePolynomial::constant(value))
                    .ok_or_else(|| anyhow!("Unknown variable or parameter: {}", other)),
            },
            Expr::Unary('-', operand) => Ok(-&self.expand(operand)?),
            Expr::Unary(op, _) => bail!("Unknown unary operator: {}", op),
            Expr::Binary(left, op, right) => {
                let lhs = self.expand(left)?;
                let rhs = self.expand(right)?;
                match op {
                    '+' => Ok(&lhs + &rhs),
                    '-' => Ok(&lhs - &rhs),
                    '*' => Ok(&lhs * &rhs),
                    '/' => {
                        let divisor = constant_value(&rhs)
                            .ok_or_else(|| anyhow!("Division by a non-constant expression."))?;
                        if divisor.norm() == 0.0 {
                            bail!("Division by zero.");
                        }
                        Ok(lhs.scale(divisor.inv()))
                    }
                    '^' => {
                        let exponent = constant_value(&rhs)
                            .ok_or_else(|| anyhow!("Exponent must be a constant."))?;
                        let n = exponent.re;
                        if exponent.im != 0.0 || n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64
                        {
                            bail!("Exponent must be a non-negative integer, got {}.", exponent);
                        }
                        Ok(lhs.pow(n as u32))
                    }
                    _ => bail!("Unknown binary operator: {}", op),
                }
            }
        }
    }
}

fn constant_value(poly: &BivariatePolynomial) -> Option<Complex64> {
    if poly.is_zero() {
        return Some(Complex64::new(0.0, 0.0));
    }
    if !poly.is_constant() {
        return None;
    }
    Some(poly.x_coefficients()[0].coeffs()[0])
}

/// Parses `input` and expands it into `F(x, z)`.
pub fn parse_polynomial(input: &str, params: &[(String, Complex64)]) -> Result<BivariatePolynomial> {
    let expr = parse(input).map_err(|e| anyhow!("Failed to parse '{}': {}", input, e))?;
    PolynomialExpander::new(params)?.expand(&expr)
}
