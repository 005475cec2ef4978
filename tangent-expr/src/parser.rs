//! Tokenizer and recursive-descent parser
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    = term (('+' | '-') term)*
//! term    = unary (('*' | '/') unary | implicit)*
//! unary   = ('-' | '+') unary | power
//! power   = primary ('^' unary)?
//! primary = number | func '(' args ')' | func power | ident | '(' expr ')'
//! ```
//!
//! `implicit` is a juxtaposed identifier or parenthesised group, so `2x`,
//! `3sin(x)` and `(x+1)(x-1)` are products.
//!
//! Nesting and the height of the resulting tree are both capped at
//! [`MAX_DEPTH`]. Everything downstream (simplification, differentiation,
//! evaluation, rendering) recurses over the tree.

use crate::ast::{BinOp, Expr};
use crate::functions::FunctionRegistry;
use tangent_core::TangentError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn push_op(tokens: &mut Vec<Token>, chars: &mut std::iter::Peekable<std::str::CharIndices>, token: Token) {
    tokens.push(token);
    chars.next();
}

fn tokenize(input: &str) -> Result<Vec<Token>, TangentError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => push_op(&mut tokens, &mut chars, Token::Plus),
            '-' | '−' => push_op(&mut tokens, &mut chars, Token::Minus),
            '*' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '*'))) {
                    chars.next();
                    tokens.push(Token::Caret);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '×' | '·' => push_op(&mut tokens, &mut chars, Token::Star),
            '/' | '÷' => push_op(&mut tokens, &mut chars, Token::Slash),
            '^' => push_op(&mut tokens, &mut chars, Token::Caret),
            '(' => push_op(&mut tokens, &mut chars, Token::LParen),
            ')' => push_op(&mut tokens, &mut chars, Token::RParen),
            ',' => push_op(&mut tokens, &mut chars, Token::Comma),
            '√' => push_op(&mut tokens, &mut chars, Token::Ident("sqrt".to_string())),
            'π' => push_op(&mut tokens, &mut chars, Token::Ident("pi".to_string())),
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        num_str.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Exponent only when digits follow, so `2e` stays `2 * e`
                if matches!(chars.peek(), Some(&(_, 'e' | 'E'))) {
                    let rest = &input[pos + num_str.len() + 1..];
                    let mut rest_chars = rest.chars();
                    let exp_follows = match rest_chars.next() {
                        Some(c) if c.is_ascii_digit() => true,
                        Some('+' | '-') => rest_chars.next().is_some_and(|c| c.is_ascii_digit()),
                        _ => false,
                    };
                    if exp_follows {
                        num_str.push('e');
                        chars.next();
                        if let Some(&(_, sign @ ('+' | '-'))) = chars.peek() {
                            num_str.push(sign);
                            chars.next();
                        }
                        while let Some(&(_, c)) = chars.peek() {
                            if c.is_ascii_digit() {
                                num_str.push(c);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
                match num_str.parse::<f64>() {
                    Ok(n) => tokens.push(Token::Number(n)),
                    Err(_) => {
                        return Err(TangentError::parse_error(format!("Invalid number: {}", num_str)))
                    }
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident.to_lowercase()));
            }
            _ => {
                return Err(TangentError::parse_error(format!(
                    "Unexpected character '{}' at position {}",
                    ch, pos
                )));
            }
        }
    }

    Ok(tokens)
}

/// Deepest nesting, and tallest tree, an expression may have
pub const MAX_DEPTH: usize = 128;

fn too_deep() -> TangentError {
    TangentError::parse_error("expression nested too deeply")
        .with_suggestion(format!("Keep nesting and chains of operators under {} levels", MAX_DEPTH))
}

struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    registry: &'r FunctionRegistry,
}

impl<'r> Parser<'r> {
    fn new(tokens: Vec<Token>, registry: &'r FunctionRegistry) -> Self {
        Parser { tokens, pos: 0, depth: 0, registry }
    }

    // Every recursive descent goes through here
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, TangentError>) -> Result<T, TangentError> {
        if self.depth >= MAX_DEPTH {
            return Err(too_deep());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), TangentError> {
        if self.peek() == Some(&token) {
            self.advance();
            Ok(())
        } else {
            Err(TangentError::parse_error(format!("Expected {}", what)))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, TangentError> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::BinaryOp(Box::new(left), op, Box::new(right));
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, TangentError> {
        let mut left = self.parse_unary()?;

        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = Expr::mul(left, right);
                }
                Some(Token::Slash) => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = Expr::div(left, right);
                }
                // Juxtaposition binds like '*' but never absorbs a sign
                Some(Token::Ident(_)) | Some(Token::LParen) => {
                    let right = self.parse_power()?;
                    left = Expr::mul(left, right);
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, TangentError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let inner = self.nested(Self::parse_unary)?;
                Ok(Expr::neg(inner))
            }
            Some(Token::Plus) => {
                self.advance();
                self.nested(Self::parse_unary)
            }
            _ => self.parse_power(),
        }
    }

    // Right associative through parse_unary, so 2^-x and 2^3^2 both work
    fn parse_power(&mut self) -> Result<Expr, TangentError> {
        let base = self.parse_primary()?;

        if matches!(self.peek(), Some(Token::Caret)) {
            self.advance();
            let exponent = self.nested(Self::parse_unary)?;
            return Ok(Expr::pow(base, exponent));
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, TangentError> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                let is_function = self.registry.is_function(&name);
                let called = matches!(self.peek(), Some(Token::LParen));

                if is_function && called {
                    self.advance();
                    let args = self.nested(Self::parse_args)?;
                    let def = self.registry.resolve(&name, args.len())?;
                    return Ok(Expr::FunctionCall(def.meta.name.to_string(), args));
                }
                if is_function {
                    // sin x, √x: the next power operand is the argument
                    if self.peek().is_none() {
                        return Err(TangentError::parse_error(format!(
                            "Missing argument for function {}",
                            name
                        )));
                    }
                    let arg = self.nested(Self::parse_power)?;
                    let def = self.registry.resolve(&name, 1)?;
                    return Ok(Expr::FunctionCall(def.meta.name.to_string(), vec![arg]));
                }
                if called && name.chars().count() > 1 && self.registry.get_constant(&name).is_none() {
                    return Err(self
                        .registry
                        .resolve(&name, 0)
                        .err()
                        .unwrap_or_else(|| TangentError::undefined_func(&name)));
                }
                Ok(Expr::Variable(name))
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.nested(Self::parse_expr)?;
                self.expect(Token::RParen, "closing ')'")?;
                Ok(expr)
            }
            Some(token) => Err(TangentError::parse_error(format!(
                "Unexpected token: {}",
                describe(&token)
            ))),
            None => Err(TangentError::parse_error("Unexpected end of expression")),
        }
    }

    // After the opening '('
    fn parse_args(&mut self) -> Result<Vec<Expr>, TangentError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                Some(Token::RParen) => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(TangentError::parse_error("Expected ',' or ')' in argument list")),
            }
        }
    }

    fn at_end(&self) -> bool {
        self.peek_at(0).is_none()
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => n.to_string(),
        Token::Ident(s) => s.clone(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Caret => "'^'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Comma => "','".to_string(),
    }
}

/// Parse an expression string against the standard registry
pub fn parse(input: &str) -> Result<Expr, TangentError> {
    parse_with(input, FunctionRegistry::standard())
}

/// Parse an expression string against a specific registry
pub fn parse_with(input: &str, registry: &FunctionRegistry) -> Result<Expr, TangentError> {
    let tokens = tokenize(input).map_err(|e| e.with_expression(input))?;
    if tokens.is_empty() {
        return Err(TangentError::parse_error("Empty expression").with_expression(input));
    }
    let mut parser = Parser::new(tokens, registry);
    let expr = parser.parse_expr().map_err(|e| e.with_expression(input))?;

    if !parser.at_end() {
        let rest = parser.peek().map(describe).unwrap_or_default();
        return Err(TangentError::parse_error(format!("Unexpected {} after expression", rest))
            .with_expression(input));
    }
    // Long operator chains build tall trees without nesting
    if expr.depth() > MAX_DEPTH {
        return Err(too_deep().with_expression(input));
    }

    Ok(expr)
}
