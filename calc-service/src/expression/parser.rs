// Expression Engine Parser
// Parses right-hand side tokens into an integer arithmetic AST

use crate::expression::lexer::{LexError, Lexer, Token};

use std::fmt;

/// Abstract Syntax Tree node for arithmetic expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal
    Integer(i64),

    /// Variable reference
    Variable(String),

    /// Unary operation: -expr
    Unary { op: UnaryOp, expr: Box<Expr> },

    /// Binary operation: a + b, a / b
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{}", n),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Unary { op, expr } => write!(f, "{}{}", op, expr),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg, // -
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // / (floor division)
}

impl BinaryOp {
    /// Map a compound assignment operator character (`+` of `+=`) to its operation
    pub fn from_compound(ch: char) -> Option<Self> {
        match ch {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Sub),
            '*' => Some(BinaryOp::Mul),
            '/' => Some(BinaryOp::Div),
            _ => None,
        }
    }

    /// Token spelling this operation
    pub fn token(self) -> Token {
        match self {
            BinaryOp::Add => Token::Plus,
            BinaryOp::Sub => Token::Minus,
            BinaryOp::Mul => Token::Star,
            BinaryOp::Div => Token::Slash,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
        }
    }
}

/// Parser error
#[derive(Debug, Clone)]
pub struct ParseExprError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for ParseExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at token {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for ParseExprError {}

impl From<LexError> for ParseExprError {
    fn from(err: LexError) -> Self {
        Self {
            message: err.message,
            position: err.position,
        }
    }
}

/// Recursive descent parser for arithmetic expressions
pub struct ExprParser {
    tokens: Vec<Token>,
    position: usize,
}

impl ExprParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse expression from string
    pub fn parse_str(input: &str) -> Result<Expr, ParseExprError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self::new(tokens);
        parser.parse()
    }

    /// Parse the token stream into an expression
    pub fn parse(&mut self) -> Result<Expr, ParseExprError> {
        if self.check(&Token::Eof) {
            return Err(self.error("empty expression"));
        }

        let expr = self.parse_additive()?;

        if !self.check(&Token::Eof) {
            return Err(self.error(&format!("unexpected token: {}", self.peek())));
        }

        Ok(expr)
    }

    // Precedence (lowest to highest):
    // 1. Additive: + -
    // 2. Multiplicative: * /
    // 3. Unary: -
    // 4. Primary: integer, variable, ( )

    fn parse_additive(&mut self) -> Result<Expr, ParseExprError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseExprError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseExprError> {
        if self.check(&Token::Minus) {
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseExprError> {
        match self.peek().clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(Expr::Integer(n))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(Expr::Variable(name))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_additive()?;
                self.expect(&Token::RParen, "expected ')'")?;
                Ok(expr)
            }
            Token::Increment | Token::Decrement => {
                Err(self.error("increment and decrement must be simplified before parsing"))
            }
            Token::Eof => Err(self.error("unexpected end of expression")),
            token => Err(self.error(&format!("unexpected token: {}", token))),
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let token = self.tokens.get(self.position).unwrap_or(&Token::Eof);
        self.position += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token, msg: &str) -> Result<(), ParseExprError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(msg))
        }
    }

    fn error(&self, message: &str) -> ParseExprError {
        ParseExprError {
            message: message.to_string(),
            position: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        assert_eq!(ExprParser::parse_str("42").unwrap(), Expr::Integer(42));
    }

    #[test]
    fn test_parse_precedence() {
        let expr = ExprParser::parse_str("a + b * 2").unwrap();
        assert_eq!(
            expr,
            Expr::binary(
                BinaryOp::Add,
                Expr::variable("a"),
                Expr::binary(BinaryOp::Mul, Expr::variable("b"), Expr::Integer(2)),
            )
        );
    }

    #[test]
    fn test_parse_left_associative() {
        let expr = ExprParser::parse_str("10 - 4 - 3").unwrap();
        assert_eq!(expr.to_string(), "((10 - 4) - 3)");
    }

    #[test]
    fn test_parse_parentheses() {
        let expr = ExprParser::parse_str("(5 + 3) * 10").unwrap();
        assert_eq!(expr.to_string(), "((5 + 3) * 10)");
    }

    #[test]
    fn test_parse_unary_minus() {
        let expr = ExprParser::parse_str("-x * 2").unwrap();
        assert_eq!(expr.to_string(), "(-x * 2)");
    }

    #[test]
    fn test_parse_unclosed_paren() {
        let err = ExprParser::parse_str("(1 + 2").unwrap_err();
        assert!(err.message.contains("')'"));
    }

    #[test]
    fn test_parse_trailing_tokens() {
        assert!(ExprParser::parse_str("1 2").is_err());
    }

    #[test]
    fn test_parse_empty() {
        let err = ExprParser::parse_str("   ").unwrap_err();
        assert_eq!(err.message, "empty expression");
    }

    #[test]
    fn test_parse_rejects_raw_increment() {
        assert!(ExprParser::parse_str("++i").is_err());
    }
}
