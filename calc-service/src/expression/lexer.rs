// Expression Engine Lexer
// Tokenizes the right-hand side of integer assignment statements

use std::fmt;

/// Token types for assignment right-hand sides
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Literals
    Integer(i64),

    // Identifiers
    Identifier(String),

    // Operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Increment, // ++
    Decrement, // --

    // Delimiters
    LParen, // (
    RParen, // )

    // End of input
    Eof,
}

impl Token {
    /// Whether this token is `++` or `--`
    pub fn is_step(&self) -> bool {
        matches!(self, Token::Increment | Token::Decrement)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{}", n),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Increment => write!(f, "++"),
            Token::Decrement => write!(f, "--"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer error
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lex error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Lexer for assignment right-hand sides
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            position: 0,
        }
    }

    /// Tokenize the entire input. The returned vector always ends with `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        self.position = pos;

        match ch {
            // Operators that may double up
            '+' => {
                self.advance();
                if self.peek_char() == Some('+') {
                    self.advance();
                    Ok(Token::Increment)
                } else {
                    Ok(Token::Plus)
                }
            }
            '-' => {
                self.advance();
                if self.peek_char() == Some('-') {
                    self.advance();
                    Ok(Token::Decrement)
                } else {
                    Ok(Token::Minus)
                }
            }

            // Single-character tokens
            '*' => {
                self.advance();
                Ok(Token::Star)
            }
            '/' => {
                self.advance();
                Ok(Token::Slash)
            }
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }

            '0'..='9' => self.read_integer(),

            'a'..='z' | 'A'..='Z' | '_' => Ok(self.read_identifier()),

            _ => Err(LexError {
                message: format!("unexpected character: '{}'", ch),
                position: pos,
            }),
        }
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_integer(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut digits = String::new();

        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // `2x` is neither a number nor a name
        if let Some(ch) = self.peek_char() {
            if ch.is_alphabetic() || ch == '_' {
                return Err(LexError {
                    message: format!("invalid number: {}{}", digits, ch),
                    position: start,
                });
            }
        }

        digits
            .parse::<i64>()
            .map(Token::Integer)
            .map_err(|_| LexError {
                message: format!("integer out of range: {}", digits),
                position: start,
            })
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::Identifier(ident)
    }
}

/// Whether `name` is a valid variable identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_simple_tokens() {
        let mut lexer = Lexer::new("+ - * / ( )");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::LParen,
                Token::RParen,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_increments() {
        let mut lexer = Lexer::new("++i + j-- - k");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Increment,
                Token::Identifier("i".to_string()),
                Token::Plus,
                Token::Identifier("j".to_string()),
                Token::Decrement,
                Token::Minus,
                Token::Identifier("k".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_post_increment_then_plus() {
        let mut lexer = Lexer::new("i+++5");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Identifier("i".to_string()),
                Token::Increment,
                Token::Plus,
                Token::Integer(5),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_integers_and_identifiers() {
        let mut lexer = Lexer::new("42 foo_1 0 _bar");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Integer(42),
                Token::Identifier("foo_1".to_string()),
                Token::Integer(0),
                Token::Identifier("_bar".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lexer_rejects_unknown_character() {
        let mut lexer = Lexer::new("a % b");
        let err = lexer.tokenize().unwrap_err();
        assert_eq!(err.position, 2);
        assert!(err.message.contains('%'));
    }

    #[test]
    fn test_lexer_rejects_float() {
        assert!(Lexer::new("3.5").tokenize().is_err());
    }

    #[test]
    fn test_lexer_rejects_glued_number() {
        assert!(Lexer::new("2x").tokenize().is_err());
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("x"));
        assert!(is_identifier("_tmp1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("x y"));
        assert!(!is_identifier(""));
    }
}
