// Assignment Statements
// Classifies an assignment line by shape and lowers it to primitive assignments

use crate::expression::evaluator::EvalError;
use crate::expression::lexer::{is_identifier, Lexer, Token};
use crate::expression::parser::{BinaryOp, Expr, ExprParser};

use std::fmt;

/// Shape of an assignment statement.
///
/// Classification is first-match in declaration order, so `x += ++y` is
/// `Compound` and `x = ++y + z++` is `PreIncrement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `x op= e`
    Compound(BinaryOp),
    /// `x = e` with no `++`/`--` on the right-hand side
    Simple,
    /// `x = ++v ...` or `x = --v ...`
    PreIncrement,
    /// exactly `x = v++` or `x = v--`
    PostIncrement,
    /// any other placement of `++`/`--`
    Mixed,
}

/// A single `target = value` step with no side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub target: String,
    pub value: Expr,
}

impl Assignment {
    pub fn new(target: impl Into<String>, value: Expr) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, self.value)
    }
}

/// A parsed assignment line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub target: String,
    pub shape: Shape,
    rhs: Vec<Token>,
}

impl Statement {
    /// Parse an assignment line such as `x = a + 1`, `x *= 2` or `j = i++`
    pub fn parse(source: &str) -> Result<Self, EvalError> {
        let Some((lhs, rhs)) = source.split_once('=') else {
            return Err(EvalError::new("invalid expression format: missing '='"));
        };

        if rhs.starts_with('=') {
            return Err(EvalError::new("comparison is not an assignment"));
        }

        let lhs = lhs.trim();
        let (target, compound) = match lhs.chars().last().and_then(BinaryOp::from_compound) {
            Some(op) => (lhs[..lhs.len() - 1].trim_end(), Some(op)),
            None => (lhs, None),
        };

        if !is_identifier(target) {
            return Err(EvalError::new(format!(
                "invalid assignment target: '{}'",
                target
            )));
        }

        let mut rhs = Lexer::new(rhs)
            .tokenize()
            .map_err(|e| EvalError::new(format!("invalid expression syntax: {}", e)))?;
        rhs.pop(); // Eof

        if rhs.is_empty() {
            return Err(EvalError::new("missing value after '='"));
        }

        let shape = classify(compound, &rhs);

        Ok(Self {
            target: target.to_string(),
            shape,
            rhs,
        })
    }

    /// Lower the statement into primitive assignments, in evaluation order
    pub fn simplify(&self) -> Result<Vec<Assignment>, EvalError> {
        match self.shape {
            Shape::Simple => Ok(vec![Assignment::new(
                &self.target,
                parse_tokens(self.rhs.clone())?,
            )]),
            Shape::Compound(op) => {
                let mut tokens = Vec::with_capacity(self.rhs.len() + 4);
                tokens.push(Token::Identifier(self.target.clone()));
                tokens.push(op.token());
                tokens.push(Token::LParen);
                tokens.extend(self.rhs.iter().cloned());
                tokens.push(Token::RParen);
                expand_steps(&self.target, tokens)
            }
            Shape::PreIncrement | Shape::PostIncrement | Shape::Mixed => {
                expand_steps(&self.target, self.rhs.clone())
            }
        }
    }
}

fn classify(compound: Option<BinaryOp>, rhs: &[Token]) -> Shape {
    if let Some(op) = compound {
        return Shape::Compound(op);
    }

    if !rhs.iter().any(Token::is_step) {
        return Shape::Simple;
    }

    match rhs {
        [step, Token::Identifier(_), ..] if step.is_step() => Shape::PreIncrement,
        [Token::Identifier(_), step] if step.is_step() => Shape::PostIncrement,
        _ => Shape::Mixed,
    }
}

/// Replace `++v`/`v++` (and `--`) with `v`, hoisting the updates around the
/// main assignment: prefix updates before it, postfix updates after it.
fn expand_steps(target: &str, tokens: Vec<Token>) -> Result<Vec<Assignment>, EvalError> {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut body = Vec::with_capacity(tokens.len());

    let mut i = 0;
    while i < tokens.len() {
        match (&tokens[i], tokens.get(i + 1)) {
            (step, Some(Token::Identifier(name))) if step.is_step() => {
                before.push(step_assignment(name, step));
                body.push(Token::Identifier(name.clone()));
                i += 2;
            }
            (Token::Identifier(name), Some(step)) if step.is_step() => {
                after.push(step_assignment(name, step));
                body.push(Token::Identifier(name.clone()));
                i += 2;
            }
            (step, _) if step.is_step() => {
                return Err(EvalError::new(format!(
                    "'{}' must be applied to a variable",
                    step
                )));
            }
            (token, _) => {
                body.push(token.clone());
                i += 1;
            }
        }
    }

    let mut assignments = before;
    assignments.push(Assignment::new(target, parse_tokens(body)?));
    assignments.extend(after);
    Ok(assignments)
}

fn step_assignment(name: &str, step: &Token) -> Assignment {
    let op = if *step == Token::Increment {
        BinaryOp::Add
    } else {
        BinaryOp::Sub
    };
    Assignment::new(name, Expr::binary(op, Expr::variable(name), Expr::Integer(1)))
}

fn parse_tokens(tokens: Vec<Token>) -> Result<Expr, EvalError> {
    ExprParser::new(tokens)
        .parse()
        .map_err(|e| EvalError::new(format!("invalid expression syntax: {}", e)))
}
