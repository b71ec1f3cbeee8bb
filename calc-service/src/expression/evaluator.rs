// Expression Engine Evaluator
// Evaluates assignment statements against a variable mapping

use crate::expression::parser::{BinaryOp, Expr, UnaryOp};
use crate::expression::statement::{Assignment, Statement};

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// Variable name to value mapping
pub type Variables = HashMap<String, i64>;

/// Evaluation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    pub message: String,
    /// The statement being evaluated, when known
    pub expression: Option<String>,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expression {
            Some(expression) => write!(
                f,
                "evaluation error in '{}': {}",
                expression, self.message
            ),
            None => write!(f, "evaluation error: {}", self.message),
        }
    }
}

impl std::error::Error for EvalError {}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expression: None,
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

/// Capability used by the executors to evaluate one assignment line.
///
/// `evaluate` must not observe anything but the given snapshot; the leveled
/// executor shares one snapshot between all workers of a level.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate `expression` against `variables`, returning the assigned
    /// target and its new value.
    async fn evaluate(
        &self,
        expression: &str,
        variables: &Variables,
    ) -> Result<(String, i64), EvalError>;

    /// Evaluate `expression` and write its effects into `variables`.
    async fn evaluate_in_place(
        &self,
        expression: &str,
        variables: &mut Variables,
    ) -> Result<(String, i64), EvalError> {
        let (target, value) = self.evaluate(expression, variables).await?;
        variables.insert(target.clone(), value);
        Ok((target, value))
    }
}

/// Built-in evaluator for integer arithmetic assignments
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticEvaluator;

impl ArithmeticEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Parse and lower a statement, tagging errors with the source line
    fn lower(expression: &str) -> Result<(String, Vec<Assignment>), EvalError> {
        let statement =
            Statement::parse(expression).map_err(|e| e.with_expression(expression))?;
        let steps = statement
            .simplify()
            .map_err(|e| e.with_expression(expression))?;
        tracing::trace!(expression, ?steps, "lowered statement");
        Ok((statement.target, steps))
    }
}

#[async_trait]
impl Evaluator for ArithmeticEvaluator {
    async fn evaluate(
        &self,
        expression: &str,
        variables: &Variables,
    ) -> Result<(String, i64), EvalError> {
        let (target, steps) = Self::lower(expression)?;

        // Writes stay local; the snapshot is never modified
        let mut local = Variables::new();
        for step in &steps {
            let value = eval(&step.value, &|name: &str| {
                local.get(name).or_else(|| variables.get(name)).copied()
            })
            .map_err(|e| e.with_expression(expression))?;
            local.insert(step.target.clone(), value);
        }

        let value = local.get(&target).copied().ok_or_else(|| {
            EvalError::new("statement assigned no value").with_expression(expression)
        })?;
        Ok((target, value))
    }

    async fn evaluate_in_place(
        &self,
        expression: &str,
        variables: &mut Variables,
    ) -> Result<(String, i64), EvalError> {
        let (target, steps) = Self::lower(expression)?;

        for step in &steps {
            let value = eval(&step.value, &|name: &str| variables.get(name).copied())
                .map_err(|e| e.with_expression(expression))?;
            variables.insert(step.target.clone(), value);
        }

        let value = variables.get(&target).copied().ok_or_else(|| {
            EvalError::new("statement assigned no value").with_expression(expression)
        })?;
        Ok((target, value))
    }
}

/// Evaluate an arithmetic expression, resolving names through `lookup`
pub fn eval(expr: &Expr, lookup: &dyn Fn(&str) -> Option<i64>) -> Result<i64, EvalError> {
    match expr {
        Expr::Integer(n) => Ok(*n),

        Expr::Variable(name) => {
            lookup(name)
                .ok_or_else(|| EvalError::new(format!("variable '{}' is not defined", name)))
        }

        Expr::Unary { op, expr } => {
            let value = eval(expr, lookup)?;
            match op {
                UnaryOp::Neg => value
                    .checked_neg()
                    .ok_or_else(|| EvalError::new(format!("integer overflow in -{}", value))),
            }
        }

        Expr::Binary { op, left, right } => {
            let left = eval(left, lookup)?;
            let right = eval(right, lookup)?;
            apply_binary(*op, left, right)
        }
    }
}

fn apply_binary(op: BinaryOp, left: i64, right: i64) -> Result<i64, EvalError> {
    let result = match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Sub => left.checked_sub(right),
        BinaryOp::Mul => left.checked_mul(right),
        BinaryOp::Div => {
            if right == 0 {
                return Err(EvalError::new("division by zero"));
            }
            floor_div(left, right)
        }
    };

    result.ok_or_else(|| {
        EvalError::new(format!(
            "integer overflow in {} {} {}",
            left, op, right
        ))
    })
}

/// Integer division rounding toward negative infinity
pub fn floor_div(left: i64, right: i64) -> Option<i64> {
    let quotient = left.checked_div(right)?;
    let remainder = left.checked_rem(right)?;
    if remainder != 0 && ((remainder < 0) != (right < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}
