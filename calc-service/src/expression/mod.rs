// Expression Engine Module
// Integer assignment statements: lexing, parsing, shape lowering, evaluation

pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod statement;

pub use evaluator::{floor_div, ArithmeticEvaluator, EvalError, Evaluator, Variables};
pub use lexer::{is_identifier, LexError, Lexer, Token};
pub use parser::{BinaryOp, Expr, ExprParser, ParseExprError, UnaryOp};
pub use statement::{Assignment, Shape, Statement};
