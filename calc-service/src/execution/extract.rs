// Dependency Extractor
// Derives the target and the read set of an assignment line without evaluating it

use crate::execution::graph::GraphError;
use crate::expression::lexer::is_identifier;
use crate::expression::parser::BinaryOp;

use std::collections::BTreeSet;

/// Extract `(target, dependencies)` from an assignment line.
///
/// Dependencies are every identifier on the right-hand side, including the
/// operands of `++`/`--`. A compound assignment (`x += e`) also reads its
/// own target.
pub fn extract(expression: &str) -> Result<(String, BTreeSet<String>), GraphError> {
    let Some((lhs, rhs)) = expression.split_once('=') else {
        return Err(GraphError::malformed(
            format!("expression '{}' has no '='", expression),
            expression,
        ));
    };

    if rhs.starts_with('=') {
        return Err(GraphError::malformed(
            format!("expression '{}' is a comparison, not an assignment", expression),
            expression,
        ));
    }

    let lhs = lhs.trim();
    let (target, compound) = match lhs.chars().last().and_then(BinaryOp::from_compound) {
        Some(_) => (lhs[..lhs.len() - 1].trim_end(), true),
        None => (lhs, false),
    };

    if !is_identifier(target) {
        return Err(GraphError::malformed(
            format!("invalid assignment target '{}' in '{}'", target, expression),
            expression,
        ));
    }

    let mut dependencies = identifiers(rhs);
    if compound {
        dependencies.insert(target.to_string());
    }

    Ok((target.to_string(), dependencies))
}

/// Collect identifier words, skipping numerals and punctuation
fn identifiers(text: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut word = String::new();

    for ch in text.chars().chain(std::iter::once(' ')) {
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }

        if word.starts_with(|c: char| c.is_alphabetic() || c == '_') {
            names.insert(std::mem::take(&mut word));
        } else {
            word.clear();
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::graph::GraphErrorKind;

    fn deps(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_simple() {
        let (target, dependencies) = extract("c = a + b").unwrap();
        assert_eq!(target, "c");
        assert_eq!(dependencies, deps(&["a", "b"]));
    }

    #[test]
    fn test_extract_constant() {
        let (target, dependencies) = extract("y = (5 + 3) * 10").unwrap();
        assert_eq!(target, "y");
        assert!(dependencies.is_empty());
    }

    #[test]
    fn test_extract_compound_reads_target() {
        let (target, dependencies) = extract("i += y").unwrap();
        assert_eq!(target, "i");
        assert_eq!(dependencies, deps(&["i", "y"]));

        let (target, dependencies) = extract("x*=2").unwrap();
        assert_eq!(target, "x");
        assert_eq!(dependencies, deps(&["x"]));
    }

    #[test]
    fn test_extract_increments() {
        assert_eq!(extract("j = ++i").unwrap().1, deps(&["i"]));
        assert_eq!(extract("x = i++ + 5").unwrap().1, deps(&["i"]));
        assert_eq!(extract("k = --a * b--").unwrap().1, deps(&["a", "b"]));
    }

    #[test]
    fn test_extract_skips_numerals() {
        assert_eq!(extract("x = 10 + foo_2 - 3").unwrap().1, deps(&["foo_2"]));
    }

    #[test]
    fn test_extract_duplicates_collapse() {
        assert_eq!(extract("x = a * a + a").unwrap().1, deps(&["a"]));
    }

    #[test]
    fn test_extract_missing_equals() {
        let err = extract("x + 1").unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::MalformedExpression);
        assert_eq!(err.expression.as_deref(), Some("x + 1"));
    }

    #[test]
    fn test_extract_rejects_comparison_and_bad_target() {
        assert_eq!(
            extract("x == 1").unwrap_err().kind,
            GraphErrorKind::MalformedExpression
        );
        assert_eq!(
            extract("a b = 1").unwrap_err().kind,
            GraphErrorKind::MalformedExpression
        );
        assert_eq!(
            extract("= 1").unwrap_err().kind,
            GraphErrorKind::MalformedExpression
        );
    }
}
