// Level Planner
// Packs a topological order into levels of mutually independent expressions

use crate::execution::graph::Expression;

use serde::Serialize;
use std::collections::HashSet;

/// A group of expressions that can be evaluated concurrently
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Level {
    pub index: usize,
    pub expressions: Vec<Expression>,
}

impl Level {
    fn new(index: usize) -> Self {
        Self {
            index,
            expressions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Targets assigned in this level
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.expressions.iter().map(|e| e.target.as_str())
    }
}

/// Walk `ordered` and open a new level whenever the next expression reads a
/// target already placed in the current one.
///
/// Greedy and order-sensitive: the result is not necessarily the minimum
/// number of levels.
pub fn levels(ordered: &[&Expression]) -> Vec<Level> {
    let mut levels = Vec::new();
    let mut current = Level::new(0);
    let mut placed: HashSet<&str> = HashSet::new();

    for &expression in ordered {
        let conflicts = expression
            .dependencies
            .iter()
            .any(|dep| placed.contains(dep.as_str()));

        if conflicts {
            let next = Level::new(current.index + 1);
            levels.push(std::mem::replace(&mut current, next));
            placed.clear();
        }

        placed.insert(expression.target.as_str());
        current.expressions.push(expression.clone());
    }

    if !current.is_empty() {
        levels.push(current);
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::graph::DependencyGraph;

    fn plan(batch: &[&str]) -> Vec<Vec<String>> {
        let graph = DependencyGraph::build(batch).unwrap();
        let order = graph.topological_order().unwrap();
        levels(&order)
            .iter()
            .map(|level| level.targets().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_independent_batch_is_one_level() {
        assert_eq!(plan(&["a = 1", "b = 2", "c = 3"]), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_layered_batch() {
        let levels = plan(&["a = 1", "b = 2", "c = a + b", "d = c * 2", "e = d + 1"]);

        assert_eq!(
            levels,
            vec![vec!["a", "b"], vec!["c"], vec!["d"], vec!["e"]]
        );
    }

    #[test]
    fn test_parallel_branches() {
        let levels = plan(&["a = 1", "b = a + 1", "c = a + 1", "d = b + c", "e = d * 2"]);

        assert_eq!(
            levels,
            vec![vec!["a"], vec!["b", "c"], vec!["d"], vec!["e"]]
        );
    }

    #[test]
    fn test_greedy_packing_is_order_sensitive() {
        // `b` reads `a`, so `c` lands next to `b` rather than next to `a`
        let levels = plan(&["a = 1", "b = a", "c = 2"]);
        assert_eq!(levels, vec![vec!["a"], vec!["b", "c"]]);
    }

    #[test]
    fn test_level_indices_are_sequential() {
        let graph = DependencyGraph::build(&["a = 1", "b = a", "c = b"]).unwrap();
        let order = graph.topological_order().unwrap();
        let indices: Vec<usize> = levels(&order).iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_level_independence() {
        let batch = [
            "i = 0",
            "j = ++i",
            "x = i++ + 5",
            "y = (5 + 3) * 10",
            "i += y",
            "z = i + j",
        ];
        let graph = DependencyGraph::build(&batch).unwrap();
        let order = graph.topological_order().unwrap();

        for level in levels(&order) {
            for expression in &level.expressions {
                let others: HashSet<&str> = level
                    .expressions
                    .iter()
                    .filter(|other| other.index != expression.index)
                    .map(|other| other.target.as_str())
                    .collect();
                assert!(expression
                    .dependencies
                    .iter()
                    .all(|dep| !others.contains(dep.as_str())));
            }
        }
    }

    #[test]
    fn test_empty_order() {
        assert!(levels(&[]).is_empty());
    }
}
