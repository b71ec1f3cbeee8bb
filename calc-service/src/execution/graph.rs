// Dependency Graph Builder
// Builds the dependency DAG of an expression batch for execution ordering

use crate::execution::extract::extract;

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::fmt;

/// Error type for graph operations
#[derive(Debug, Clone)]
pub struct GraphError {
    pub message: String,
    pub kind: GraphErrorKind,
    /// Variable the error is about, when there is one
    pub variable: Option<String>,
    /// Offending expression, when there is one
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphErrorKind {
    /// Expression has no assignment shape
    MalformedExpression,
    /// Expression reads a variable no expression of the batch assigns
    UndefinedVariable,
    /// Circular dependency detected
    CyclicDependency,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph error: {}", self.message)
    }
}

impl std::error::Error for GraphError {}

impl GraphError {
    pub fn malformed(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: GraphErrorKind::MalformedExpression,
            variable: None,
            expression: Some(expression.into()),
        }
    }

    pub fn undefined(variable: impl Into<String>, expression: impl Into<String>) -> Self {
        let variable = variable.into();
        let expression = expression.into();
        Self {
            message: format!(
                "undefined variable '{}' in expression '{}'",
                variable, expression
            ),
            kind: GraphErrorKind::UndefinedVariable,
            variable: Some(variable),
            expression: Some(expression),
        }
    }

    pub fn cyclic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: GraphErrorKind::CyclicDependency,
            variable: None,
            expression: None,
        }
    }
}

/// One assignment of the batch, identified by its position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expression {
    /// Position in the input batch
    pub index: usize,
    /// Original text
    pub source: String,
    /// Variable assigned
    pub target: String,
    /// Variables read
    pub dependencies: BTreeSet<String>,
}

impl Expression {
    /// Extract target and dependencies of one batch line
    pub fn parse(index: usize, source: &str) -> Result<Self, GraphError> {
        let (target, dependencies) = extract(source)?;
        Ok(Self {
            index,
            source: source.to_string(),
            target,
            dependencies,
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Dependency graph over the expressions of one batch
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Expressions in batch order
    pub expressions: Vec<Expression>,
    /// Producing expression indices per target, ascending
    producers: HashMap<String, Vec<usize>>,
    /// Upstream expression indices per expression (distinct edges)
    upstream: Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    /// Build the graph of a batch.
    ///
    /// A read of `d` resolves to the nearest earlier assignment of `d`; a
    /// forward read (no earlier assignment) waits for every later one. A read
    /// only the expression itself satisfies makes a cycle.
    pub fn build<S: AsRef<str>>(batch: &[S]) -> Result<Self, GraphError> {
        // Pass 1: every target is a known node
        let expressions = batch
            .iter()
            .enumerate()
            .map(|(index, source)| Expression::parse(index, source.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut producers: HashMap<String, Vec<usize>> = HashMap::new();
        for expression in &expressions {
            producers
                .entry(expression.target.clone())
                .or_default()
                .push(expression.index);
        }

        // Pass 2: resolve reads to producing expressions
        let mut upstream = Vec::with_capacity(expressions.len());
        for expression in &expressions {
            let mut edges = BTreeSet::new();

            for dep in &expression.dependencies {
                let Some(candidates) = producers.get(dep) else {
                    return Err(GraphError::undefined(dep, &expression.source));
                };
                edges.extend(Self::resolve(expression.index, candidates));
            }

            upstream.push(edges);
        }

        Ok(Self {
            expressions,
            producers,
            upstream,
        })
    }

    fn resolve(index: usize, candidates: &[usize]) -> Vec<usize> {
        if let Some(&nearest) = candidates.iter().rev().find(|&&p| p < index) {
            return vec![nearest];
        }

        let later: Vec<usize> = candidates.iter().copied().filter(|&p| p > index).collect();
        if later.is_empty() {
            // Only the expression itself assigns the variable it reads
            vec![index]
        } else {
            later
        }
    }

    /// Number of expressions in the graph
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Expressions this expression waits for
    pub fn upstream(&self, index: usize) -> impl Iterator<Item = &Expression> {
        self.upstream
            .get(index)
            .into_iter()
            .flatten()
            .map(|&i| &self.expressions[i])
    }

    /// Indices of the expressions assigning `target`, in batch order
    pub fn producers(&self, target: &str) -> &[usize] {
        self.producers.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get expressions in topological order (respecting dependencies).
    ///
    /// Ready expressions are emitted in batch order.
    pub fn topological_order(&self) -> Result<Vec<&Expression>, GraphError> {
        // Kahn's algorithm for topological sort
        let mut in_degree: Vec<usize> = self.upstream.iter().map(BTreeSet::len).collect();
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); self.expressions.len()];

        for (index, edges) in self.upstream.iter().enumerate() {
            for &from in edges {
                downstream[from].push(index);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(index, _)| Reverse(index))
            .collect();

        let mut result = Vec::with_capacity(self.expressions.len());

        while let Some(Reverse(index)) = ready.pop() {
            result.push(&self.expressions[index]);

            for &next in &downstream[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if result.len() < self.expressions.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &deg)| deg > 0)
                .map(|(index, _)| self.expressions[index].source.as_str())
                .collect();

            return Err(GraphError::cyclic(format!(
                "circular dependency detected among: {}",
                stuck.join(", ")
            )));
        }

        Ok(result)
    }
}
