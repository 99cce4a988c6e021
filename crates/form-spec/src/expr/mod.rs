//! Sandboxed expression language for field and option visibility.
//!
//! Expressions are parsed into an [`Expr`] tree and evaluated against a
//! [`Scope`] that resolves `$name` references. Nothing outside the scope
//! is reachable from an expression, and both parsing and evaluation are
//! bounded by [`EvalLimits`].

mod eval;
mod lexer;
mod parser;

use std::collections::BTreeMap;

use thiserror::Error;

pub use eval::Operand;

/// Parse and evaluation bounds applied to every expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    pub max_source_len: usize,
    pub max_depth: usize,
    pub max_steps: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_source_len: 4096,
            max_depth: 64,
            max_steps: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("expression is {len} bytes long, limit is {limit}")]
    TooLong { len: usize, limit: usize },
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("{message} at offset {offset}")]
    Syntax { message: String, offset: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("evaluation exceeded {limit} steps")]
    BudgetExhausted { limit: usize },
    #[error("cannot read '{property}' of {target}")]
    TypeError {
        property: String,
        target: &'static str,
    },
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("right side of 'in' must be a list or string, found {0}")]
    NotIterable(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Operand),
    Var(String),
    Array(Vec<Expr>),
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Member {
        target: Box<Expr>,
        property: String,
    },
    Call {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
}

/// Resolves `$name` references during evaluation.
pub trait Scope {
    /// Returns the value bound to `name`, or `None` when it is not in scope.
    fn lookup(&self, name: &str) -> Option<Operand>;
}

/// Scope with no bindings; every reference is `undefined`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _name: &str) -> Option<Operand> {
        None
    }
}

impl Scope for BTreeMap<String, Operand> {
    fn lookup(&self, name: &str) -> Option<Operand> {
        if let Some(value) = self.get(name) {
            return Some(value.clone());
        }
        let wanted = name.to_lowercase();
        self.iter()
            .find(|(key, _)| key.to_lowercase() == wanted)
            .map(|(_, value)| value.clone())
    }
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        parser::parse(source, &EvalLimits::default())
    }

    pub fn parse_with(source: &str, limits: &EvalLimits) -> Result<Self, ExprError> {
        parser::parse(source, limits)
    }

    pub(crate) fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluates the expression to a value.
    pub fn evaluate(&self, scope: &dyn Scope, limits: &EvalLimits) -> Result<Operand, ExprError> {
        eval::Evaluator::new(scope, limits).eval(self)
    }

    /// Evaluates the expression and coerces the result with truthiness.
    pub fn test(&self, scope: &dyn Scope, limits: &EvalLimits) -> Result<bool, ExprError> {
        self.evaluate(scope, limits).map(|value| value.is_truthy())
    }

    /// Variable names referenced by the expression, in first-use order.
    pub fn references(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Var(name) => {
                if !names.iter().any(|existing| existing == name) {
                    names.push(name.clone());
                }
            }
            Expr::Array(items) => items.iter().for_each(|item| item.collect_references(names)),
            Expr::Not(inner) => inner.collect_references(names),
            Expr::Binary { left, right, .. } => {
                left.collect_references(names);
                right.collect_references(names);
            }
            Expr::Member { target, .. } => target.collect_references(names),
            Expr::Call { target, args, .. } => {
                target.collect_references(names);
                args.iter().for_each(|arg| arg.collect_references(names));
            }
            Expr::Index { target, index } => {
                target.collect_references(names);
                index.collect_references(names);
            }
        }
    }
}

/// Parses and tests `source` in one go.
pub fn evaluate_condition(
    source: &str,
    scope: &dyn Scope,
    limits: &EvalLimits,
) -> Result<bool, ExprError> {
    Expr::parse_with(source, limits)?.test(scope, limits)
}
