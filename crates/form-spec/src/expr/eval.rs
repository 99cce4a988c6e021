use std::cmp::Ordering;

use crate::value::AnswerValue;

use super::{BinaryOp, EvalLimits, Expr, ExprError, Scope};

/// Runtime value of the expression language.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Operand>),
}

impl Operand {
    pub fn type_name(&self) -> &'static str {
        match self {
            Operand::Undefined => "undefined",
            Operand::Null => "null",
            Operand::Bool(_) => "boolean",
            Operand::Number(_) => "number",
            Operand::Str(_) => "string",
            Operand::Array(_) => "list",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Operand::Undefined | Operand::Null => false,
            Operand::Bool(flag) => *flag,
            Operand::Number(number) => *number != 0.0 && !number.is_nan(),
            Operand::Str(text) => !text.is_empty(),
            Operand::Array(_) => true,
        }
    }

    fn is_nullish(&self) -> bool {
        matches!(self, Operand::Undefined | Operand::Null)
    }

    fn to_number(&self) -> f64 {
        match self {
            Operand::Undefined => f64::NAN,
            Operand::Null => 0.0,
            Operand::Bool(flag) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            Operand::Number(number) => *number,
            Operand::Str(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Operand::Array(_) => self.to_primitive().to_number(),
        }
    }

    fn to_display(&self) -> String {
        match self {
            Operand::Undefined | Operand::Null => String::new(),
            Operand::Bool(flag) => flag.to_string(),
            Operand::Number(number) => format_number(*number),
            Operand::Str(text) => text.clone(),
            Operand::Array(items) => items
                .iter()
                .map(Operand::to_display)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    // Lists collapse to their comma-joined text before scalar comparison.
    fn to_primitive(&self) -> Operand {
        match self {
            Operand::Array(_) => Operand::Str(self.to_display()),
            other => other.clone(),
        }
    }

    pub fn strict_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Number(a), Operand::Number(b)) => a == b,
            (Operand::Array(a), Operand::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(left, right)| left.strict_eq(right))
            }
            (left, right) => left == right,
        }
    }

    pub fn loose_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (left, right) if left.is_nullish() || right.is_nullish() => {
                left.is_nullish() && right.is_nullish()
            }
            (Operand::Array(_), Operand::Array(_)) => self.strict_eq(other),
            (Operand::Array(_), _) => self.to_primitive().loose_eq(other),
            (_, Operand::Array(_)) => self.loose_eq(&other.to_primitive()),
            (Operand::Bool(_), _) => Operand::Number(self.to_number()).loose_eq(other),
            (_, Operand::Bool(_)) => self.loose_eq(&Operand::Number(other.to_number())),
            (Operand::Number(a), Operand::Str(_)) => *a == other.to_number(),
            (Operand::Str(_), Operand::Number(b)) => self.to_number() == *b,
            (left, right) => left.strict_eq(right),
        }
    }

    fn compare(&self, other: &Operand) -> Option<Ordering> {
        let left = self.to_primitive();
        let right = other.to_primitive();
        match (&left, &right) {
            (Operand::Str(a), Operand::Str(b)) => Some(a.cmp(b)),
            _ => left.to_number().partial_cmp(&right.to_number()),
        }
    }
}

impl From<&AnswerValue> for Operand {
    fn from(value: &AnswerValue) -> Self {
        match value {
            AnswerValue::Unset => Operand::Null,
            AnswerValue::Bool(flag) => Operand::Bool(*flag),
            AnswerValue::Number(number) => Operand::Number(*number),
            AnswerValue::Text(text) => Operand::Str(text.clone()),
            AnswerValue::NumberList(values) => {
                Operand::Array(values.iter().copied().map(Operand::Number).collect())
            }
            AnswerValue::TextList(values) => {
                Operand::Array(values.iter().cloned().map(Operand::Str).collect())
            }
        }
    }
}

fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".into()
    } else if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

pub(crate) struct Evaluator<'a> {
    scope: &'a dyn Scope,
    steps: usize,
    max_steps: usize,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(scope: &'a dyn Scope, limits: &EvalLimits) -> Self {
        Self {
            scope,
            steps: 0,
            max_steps: limits.max_steps,
        }
    }

    fn charge(&mut self, cost: usize) -> Result<(), ExprError> {
        self.steps = self.steps.saturating_add(cost);
        if self.steps > self.max_steps {
            return Err(ExprError::BudgetExhausted {
                limit: self.max_steps,
            });
        }
        Ok(())
    }

    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Operand, ExprError> {
        self.charge(1)?;
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => Ok(self.scope.lookup(name).unwrap_or(Operand::Undefined)),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Operand::Array),
            Expr::Not(inner) => Ok(Operand::Bool(!self.eval(inner)?.is_truthy())),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Member { target, property } => {
                let target = self.eval(target)?;
                member(&target, property)
            }
            Expr::Call {
                target,
                method,
                args,
            } => {
                let target = self.eval(target)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&target, method, &args)
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                element(&target, &index)
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Operand, ExprError> {
        match op {
            BinaryOp::And => {
                if !self.eval(left)?.is_truthy() {
                    return Ok(Operand::Bool(false));
                }
                Ok(Operand::Bool(self.eval(right)?.is_truthy()))
            }
            BinaryOp::Or => {
                if self.eval(left)?.is_truthy() {
                    return Ok(Operand::Bool(true));
                }
                Ok(Operand::Bool(self.eval(right)?.is_truthy()))
            }
            BinaryOp::In => {
                let (needle, haystack) = self.operands(left, right)?;
                Ok(Operand::Bool(self.contains(&haystack, &needle, true)?))
            }
            comparison => {
                let (left, right) = self.operands(left, right)?;
                let ordering = left.compare(&right);
                let result = match comparison {
                    BinaryOp::LooseEq => left.loose_eq(&right),
                    BinaryOp::LooseNe => !left.loose_eq(&right),
                    BinaryOp::StrictEq => left.strict_eq(&right),
                    BinaryOp::StrictNe => !left.strict_eq(&right),
                    BinaryOp::Lt => ordering == Some(Ordering::Less),
                    BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    BinaryOp::Gt => ordering == Some(Ordering::Greater),
                    _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                };
                Ok(Operand::Bool(result))
            }
        }
    }

    fn operands(&mut self, left: &Expr, right: &Expr) -> Result<(Operand, Operand), ExprError> {
        let left = self.eval(left)?;
        let right = self.eval(right)?;
        Ok((left, right))
    }

    fn contains(
        &mut self,
        haystack: &Operand,
        needle: &Operand,
        loose: bool,
    ) -> Result<bool, ExprError> {
        match haystack {
            Operand::Array(items) => {
                self.charge(items.len())?;
                Ok(items.iter().any(|item| {
                    if loose {
                        item.loose_eq(needle)
                    } else {
                        item.strict_eq(needle)
                            || matches!((item, needle), (Operand::Number(a), Operand::Number(b)) if a.is_nan() && b.is_nan())
                    }
                }))
            }
            Operand::Str(text) => {
                self.charge(text.len() / 16 + 1)?;
                Ok(text.contains(&needle.to_display()))
            }
            other => Err(ExprError::NotIterable(other.type_name())),
        }
    }

    fn call(
        &mut self,
        target: &Operand,
        method: &str,
        args: &[Operand],
    ) -> Result<Operand, ExprError> {
        if target.is_nullish() {
            return Err(ExprError::TypeError {
                property: method.to_string(),
                target: target.type_name(),
            });
        }
        match (method, target) {
            ("includes", Operand::Array(_) | Operand::Str(_)) => {
                let needle = args.first().cloned().unwrap_or(Operand::Undefined);
                Ok(Operand::Bool(self.contains(target, &needle, false)?))
            }
            _ => Err(ExprError::UnknownMethod(method.to_string())),
        }
    }
}

fn member(target: &Operand, property: &str) -> Result<Operand, ExprError> {
    match (target, property) {
        (Operand::Undefined | Operand::Null, _) => Err(ExprError::TypeError {
            property: property.to_string(),
            target: target.type_name(),
        }),
        (Operand::Array(items), "length") => Ok(Operand::Number(items.len() as f64)),
        (Operand::Str(text), "length") => Ok(Operand::Number(text.chars().count() as f64)),
        _ => Ok(Operand::Undefined),
    }
}

fn element(target: &Operand, index: &Operand) -> Result<Operand, ExprError> {
    if target.is_nullish() {
        return Err(ExprError::TypeError {
            property: index.to_display(),
            target: target.type_name(),
        });
    }
    let position = match index {
        Operand::Number(number) if *number >= 0.0 && number.fract() == 0.0 => *number as usize,
        _ => return Ok(Operand::Undefined),
    };
    let found = match target {
        Operand::Array(items) => items.get(position).cloned(),
        Operand::Str(text) => text
            .chars()
            .nth(position)
            .map(|ch| Operand::Str(ch.to_string())),
        _ => None,
    };
    Ok(found.unwrap_or(Operand::Undefined))
}
