use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::answers::AnswerMap;
use crate::expr::{EvalLimits, Expr, ExprError, Operand, Scope};
use crate::spec::{FieldOption, FieldSpec, FormSpec};

pub type VisibilityMap = BTreeMap<String, bool>;

/// Receives expression failures; the affected field or option stays visible.
pub trait VisibilityObserver {
    fn expression_failed(&mut self, field: &str, source: &str, error: &ExprError);
}

/// Default observer: logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VisibilityObserver for TracingObserver {
    fn expression_failed(&mut self, field: &str, source: &str, error: &ExprError) {
        tracing::warn!(
            field = %field,
            expression = %source,
            error = %error,
            "visibility expression failed; showing field"
        );
    }
}

/// Collects failures in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub failures: Vec<(String, ExprError)>,
}

impl VisibilityObserver for RecordingObserver {
    fn expression_failed(&mut self, field: &str, _source: &str, error: &ExprError) {
        self.failures.push((field.to_string(), error.clone()));
    }
}

/// Shares one observer between the engine and its owner.
impl<O: VisibilityObserver> VisibilityObserver for Rc<RefCell<O>> {
    fn expression_failed(&mut self, field: &str, source: &str, error: &ExprError) {
        self.borrow_mut().expression_failed(field, source, error);
    }
}

type Compiled = Option<(String, Result<Expr, ExprError>)>;

fn compile(source: Option<&str>, limits: &EvalLimits) -> Compiled {
    source.map(|source| (source.to_string(), Expr::parse_with(source, limits)))
}

/// Visibility expressions of one form, parsed once per configuration load.
#[derive(Debug, Clone)]
pub struct VisibilityPlan {
    limits: EvalLimits,
    fields: Vec<Compiled>,
    options: Vec<Vec<Compiled>>,
}

impl VisibilityPlan {
    pub fn new(spec: &FormSpec, limits: EvalLimits) -> Self {
        let fields = spec
            .fields
            .iter()
            .map(|field| compile(field.visible_if.as_deref(), &limits))
            .collect();
        let options = spec
            .fields
            .iter()
            .map(|field| {
                field
                    .options
                    .iter()
                    .map(|option| compile(option.visible.as_deref(), &limits))
                    .collect()
            })
            .collect();
        Self {
            limits,
            fields,
            options,
        }
    }

    pub fn limits(&self) -> &EvalLimits {
        &self.limits
    }

    /// Indices of the visible fields, in declaration order.
    ///
    /// A field's expression only sees fields accepted before it; anything
    /// else resolves to `undefined`.
    pub fn resolve(
        &self,
        spec: &FormSpec,
        answers: &AnswerMap,
        observer: &mut dyn VisibilityObserver,
    ) -> Vec<usize> {
        let mut accepted: Vec<usize> = Vec::with_capacity(spec.fields.len());
        for (index, field) in spec.fields.iter().enumerate() {
            let visible = match self.fields.get(index).and_then(Option::as_ref) {
                None => true,
                Some(compiled) => {
                    let scope = AcceptedScope {
                        spec,
                        answers,
                        accepted: &accepted,
                    };
                    self.test(compiled, &field.name, &scope, observer)
                }
            };
            if visible {
                accepted.push(index);
            }
        }
        accepted
    }

    /// Options of the field at `field_index` whose own conditions hold.
    ///
    /// `visible` is the output of [`VisibilityPlan::resolve`] for the same
    /// answers; option conditions see the fields accepted before their owner.
    pub fn visible_options<'s>(
        &self,
        spec: &'s FormSpec,
        answers: &AnswerMap,
        visible: &[usize],
        field_index: usize,
        observer: &mut dyn VisibilityObserver,
    ) -> Vec<&'s FieldOption> {
        let Some(field) = spec.fields.get(field_index) else {
            return Vec::new();
        };
        let before = visible.partition_point(|index| *index < field_index);
        let scope = AcceptedScope {
            spec,
            answers,
            accepted: &visible[..before],
        };
        field
            .options
            .iter()
            .enumerate()
            .filter(|(option_index, _)| {
                match self
                    .options
                    .get(field_index)
                    .and_then(|options| options.get(*option_index))
                    .and_then(Option::as_ref)
                {
                    None => true,
                    Some(compiled) => self.test(compiled, &field.name, &scope, observer),
                }
            })
            .map(|(_, option)| option)
            .collect()
    }

    fn test(
        &self,
        compiled: &(String, Result<Expr, ExprError>),
        field: &str,
        scope: &AcceptedScope<'_>,
        observer: &mut dyn VisibilityObserver,
    ) -> bool {
        let (source, parsed) = compiled;
        let outcome = match parsed {
            Ok(expr) => expr.test(scope, &self.limits),
            Err(error) => Err(error.clone()),
        };
        match outcome {
            Ok(visible) => visible,
            Err(error) => {
                observer.expression_failed(field, source, &error);
                true
            }
        }
    }
}

/// Lookup restricted to fields already accepted into the visible list.
struct AcceptedScope<'a> {
    spec: &'a FormSpec,
    answers: &'a AnswerMap,
    accepted: &'a [usize],
}

impl Scope for AcceptedScope<'_> {
    fn lookup(&self, name: &str) -> Option<Operand> {
        let accepted = || {
            self.accepted
                .iter()
                .filter_map(|index| self.spec.fields.get(*index))
        };
        let wanted = name.to_lowercase();
        accepted()
            .find(|field| field.name == name)
            .or_else(|| accepted().find(|field| field.name.to_lowercase() == wanted))
            .and_then(|field| self.answers.get(&field.name))
            .map(Operand::from)
    }
}

/// Visible fields for `answers`, logging expression failures.
pub fn resolve_visible<'a>(spec: &'a FormSpec, answers: &AnswerMap) -> Vec<&'a FieldSpec> {
    let plan = VisibilityPlan::new(spec, EvalLimits::default());
    plan.resolve(spec, answers, &mut TracingObserver)
        .into_iter()
        .filter_map(|index| spec.fields.get(index))
        .collect()
}

/// Visibility flag for every field of the form.
pub fn resolve_visibility(spec: &FormSpec, answers: &AnswerMap) -> VisibilityMap {
    let plan = VisibilityPlan::new(spec, EvalLimits::default());
    let visible = plan.resolve(spec, answers, &mut TracingObserver);
    spec.fields
        .iter()
        .enumerate()
        .map(|(index, field)| (field.name.clone(), visible.contains(&index)))
        .collect()
}
