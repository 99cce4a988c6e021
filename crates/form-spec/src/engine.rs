use thiserror::Error;

use crate::answers::{AnswerMap, initial_answers};
use crate::dispatch::{AnswerError, FieldControl, FieldInput, apply_input, check_shape};
use crate::expr::EvalLimits;
use crate::spec::{FieldOption, FieldSpec, FormId, FormSpec};
use crate::validate::{AnswerReport, check_answers};
use crate::value::AnswerValue;
use crate::visibility::{TracingObserver, VisibilityObserver, VisibilityPlan};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Answers handed to the submit hook.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub form_id: FormId,
    /// Answers of the visible fields only.
    pub answers: AnswerMap,
    pub visible: Vec<String>,
    /// Advisory: required and validator findings never block submission.
    pub report: AnswerReport,
}

pub type SubmitResult = Result<Submission, SubmitError>;

/// Extension point invoked by [`FormEngine::submit`].
pub trait SubmitHook {
    fn submit(&mut self, submission: &Submission) -> Result<(), SubmitError>;
}

impl<F> SubmitHook for F
where
    F: FnMut(&Submission) -> Result<(), SubmitError>,
{
    fn submit(&mut self, submission: &Submission) -> Result<(), SubmitError> {
        self(submission)
    }
}

/// Owns the answers and the step cursor of one form.
///
/// Every mutation recomputes the visible field sequence and reclamps the
/// cursor. The engine is single-threaded; callers serialize access.
pub struct FormEngine {
    spec: FormSpec,
    plan: VisibilityPlan,
    answers: AnswerMap,
    visible: Vec<usize>,
    cursor: usize,
    observer: Box<dyn VisibilityObserver>,
    submit_hook: Option<Box<dyn SubmitHook>>,
}

impl FormEngine {
    pub fn new(spec: FormSpec) -> Self {
        let limits = EvalLimits::default();
        let plan = VisibilityPlan::new(&spec, limits);
        let answers = initial_answers(&spec, &limits);
        let mut engine = Self {
            spec,
            plan,
            answers,
            visible: Vec::new(),
            cursor: 0,
            observer: Box::new(TracingObserver),
            submit_hook: None,
        };
        engine.recompute();
        engine
    }

    pub fn with_observer(mut self, observer: impl VisibilityObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self.recompute();
        self
    }

    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.plan = VisibilityPlan::new(&self.spec, limits);
        self.answers = initial_answers(&self.spec, &limits);
        self.cursor = 0;
        self.recompute();
        self
    }

    pub fn with_submit_hook(mut self, hook: impl SubmitHook + 'static) -> Self {
        self.submit_hook = Some(Box::new(hook));
        self
    }

    /// Replaces the configuration and resets every answer and the cursor.
    pub fn load(&mut self, spec: FormSpec) {
        let limits = *self.plan.limits();
        self.plan = VisibilityPlan::new(&spec, limits);
        self.answers = initial_answers(&spec, &limits);
        self.spec = spec;
        self.cursor = 0;
        self.recompute();
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answer(&self, name: &str) -> Option<&AnswerValue> {
        self.answers.get(name)
    }

    pub fn visible_fields(&self) -> Vec<&FieldSpec> {
        self.visible
            .iter()
            .filter_map(|index| self.spec.fields.get(*index))
            .collect()
    }

    pub fn visible_names(&self) -> Vec<&str> {
        self.visible_fields()
            .into_iter()
            .map(|field| field.name.as_str())
            .collect()
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.spec
            .position(name)
            .map(|index| self.visible.contains(&index))
            .unwrap_or(false)
    }

    /// Options of `name` whose own display conditions currently hold.
    pub fn visible_options(&mut self, name: &str) -> Vec<&FieldOption> {
        let Some(index) = self.spec.position(name) else {
            return Vec::new();
        };
        self.plan.visible_options(
            &self.spec,
            &self.answers,
            &self.visible,
            index,
            self.observer.as_mut(),
        )
    }

    pub fn current_step(&self) -> usize {
        self.cursor
    }

    pub fn step_count(&self) -> usize {
        self.visible.len()
    }

    pub fn current_field(&self) -> Option<&FieldSpec> {
        self.visible
            .get(self.cursor)
            .and_then(|index| self.spec.fields.get(*index))
    }

    pub fn current_value(&self) -> Option<&AnswerValue> {
        self.current_field()
            .and_then(|field| self.answers.get(&field.name))
    }

    pub fn current_control(&self) -> Option<FieldControl> {
        self.current_field().map(FieldControl::for_field)
    }

    pub fn is_submit_step(&self) -> bool {
        !self.visible.is_empty() && self.cursor == self.visible.len() - 1
    }

    /// Replaces the answer of `name` after checking it fits the field kind.
    pub fn set_answer(&mut self, name: &str, value: AnswerValue) -> Result<(), AnswerError> {
        let field = self.field(name)?;
        let value = check_shape(field, value)?;
        self.answers.insert(name, value);
        self.recompute();
        Ok(())
    }

    /// Applies a UI input to `name`. Returns whether the cursor advanced.
    ///
    /// Only an input to the current field can move the cursor.
    pub fn input(&mut self, name: &str, input: FieldInput) -> Result<bool, AnswerError> {
        let field = self.field(name)?;
        let current = self.answers.get(name).cloned().unwrap_or_default();
        let applied = apply_input(field, &current, &input)?;
        let was_current = self.current_field().is_some_and(|field| field.name == name);
        self.answers.insert(name, applied.value);
        self.recompute();
        if !applied.advance || !was_current {
            return Ok(false);
        }
        let before = self.cursor;
        self.advance();
        Ok(self.cursor != before)
    }

    pub fn advance(&mut self) {
        if self.cursor + 1 < self.visible.len() {
            self.cursor += 1;
            tracing::debug!(step = self.cursor, "advanced");
        }
    }

    /// Moves one step back; `false` means the cursor was already at the start.
    pub fn retreat(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        tracing::debug!(step = self.cursor, "retreated");
        true
    }

    pub fn submit(&mut self) -> SubmitResult {
        let visible = self
            .visible_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let submission = Submission {
            form_id: self.spec.id.clone(),
            answers: self.answers.restricted_to(visible.iter().map(String::as_str)),
            report: check_answers(&self.spec, &self.answers, &visible, self.plan.limits()),
            visible,
        };
        if let Some(hook) = self.submit_hook.as_mut() {
            hook.submit(&submission)?;
        }
        tracing::debug!(form = %submission.form_id, "form submitted");
        Ok(submission)
    }

    fn field(&self, name: &str) -> Result<&FieldSpec, AnswerError> {
        self.spec
            .field(name)
            .ok_or_else(|| AnswerError::UnknownField(name.to_string()))
    }

    fn recompute(&mut self) {
        self.visible = self
            .plan
            .resolve(&self.spec, &self.answers, self.observer.as_mut());
        self.cursor = self.cursor.min(self.visible.len().saturating_sub(1));
        tracing::debug!(
            form = %self.spec.id,
            visible = self.visible.len(),
            step = self.cursor,
            "recomputed visible fields"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::FieldKind;

    fn three_step_form() -> FormSpec {
        FormSpec::new(
            "three",
            vec![
                FieldSpec::new("first", "First", FieldKind::Radio).with_options(vec![
                    FieldOption::new("Short", "short"),
                    FieldOption::new("Long", "long"),
                ]),
                FieldSpec::new("second", "Second", FieldKind::Text)
                    .with_visible_if("$first == 'long'"),
                FieldSpec::new("third", "Third", FieldKind::Text),
            ],
        )
    }

    #[test]
    fn navigation_is_clamped() {
        let mut engine = FormEngine::new(three_step_form());
        assert_eq!(engine.step_count(), 2);
        assert!(!engine.retreat());
        engine.advance();
        engine.advance();
        engine.advance();
        assert_eq!(engine.current_step(), 1);
        assert!(engine.is_submit_step());
        assert!(engine.retreat());
        assert_eq!(engine.current_step(), 0);
    }

    #[test]
    fn cursor_is_reclamped_when_fields_disappear() {
        let mut engine = FormEngine::new(three_step_form());
        engine.set_answer("first", AnswerValue::text("long")).unwrap();
        engine.advance();
        engine.advance();
        assert_eq!(engine.current_step(), 2);
        assert_eq!(engine.current_field().unwrap().name, "third");

        engine.set_answer("first", AnswerValue::text("short")).unwrap();
        assert_eq!(engine.visible_names(), vec!["first", "third"]);
        assert_eq!(engine.current_step(), 1);
    }

    #[test]
    fn radio_selection_advances() {
        let mut engine = FormEngine::new(three_step_form());
        let advanced = engine
            .input("first", FieldInput::Choose("long".into()))
            .unwrap();
        assert!(advanced);
        assert_eq!(engine.current_field().unwrap().name, "second");
    }

    #[test]
    fn choosing_off_step_does_not_move_the_cursor() {
        let mut engine = FormEngine::new(three_step_form());
        engine.advance();
        assert_eq!(engine.current_field().unwrap().name, "third");
        let advanced = engine
            .input("first", FieldInput::Choose("long".into()))
            .unwrap();
        assert!(!advanced);
        assert_eq!(engine.current_field().unwrap().name, "second");
        assert_eq!(engine.current_step(), 1);
    }

    #[test]
    fn rejected_writes_leave_answers_untouched() {
        let mut engine = FormEngine::new(three_step_form());
        let before = engine.answers().clone();
        assert_eq!(
            engine.set_answer("nope", AnswerValue::text("x")),
            Err(AnswerError::UnknownField("nope".into()))
        );
        assert!(engine.set_answer("third", AnswerValue::Bool(true)).is_err());
        assert_eq!(engine.answers(), &before);
    }

    #[test]
    fn empty_forms_have_no_current_field() {
        let mut engine = FormEngine::new(FormSpec::new("empty", vec![]));
        assert!(engine.current_field().is_none());
        assert!(!engine.is_submit_step());
        engine.advance();
        assert_eq!(engine.current_step(), 0);
        assert!(!engine.retreat());
    }

    #[test]
    fn load_resets_answers_and_cursor() {
        let mut engine = FormEngine::new(three_step_form());
        engine.set_answer("third", AnswerValue::text("kept?")).unwrap();
        engine.advance();
        engine.load(three_step_form());
        assert_eq!(engine.current_step(), 0);
        assert_eq!(engine.answer("third"), Some(&AnswerValue::text("")));
    }

    #[test]
    fn submit_passes_visible_answers_to_hook() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut engine = FormEngine::new(three_step_form()).with_submit_hook(
            move |submission: &Submission| -> Result<(), SubmitError> {
                sink.borrow_mut().extend(submission.visible.clone());
                Ok(())
            },
        );
        let submission = engine.submit().unwrap();
        assert_eq!(submission.answers.len(), 2);
        assert!(submission.answers.get("second").is_none());
        assert_eq!(*seen.borrow(), vec!["first", "third"]);
    }

    #[test]
    fn hook_errors_are_returned() {
        let mut engine = FormEngine::new(three_step_form()).with_submit_hook(
            |_: &Submission| -> Result<(), SubmitError> {
                Err(SubmitError::Rejected("offline".into()))
            },
        );
        assert!(matches!(engine.submit(), Err(SubmitError::Rejected(_))));
    }
}
