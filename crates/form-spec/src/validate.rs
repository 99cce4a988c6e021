use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerMap;
use crate::expr::{EvalLimits, Expr, Operand, evaluate_condition};
use crate::spec::{FieldSpec, Flag, FormSpec};
use crate::value::{AnswerValue, parse_number};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    pub code: String,
}

/// Outcome of linting a form configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Advisory findings about the answers of the visible fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerReport {
    pub complete: bool,
    pub missing_required: Vec<String>,
    pub errors: Vec<ValidationError>,
}

/// Lints a configuration: names, options, expressions, validators, defaults.
pub fn validate(spec: &FormSpec) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();

    for (index, field) in spec.fields.iter().enumerate() {
        if field.name.trim().is_empty() {
            errors.push(base_error(field, "field name is empty", "empty_name"));
        } else if !seen.insert(field.name.to_lowercase()) {
            errors.push(base_error(
                field,
                &format!("field name '{}' is used more than once", field.name),
                "duplicate_name",
            ));
        }

        if field.kind.uses_options() && field.options.is_empty() {
            errors.push(base_error(
                field,
                &format!("{} field has no options", field.kind.as_str()),
                "missing_options",
            ));
        }

        let mut option_values = BTreeSet::new();
        for option in &field.options {
            if !option_values.insert(option.value.as_str()) {
                errors.push(base_error(
                    field,
                    &format!("option value '{}' is used more than once", option.value),
                    "duplicate_option",
                ));
            }
            if field.is_numeric && parse_number(&option.value).is_none() {
                errors.push(base_error(
                    field,
                    &format!("option value '{}' is not numeric", option.value),
                    "invalid_option",
                ));
            }
        }

        if let Some(source) = &field.visible_if {
            lint_expression(spec, index, field, "visibleIf", source, &mut errors);
        }
        if let Some(source) = field.required.expression() {
            lint_expression(spec, index, field, "required", source, &mut errors);
        }
        for option in &field.options {
            if let Some(source) = &option.visible {
                lint_expression(spec, index, field, "option visible", source, &mut errors);
            }
            if let Some(source) = option.is_selected.as_ref().and_then(Flag::expression)
                && let Err(error) = Expr::parse(source)
            {
                errors.push(base_error(
                    field,
                    &format!("isSelected of option '{}': {}", option.value, error),
                    "invalid_expression",
                ));
            }
        }

        if let Some(pattern) = &field.validator
            && let Err(error) = Regex::new(pattern)
        {
            errors.push(base_error(
                field,
                &format!("validator is not a valid pattern: {}", error),
                "invalid_validator",
            ));
        }

        if let Some(default) = &field.default_value {
            if field.is_numeric && parse_number(default).is_none() {
                errors.push(base_error(
                    field,
                    &format!("default '{}' is not numeric", default),
                    "invalid_default",
                ));
            }
            if field.kind.uses_options() && field.option(default).is_none() {
                errors.push(base_error(
                    field,
                    &format!("default '{}' is not one of the options", default),
                    "default_not_in_options",
                ));
            }
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

// Only fields declared before `index` can ever be in scope for its expressions.
fn lint_expression(
    spec: &FormSpec,
    index: usize,
    field: &FieldSpec,
    what: &str,
    source: &str,
    errors: &mut Vec<ValidationError>,
) {
    let expr = match Expr::parse(source) {
        Ok(expr) => expr,
        Err(error) => {
            errors.push(base_error(
                field,
                &format!("{} expression: {}", what, error),
                "invalid_expression",
            ));
            return;
        }
    };

    for reference in expr.references() {
        let wanted = reference.to_lowercase();
        match spec
            .fields
            .iter()
            .position(|candidate| candidate.name.to_lowercase() == wanted)
        {
            None => errors.push(base_error(
                field,
                &format!("{} expression references unknown field '{}'", what, reference),
                "unknown_reference",
            )),
            Some(position) if position >= index => errors.push(base_error(
                field,
                &format!(
                    "{} expression references '{}', which is not declared before it",
                    what, reference
                ),
                "forward_reference",
            )),
            Some(_) => {}
        }
    }
}

/// Checks required flags and validators of the visible fields.
///
/// String `required` flags are conditions over the visible fields declared
/// before the field; a failing condition counts as required.
pub fn check_answers(
    spec: &FormSpec,
    answers: &AnswerMap,
    visible: &[String],
    limits: &EvalLimits,
) -> AnswerReport {
    let mut missing_required = Vec::new();
    let mut errors = Vec::new();
    let mut scope: BTreeMap<String, Operand> = BTreeMap::new();

    for field in spec
        .fields
        .iter()
        .filter(|field| visible.iter().any(|name| name == &field.name))
    {
        let value = answers.get(&field.name).cloned().unwrap_or_default();

        let required = match &field.required {
            Flag::Bool(flag) => *flag,
            Flag::Expression(source) => match evaluate_condition(source, &scope, limits) {
                Ok(flag) => flag,
                Err(error) => {
                    tracing::warn!(field = %field.name, error = %error, "required condition failed");
                    true
                }
            },
        };
        if required && !value.is_filled() {
            missing_required.push(field.name.clone());
        }

        if let Some(pattern) = &field.validator
            && let AnswerValue::Text(text) = &value
            && !text.is_empty()
            && let Ok(regex) = Regex::new(pattern)
            && !regex.is_match(text)
        {
            errors.push(base_error(
                field,
                "value does not match validator",
                "pattern_mismatch",
            ));
        }

        scope.insert(field.name.clone(), Operand::from(&value));
    }

    AnswerReport {
        complete: missing_required.is_empty() && errors.is_empty(),
        missing_required,
        errors,
    }
}

fn base_error(field: &FieldSpec, message: &str, code: &str) -> ValidationError {
    ValidationError {
        field: Some(field.name.clone()),
        message: message.into(),
        code: code.into(),
    }
}
