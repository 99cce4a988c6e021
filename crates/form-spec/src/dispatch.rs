//! Per-kind value semantics for field inputs.
//!
//! A UI collaborator asks [`FieldControl::for_field`] which control to show,
//! sends [`FieldInput`]s back, and the engine applies them through
//! [`apply_input`]. Every input touches only the answer of its own field.

use thiserror::Error;

use crate::answers::{empty_list, no_selection};
use crate::spec::{FieldKind, FieldOption, FieldSpec};
use crate::value::{AnswerValue, parse_number};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("field '{0}' is not part of the form")]
    UnknownField(String),
    #[error("field '{field}' ({kind}) expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        kind: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("'{value}' is not an option of field '{field}'")]
    UnknownOption { field: String, value: String },
    #[error("'{value}' is not a number (field '{field}')")]
    InvalidNumber { field: String, value: String },
    #[error("{input} input is not supported by {kind} field '{field}'")]
    UnsupportedInput {
        field: String,
        kind: &'static str,
        input: &'static str,
    },
}

/// Capability contract the UI control of a field must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldControl {
    /// Free text; `numeric` fields store numbers.
    TextEntry { numeric: bool, long: bool },
    /// One option at a time. Radio buttons commit and advance on selection.
    SingleChoice {
        advance_on_select: bool,
        clearable: bool,
    },
    /// Single-option checkbox: a boolean flag.
    Toggle,
    /// Ordered membership list; multiselect adds a label filter.
    MultiToggle { filterable: bool },
}

impl FieldControl {
    pub fn for_field(field: &FieldSpec) -> Self {
        match field.kind {
            FieldKind::Text => FieldControl::TextEntry {
                numeric: field.is_numeric,
                long: field.is_long,
            },
            FieldKind::Radio => FieldControl::SingleChoice {
                advance_on_select: true,
                clearable: false,
            },
            FieldKind::Select => FieldControl::SingleChoice {
                advance_on_select: false,
                clearable: true,
            },
            FieldKind::Checkbox if field.is_single_checkbox() => FieldControl::Toggle,
            FieldKind::Checkbox => FieldControl::MultiToggle { filterable: false },
            FieldKind::MultiSelect => FieldControl::MultiToggle { filterable: true },
        }
    }
}

/// A value change reported by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    Number(f64),
    Choose(String),
    Toggle(String),
    Clear,
}

impl FieldInput {
    fn label(&self) -> &'static str {
        match self {
            FieldInput::Text(_) => "text",
            FieldInput::Number(_) => "number",
            FieldInput::Choose(_) => "choose",
            FieldInput::Toggle(_) => "toggle",
            FieldInput::Clear => "clear",
        }
    }
}

/// Result of applying an input: the new answer and whether the step moves on.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub value: AnswerValue,
    pub advance: bool,
}

impl Applied {
    fn stay(value: AnswerValue) -> Self {
        Self {
            value,
            advance: false,
        }
    }
}

/// Computes the new answer of `field` for `input`, given its current value.
pub fn apply_input(
    field: &FieldSpec,
    current: &AnswerValue,
    input: &FieldInput,
) -> Result<Applied, AnswerError> {
    let control = FieldControl::for_field(field);
    match (control, input) {
        (FieldControl::TextEntry { numeric: false, .. }, FieldInput::Text(raw)) => {
            Ok(Applied::stay(AnswerValue::Text(raw.clone())))
        }
        (FieldControl::TextEntry { numeric: true, .. }, FieldInput::Text(raw)) => {
            if raw.trim().is_empty() {
                return Ok(Applied::stay(AnswerValue::Unset));
            }
            parse_number(raw)
                .map(|number| Applied::stay(AnswerValue::Number(number)))
                .ok_or_else(|| AnswerError::InvalidNumber {
                    field: field.name.clone(),
                    value: raw.clone(),
                })
        }
        (FieldControl::TextEntry { numeric: true, .. }, FieldInput::Number(number)) => {
            finite(field, *number).map(|number| Applied::stay(AnswerValue::Number(number)))
        }
        (FieldControl::TextEntry { numeric, .. }, FieldInput::Clear) => Ok(Applied::stay(if numeric {
            AnswerValue::Unset
        } else {
            AnswerValue::Text(String::new())
        })),
        (FieldControl::SingleChoice { advance_on_select, .. }, FieldInput::Choose(value)) => {
            let option = find_option(field, value)?;
            Ok(Applied {
                value: option_value(field, option)?,
                advance: advance_on_select,
            })
        }
        (FieldControl::SingleChoice { clearable: true, .. }, FieldInput::Clear) => {
            Ok(Applied::stay(no_selection(field)))
        }
        (FieldControl::Toggle, FieldInput::Toggle(value)) => {
            find_option(field, value)?;
            let selected = current.as_bool().unwrap_or(false);
            Ok(Applied::stay(AnswerValue::Bool(!selected)))
        }
        (FieldControl::MultiToggle { .. }, FieldInput::Toggle(value)) => {
            let option = find_option(field, value)?;
            let toggled = option_value(field, option)?;
            Ok(Applied::stay(toggle_membership(field, current, toggled)))
        }
        (FieldControl::MultiToggle { .. }, FieldInput::Clear) => Ok(Applied::stay(empty_list(field))),
        (_, input) => Err(AnswerError::UnsupportedInput {
            field: field.name.clone(),
            kind: field.kind.as_str(),
            input: input.label(),
        }),
    }
}

// Removes the value when present, otherwise appends it at the end.
fn toggle_membership(field: &FieldSpec, current: &AnswerValue, toggled: AnswerValue) -> AnswerValue {
    match (current, toggled) {
        (AnswerValue::NumberList(values), AnswerValue::Number(number)) => {
            let mut values = values.clone();
            match values.iter().position(|entry| *entry == number) {
                Some(position) => {
                    values.remove(position);
                }
                None => values.push(number),
            }
            AnswerValue::NumberList(values)
        }
        (AnswerValue::TextList(values), AnswerValue::Text(text)) => {
            let mut values = values.clone();
            match values.iter().position(|entry| *entry == text) {
                Some(position) => {
                    values.remove(position);
                }
                None => values.push(text),
            }
            AnswerValue::TextList(values)
        }
        (_, toggled) => match toggled {
            AnswerValue::Number(number) => AnswerValue::NumberList(vec![number]),
            AnswerValue::Text(text) => AnswerValue::TextList(vec![text]),
            _ => empty_list(field),
        },
    }
}

fn find_option<'a>(field: &'a FieldSpec, value: &str) -> Result<&'a FieldOption, AnswerError> {
    field.option(value).ok_or_else(|| AnswerError::UnknownOption {
        field: field.name.clone(),
        value: value.to_string(),
    })
}

fn option_value(field: &FieldSpec, option: &FieldOption) -> Result<AnswerValue, AnswerError> {
    if !field.is_numeric {
        return Ok(AnswerValue::Text(option.value.clone()));
    }
    parse_number(&option.value)
        .map(AnswerValue::Number)
        .ok_or_else(|| AnswerError::InvalidNumber {
            field: field.name.clone(),
            value: option.value.clone(),
        })
}

/// Whether `option` is currently selected in `current`.
pub fn option_selected(field: &FieldSpec, current: &AnswerValue, option: &FieldOption) -> bool {
    if field.is_single_checkbox() {
        return current.as_bool().unwrap_or(false);
    }
    current.contains_option(&option.value)
}

/// Case-insensitive label filter for the option display list.
pub fn filter_options<'a>(
    options: impl IntoIterator<Item = &'a FieldOption>,
    query: &str,
) -> Vec<&'a FieldOption> {
    let needle = query.trim().to_lowercase();
    options
        .into_iter()
        .filter(|option| needle.is_empty() || option.label.to_lowercase().contains(&needle))
        .collect()
}

fn shape_name(value: &AnswerValue) -> &'static str {
    match value {
        AnswerValue::Unset => "unset",
        AnswerValue::Bool(_) => "boolean",
        AnswerValue::Number(_) => "number",
        AnswerValue::Text(_) => "text",
        AnswerValue::NumberList(_) => "number list",
        AnswerValue::TextList(_) => "text list",
    }
}

/// Validates a wholesale write against the field kind and normalizes it.
///
/// Empty lists of either element type are accepted for list fields and
/// stored with the field's own element type.
pub fn check_shape(field: &FieldSpec, value: AnswerValue) -> Result<AnswerValue, AnswerError> {
    let mismatch = |expected: &'static str, value: &AnswerValue| AnswerError::TypeMismatch {
        field: field.name.clone(),
        kind: field.kind.as_str(),
        expected,
        found: shape_name(value),
    };

    if field.is_single_checkbox() {
        return match value {
            AnswerValue::Bool(_) => Ok(value),
            other => Err(mismatch("a boolean", &other)),
        };
    }

    if field.is_multi_value() {
        let expected = if field.is_numeric {
            "a number list"
        } else {
            "a text list"
        };
        return match (field.is_numeric, value) {
            (_, AnswerValue::NumberList(values)) if values.is_empty() => Ok(empty_list(field)),
            (_, AnswerValue::TextList(values)) if values.is_empty() => Ok(empty_list(field)),
            (true, AnswerValue::NumberList(values)) => {
                for number in &values {
                    finite(field, *number)?;
                    ensure_option(field, |option| parse_number(&option.value) == Some(*number), || {
                        number.to_string()
                    })?;
                }
                Ok(AnswerValue::NumberList(values))
            }
            (false, AnswerValue::TextList(values)) => {
                for text in &values {
                    ensure_option(field, |option| option.value == *text, || text.clone())?;
                }
                Ok(AnswerValue::TextList(values))
            }
            (_, other) => Err(mismatch(expected, &other)),
        };
    }

    let choice = field.kind.uses_options();
    match (field.is_numeric, value) {
        (true, AnswerValue::Unset) => Ok(AnswerValue::Unset),
        (false, AnswerValue::Unset) if choice => Ok(no_selection(field)),
        (true, AnswerValue::Number(number)) => {
            finite(field, number)?;
            if choice {
                ensure_option(field, |option| parse_number(&option.value) == Some(number), || {
                    number.to_string()
                })?;
            }
            Ok(AnswerValue::Number(number))
        }
        (false, AnswerValue::Text(text)) => {
            if choice && !text.is_empty() {
                ensure_option(field, |option| option.value == text, || text.clone())?;
            }
            Ok(AnswerValue::Text(text))
        }
        (true, other) => Err(mismatch("a number", &other)),
        (false, other) => Err(mismatch("text", &other)),
    }
}

// NaN and infinities never enter the answer map; `Unset` means "no number".
fn finite(field: &FieldSpec, number: f64) -> Result<f64, AnswerError> {
    if number.is_finite() {
        Ok(number)
    } else {
        Err(AnswerError::InvalidNumber {
            field: field.name.clone(),
            value: number.to_string(),
        })
    }
}

fn ensure_option(
    field: &FieldSpec,
    matches: impl Fn(&FieldOption) -> bool,
    describe: impl FnOnce() -> String,
) -> Result<(), AnswerError> {
    if field.options.iter().any(matches) {
        Ok(())
    } else {
        Err(AnswerError::UnknownOption {
            field: field.name.clone(),
            value: describe(),
        })
    }
}
