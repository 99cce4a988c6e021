use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current answer of a single field.
///
/// `Unset` is the explicit "no value yet" state used by numeric and choice
/// fields; it serializes as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(untagged)]
pub enum AnswerValue {
    #[default]
    Unset,
    Bool(bool),
    Number(f64),
    Text(String),
    NumberList(Vec<f64>),
    TextList(Vec<String>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, AnswerValue::Unset)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, AnswerValue::NumberList(_) | AnswerValue::TextList(_))
    }

    /// Whether the answer counts as provided for required-field reporting.
    pub fn is_filled(&self) -> bool {
        match self {
            AnswerValue::Unset => false,
            AnswerValue::Bool(flag) => *flag,
            AnswerValue::Number(number) => !number.is_nan(),
            AnswerValue::Text(text) => !text.trim().is_empty(),
            AnswerValue::NumberList(values) => !values.is_empty(),
            AnswerValue::TextList(values) => !values.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnswerValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnswerValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Whether `value` is part of the answer: equal scalar or list member.
    pub fn contains_option(&self, value: &str) -> bool {
        match self {
            AnswerValue::Text(text) => text == value,
            AnswerValue::Number(number) => parse_number(value) == Some(*number),
            AnswerValue::TextList(values) => values.iter().any(|entry| entry == value),
            AnswerValue::NumberList(values) => parse_number(value)
                .map(|parsed| values.contains(&parsed))
                .unwrap_or(false),
            AnswerValue::Bool(_) | AnswerValue::Unset => false,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Unset => Ok(()),
            AnswerValue::Bool(flag) => write!(f, "{}", flag),
            AnswerValue::Number(number) => write!(f, "{}", number),
            AnswerValue::Text(text) => write!(f, "{}", text),
            AnswerValue::NumberList(values) => {
                let parts = values.iter().map(f64::to_string).collect::<Vec<_>>();
                write!(f, "{}", parts.join(", "))
            }
            AnswerValue::TextList(values) => write!(f, "{}", values.join(", ")),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Bool(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

/// Parses a numeric answer the way numeric inputs accept it.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}
