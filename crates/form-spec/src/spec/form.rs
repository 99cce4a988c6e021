use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::field::FieldSpec;

/// Form identifier; configuration documents use either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FormId {
    Number(i64),
    Text(String),
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormId::Number(number) => write!(f, "{}", number),
            FormId::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<&str> for FormId {
    fn from(value: &str) -> Self {
        FormId::Text(value.to_string())
    }
}

impl From<i64> for FormId {
    fn from(value: i64) -> Self {
        FormId::Number(value)
    }
}

#[derive(Debug, Error)]
pub enum FormSpecError {
    #[error("failed to parse form configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level form definition. Field order is the step order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    #[serde(alias = "formID")]
    pub id: FormId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Label for the submit action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn new(id: impl Into<FormId>, fields: Vec<FieldSpec>) -> Self {
        Self {
            id: id.into(),
            title: None,
            submit: None,
            fields,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, FormSpecError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Form {}", self.id))
    }
}
