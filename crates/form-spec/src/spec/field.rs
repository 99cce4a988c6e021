use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Supported field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Radio,
    Checkbox,
    Select,
    MultiSelect,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Select => "select",
            FieldKind::MultiSelect => "multiselect",
        }
    }

    /// Kinds whose values come from the `options` list.
    pub fn uses_options(&self) -> bool {
        !matches!(self, FieldKind::Text)
    }
}

/// A boolean that configuration may also express as an expression string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Expression(String),
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Bool(false)
    }
}

impl Flag {
    pub fn is_false(&self) -> bool {
        matches!(self, Flag::Bool(false))
    }

    pub fn expression(&self) -> Option<&str> {
        match self {
            Flag::Expression(source) => Some(source),
            Flag::Bool(_) => None,
        }
    }
}

/// One selectable entry of a choice field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_selected: Option<Flag>,
    /// Display condition for this option, same syntax as `visibleIf`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<String>,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            is_selected: None,
            visible: None,
        }
    }
}

/// Static description of a single form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, alias = "isReuired", skip_serializing_if = "Flag::is_false")]
    pub required: Flag,
    #[serde(default, alias = "visible", skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub is_numeric: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_long: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Regex pattern checked against text answers on submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_type: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: Flag::default(),
            visible_if: None,
            options: Vec::new(),
            is_numeric: false,
            default_value: None,
            is_long: false,
            placeholder: None,
            validator: None,
            prefill: None,
            text_type: None,
        }
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_visible_if(mut self, expression: impl Into<String>) -> Self {
        self.visible_if = Some(expression.into());
        self
    }

    pub fn numeric(mut self) -> Self {
        self.is_numeric = true;
        self
    }

    /// A checkbox with exactly one option behaves as a boolean toggle.
    pub fn is_single_checkbox(&self) -> bool {
        self.kind == FieldKind::Checkbox && self.options.len() == 1
    }

    /// Kinds whose answer is an ordered membership list.
    pub fn is_multi_value(&self) -> bool {
        match self.kind {
            FieldKind::MultiSelect => true,
            FieldKind::Checkbox => self.options.len() != 1,
            _ => false,
        }
    }

    pub fn option(&self, value: &str) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.value == value)
    }
}
