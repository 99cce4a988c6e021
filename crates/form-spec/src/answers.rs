use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expr::{EmptyScope, EvalLimits, evaluate_condition};
use crate::spec::{FieldSpec, Flag, FormSpec};
use crate::value::AnswerValue;

/// Current answer per field name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<String, AnswerValue>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AnswerValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: AnswerValue) {
        self.0.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps only the entries whose names are listed.
    pub fn restricted_to<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> AnswerMap {
        let mut subset = AnswerMap::new();
        for name in names {
            if let Some(value) = self.0.get(name) {
                subset.insert(name, value.clone());
            }
        }
        subset
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }
}

impl FromIterator<(String, AnswerValue)> for AnswerMap {
    fn from_iter<T: IntoIterator<Item = (String, AnswerValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Seeds one answer per field. Always builds a fresh map.
pub fn initial_answers(spec: &FormSpec, limits: &EvalLimits) -> AnswerMap {
    spec.fields
        .iter()
        .map(|field| (field.name.clone(), initial_value(field, limits)))
        .collect()
}

pub fn initial_value(field: &FieldSpec, limits: &EvalLimits) -> AnswerValue {
    if field.is_single_checkbox() {
        let selected = field.options[0]
            .is_selected
            .as_ref()
            .map(|flag| flag_value(flag, limits))
            .unwrap_or(false);
        return AnswerValue::Bool(selected);
    }

    if field.is_multi_value() {
        return empty_list(field);
    }

    no_selection(field)
}

/// The "nothing entered" value of a scalar field.
///
/// `defaultValue` is a rendering hint and never seeds the answer.
pub(crate) fn no_selection(field: &FieldSpec) -> AnswerValue {
    if field.is_numeric {
        AnswerValue::Unset
    } else {
        AnswerValue::Text(String::new())
    }
}

pub(crate) fn empty_list(field: &FieldSpec) -> AnswerValue {
    if field.is_numeric {
        AnswerValue::NumberList(Vec::new())
    } else {
        AnswerValue::TextList(Vec::new())
    }
}

// Seeding happens before any answer exists, so string flags see an empty scope.
fn flag_value(flag: &Flag, limits: &EvalLimits) -> bool {
    match flag {
        Flag::Bool(value) => *value,
        Flag::Expression(source) => evaluate_condition(source, &EmptyScope, limits).unwrap_or(false),
    }
}
