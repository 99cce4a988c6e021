use serde_json::{Map, Value, json};

use crate::dispatch::{FieldControl, option_selected};
use crate::engine::FormEngine;
use crate::spec::FieldKind;
use crate::value::AnswerValue;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// More steps follow the current one.
    InProgress,
    /// The current step is the last visible one.
    SubmitStep,
    /// No field is visible.
    Empty,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::InProgress => "in_progress",
            RenderStatus::SubmitStep => "submit_step",
            RenderStatus::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOption {
    pub label: String,
    pub value: String,
    pub selected: bool,
}

/// The field presented at the current step.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub control: FieldControl,
    pub required: bool,
    pub placeholder: Option<String>,
    pub text_type: Option<String>,
    /// Suggested input for the host to offer; never written to the answers.
    pub prefill: Option<String>,
    /// Displayed default; never written to the answers.
    pub default_value: Option<String>,
    pub value: AnswerValue,
    pub options: Vec<RenderOption>,
}

/// One line of the visible sequence.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub value: AnswerValue,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub submit_label: String,
    pub status: RenderStatus,
    pub step: usize,
    pub total: usize,
    pub current: Option<RenderField>,
    pub visible: Vec<RenderSummary>,
}

/// Build the renderer payload from the engine state.
pub fn build_render_payload(engine: &mut FormEngine) -> RenderPayload {
    let status = if engine.step_count() == 0 {
        RenderStatus::Empty
    } else if engine.is_submit_step() {
        RenderStatus::SubmitStep
    } else {
        RenderStatus::InProgress
    };

    let visible = engine
        .visible_fields()
        .into_iter()
        .map(|field| RenderSummary {
            name: field.name.clone(),
            label: field.label.clone(),
            required: !field.required.is_false(),
            value: engine.answer(&field.name).cloned().unwrap_or_default(),
        })
        .collect::<Vec<_>>();

    let current_field = engine.current_field().cloned();
    let current = current_field.map(|field| {
        let value = engine.answer(&field.name).cloned().unwrap_or_default();
        let options = engine
            .visible_options(&field.name)
            .into_iter()
            .map(|option| RenderOption {
                label: option.label.clone(),
                value: option.value.clone(),
                selected: option_selected(&field, &value, option),
            })
            .collect();
        RenderField {
            control: FieldControl::for_field(&field),
            required: !field.required.is_false(),
            name: field.name,
            label: field.label,
            kind: field.kind,
            placeholder: field.placeholder,
            text_type: field.text_type,
            prefill: field.prefill,
            default_value: field.default_value,
            value,
            options,
        }
    });

    let spec = engine.spec();
    RenderPayload {
        form_id: spec.id.to_string(),
        form_title: spec.display_title(),
        submit_label: spec.submit.clone().unwrap_or_else(|| "Submit".to_string()),
        status,
        step: engine.current_step(),
        total: engine.step_count(),
        current,
        visible,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let current = payload.current.as_ref().map(|field| {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(field.name.clone()));
        map.insert("label".into(), Value::String(field.label.clone()));
        map.insert("type".into(), Value::String(field.kind.as_str().into()));
        map.insert("control".into(), Value::String(control_label(field.control).into()));
        map.insert("required".into(), Value::Bool(field.required));
        if let Some(placeholder) = &field.placeholder {
            map.insert("placeholder".into(), Value::String(placeholder.clone()));
        }
        if let Some(text_type) = &field.text_type {
            map.insert("text_type".into(), Value::String(text_type.clone()));
        }
        if let Some(prefill) = &field.prefill {
            map.insert("prefill".into(), Value::String(prefill.clone()));
        }
        if let Some(default_value) = &field.default_value {
            map.insert("default_value".into(), Value::String(default_value.clone()));
        }
        map.insert("value".into(), field.value.to_json());
        if !field.options.is_empty() {
            let options = field
                .options
                .iter()
                .map(|option| {
                    json!({
                        "label": option.label,
                        "value": option.value,
                        "selected": option.selected,
                    })
                })
                .collect::<Vec<_>>();
            map.insert("options".into(), Value::Array(options));
        }
        Value::Object(map)
    });

    let visible = payload
        .visible
        .iter()
        .map(|field| {
            json!({
                "name": field.name,
                "label": field.label,
                "required": field.required,
                "value": field.value.to_json(),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "submit_label": payload.submit_label,
        "status": payload.status.as_str(),
        "step": payload.step,
        "total": payload.total,
        "current": current,
        "visible": visible,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));

    let Some(field) = &payload.current else {
        lines.push("No visible fields.".to_string());
        return lines.join("\n");
    };

    let mut title = format!("{}/{} {}", payload.step + 1, payload.total, field.label);
    if field.required {
        title.push_str(" *");
    }
    if let Some(hint) = control_hint(field) {
        title.push(' ');
        title.push_str(&hint);
    }
    lines.push(title);

    if let Some(placeholder) = &field.placeholder {
        lines.push(format!("  ({})", placeholder));
    }
    if !field.value.is_filled() {
        if let Some(prefill) = &field.prefill {
            lines.push(format!("  Suggested: {}", prefill));
        }
        if let Some(default_value) = &field.default_value {
            lines.push(format!("  Default: {}", default_value));
        }
    }
    for (position, option) in field.options.iter().enumerate() {
        let marker = if option.selected { "[x]" } else { "[ ]" };
        lines.push(format!(
            "  {} {}. {} ({})",
            marker,
            position + 1,
            option.label,
            option.value
        ));
    }
    if !field.value.is_unset() && field.options.is_empty() {
        let shown = field.value.to_string();
        if !shown.is_empty() {
            lines.push(format!("  Current value: {}", shown));
        }
    }
    if payload.status == RenderStatus::SubmitStep {
        lines.push(format!("Last step: {}.", payload.submit_label));
    }

    lines.join("\n")
}

fn control_label(control: FieldControl) -> &'static str {
    match control {
        FieldControl::TextEntry { long: true, .. } => "long_text",
        FieldControl::TextEntry { .. } => "text",
        FieldControl::SingleChoice { .. } => "single_choice",
        FieldControl::Toggle => "toggle",
        FieldControl::MultiToggle { .. } => "multi_toggle",
    }
}

fn control_hint(field: &RenderField) -> Option<String> {
    match field.control {
        FieldControl::TextEntry { numeric: true, .. } => Some("(number)".to_string()),
        FieldControl::TextEntry { .. } => None,
        FieldControl::SingleChoice { .. } => Some("(pick one)".to_string()),
        FieldControl::Toggle => Some("(toggle)".to_string()),
        FieldControl::MultiToggle { filterable: true } => {
            Some("(toggle any, filterable)".to_string())
        }
        FieldControl::MultiToggle { .. } => Some("(toggle any)".to_string()),
    }
}
