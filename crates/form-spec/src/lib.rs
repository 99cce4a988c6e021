#![allow(missing_docs)]

pub mod answers;
pub mod dispatch;
pub mod engine;
pub mod expr;
pub mod render;
pub mod spec;
pub mod validate;
pub mod value;
pub mod visibility;

pub use answers::{AnswerMap, initial_answers};
pub use dispatch::{AnswerError, FieldControl, FieldInput, filter_options};
pub use engine::{FormEngine, SubmitError, SubmitHook, SubmitResult, Submission};
pub use expr::{EvalLimits, Expr, ExprError};
pub use render::{RenderPayload, RenderStatus, build_render_payload, render_json_ui, render_text};
pub use spec::{FieldKind, FieldOption, FieldSpec, Flag, FormId, FormSpec, FormSpecError};
pub use validate::{AnswerReport, ValidationError, ValidationResult, check_answers, validate};
pub use value::AnswerValue;
pub use visibility::{
    RecordingObserver, TracingObserver, VisibilityMap, VisibilityObserver, VisibilityPlan,
    resolve_visibility, resolve_visible,
};

/// JSON schema of the form configuration document.
pub fn form_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or(serde_json::Value::Null)
}
