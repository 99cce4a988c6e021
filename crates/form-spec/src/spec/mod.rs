pub mod field;
pub mod form;

pub use field::{FieldKind, FieldOption, FieldSpec, Flag};
pub use form::{FormId, FormSpec, FormSpecError};
