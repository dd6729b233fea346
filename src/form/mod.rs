//! Form-state engine
//!
//! A [`FormController`] owns one mounted form: the nested value tree, the
//! per-field interaction metadata, the validation pipelines, the field
//! arrays and the value watchers. The rendering layer reads
//! [`FormSnapshot`]s and talks back only through the controller's
//! primitive operations.

mod controller;
mod error;
mod field_array;
mod path;
mod store;
mod subscription;
mod tracker;
mod validation;
mod value;

pub use controller::{
    FieldOptions, FormController, FormOptions, FormSnapshot, SetValueOptions, SubmitResult,
    ValidationMode,
};
pub use error::{FormError, ValidationError};
pub use field_array::{FieldArrayOptions, StableId};
pub use path::FieldPath;
pub use subscription::{Subscription, WatchFilter};
pub use tracker::FormPhase;
pub use validation::{AsyncRule, Rules, ValidationJob, ValidationOutcome};
pub use value::{FieldKind, Value};
