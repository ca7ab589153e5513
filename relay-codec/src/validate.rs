//! Required-field validation driven by record schemas.

use crate::record::{schema_of, Record};
use serde::{Deserialize, Serialize};

/// One missing-required-field finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Reason")]
    pub reason: String,
}

/// Walks a record's fields, collecting an error for every field marked
/// `required` whose value is the default. Nested records contribute
/// their findings under a `Parent/` prefix; sequence elements under
/// `TypeName[index]/`.
pub fn walk_record<T: Record>(value: &T, prefix: &str, errors: &mut Vec<FieldError>) {
    let schema = schema_of::<T>();
    for field in &schema.fields {
        if field.required && field.matches_default(value) {
            errors.push(FieldError {
                field: format!("{prefix}{}", field.doc_name()),
                reason: "field is missing".to_string(),
            });
        }
        let child_prefix = format!("{prefix}{}/", field.name);
        field.walk_value(value, &child_prefix, errors);
    }
}

/// Validates a top-level request record.
pub fn validate<T: Record>(value: &T) -> Vec<FieldError> {
    let mut errors = Vec::new();
    walk_record(value, "", &mut errors);
    errors
}
