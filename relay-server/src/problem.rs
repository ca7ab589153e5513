//! The error record shared by the framework and its handlers.

use relay_codec::FieldError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Success marker; equivalent to an empty code.
pub const ERROR_NONE: &str = "none";
pub const ERROR_PROCEDURE_NOT_FOUND: &str = "procedure_not_found";
pub const ERROR_REST_PROCEDURE_NOT_FOUND: &str = "rest_procedure_not_found";
pub const ERROR_JSON_UNMARSHAL: &str = "json_unmarshal_failed";
pub const ERROR_VALIDATION_FAILED: &str = "request_validation_failed";
pub const ERROR_AUTHENTICATION_FAILED: &str = "authentication_failed";
pub const ERROR_STATIC_CONTENT_NOT_FOUND: &str = "static_content_not_found";
pub const ERROR_INTERNAL: &str = "internal_error";

/// A short error code. Handlers return their own domain-specific codes;
/// the framework only ever assigns the constants above.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorId(pub String);

impl ErrorId {
    pub fn new(code: impl Into<String>) -> ErrorId {
        ErrorId(code.into())
    }

    /// An empty code and `none` both mean success.
    pub fn is_success(&self) -> bool {
        self.0.is_empty() || self.0 == ERROR_NONE
    }
}

impl From<&str> for ErrorId {
    fn from(code: &str) -> ErrorId {
        ErrorId(code.to_string())
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The error record: a short code plus a human message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "ErrorID")]
    pub error_id: ErrorId,
    #[serde(rename = "Message", default)]
    pub message: String,
}

impl Problem {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Problem {
        Problem {
            error_id: ErrorId::new(code),
            message: message.into(),
        }
    }

    /// A problem with only a code.
    pub fn code(code: impl Into<String>) -> Problem {
        Problem {
            error_id: ErrorId::new(code),
            message: String::new(),
        }
    }
}

/// An error record the dispatcher can extract a code from: either
/// [`Problem`] itself or a larger record exposing an embedded one. The
/// whole record is serialized into the error response.
pub trait Fault: Serialize {
    fn problem(&self) -> &Problem;
}

impl Fault for Problem {
    fn problem(&self) -> &Problem {
        self
    }
}

/// The error record produced when request validation finds missing
/// required fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationProblem {
    #[serde(flatten)]
    pub problem: Problem,
    #[serde(rename = "ValidationProblem")]
    pub validation_problem: Vec<FieldError>,
}

impl ValidationProblem {
    pub fn new(errors: Vec<FieldError>) -> ValidationProblem {
        ValidationProblem {
            problem: Problem::code(ERROR_VALIDATION_FAILED),
            validation_problem: errors,
        }
    }
}

impl Fault for ValidationProblem {
    fn problem(&self) -> &Problem {
        &self.problem
    }
}
