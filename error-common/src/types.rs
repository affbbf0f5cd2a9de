use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a failure, used for status mapping at the edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input rejected by a business or format rule
    Validation,
    /// Referenced record does not exist
    NotFound,
    /// Duplicate record or concurrent operation
    Conflict,
    /// The downstream benefit system rejected or failed a call
    Downstream,
    /// Storage layer failure
    Database,
    /// Invalid or missing configuration
    Configuration,
    /// Anything else
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Downstream => "downstream_error",
            ErrorKind::Database => "database_error",
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that know their own kind and stable code.
///
/// Domain crates implement this for their error enums so that any failure can
/// be folded into a [`ServiceResult`] without a hand-written match at each call site.
pub trait ClassifiedError: fmt::Display {
    fn kind(&self) -> ErrorKind;

    fn code(&self) -> &'static str;

    /// Message shown to API callers. Defaults to the `Display` output.
    fn public_message(&self) -> String {
        self.to_string()
    }
}

/// Uniform outcome envelope returned by every membership operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T> ServiceResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            msg: None,
            data: Some(data),
            code: None,
            kind: None,
        }
    }

    pub fn success_with_msg(data: T, msg: impl Into<String>) -> Self {
        Self {
            msg: Some(msg.into()),
            ..Self::success(data)
        }
    }

    pub fn failure(kind: ErrorKind, code: &str, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: Some(msg.into()),
            data: None,
            code: Some(code.to_string()),
            kind: Some(kind),
        }
    }

    /// Build a failed envelope from any classified error, logging it on the way
    pub fn from_error<E: ClassifiedError>(error: &E) -> Self {
        log_error("service_result", error);
        Self::failure(error.kind(), error.code(), error.public_message())
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ServiceResult<U> {
        ServiceResult {
            success: self.success,
            msg: self.msg,
            data: self.data.map(f),
            code: self.code,
            kind: self.kind,
        }
    }
}

impl<T, E: ClassifiedError> From<Result<T, E>> for ServiceResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::from_error(&error),
        }
    }
}

/// Log a classified error with its kind and code as structured fields
pub fn log_error<E: ClassifiedError>(context: &str, error: &E) {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Conflict => tracing::warn!(
            context = context,
            error_kind = %error.kind(),
            error_code = error.code(),
            error = %error,
            "Request rejected"
        ),
        _ => tracing::error!(
            context = context,
            error_kind = %error.kind(),
            error_code = error.code(),
            error = %error,
            "Operation failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    struct Duplicate(String);

    impl fmt::Display for Duplicate {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Conflict: {}", self.0)
        }
    }

    impl ClassifiedError for Duplicate {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Conflict
        }

        fn code(&self) -> &'static str {
            codes::resource::ALREADY_EXISTS
        }

        fn public_message(&self) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn test_failure_from_classified_error() {
        let result: ServiceResult<u32> = Err(Duplicate("Payer Jubilee already exists".into())).into();

        assert!(!result.is_success());
        assert_eq!(result.msg.as_deref(), Some("Payer Jubilee already exists"));
        assert_eq!(result.code.as_deref(), Some("RESOURCE_2002"));
        assert_eq!(result.kind, Some(ErrorKind::Conflict));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_success_serializes_without_error_fields() {
        let result = ServiceResult::success_with_msg(7, "done");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["msg"], "done");
        assert_eq!(json["data"], 7);
        assert!(json.get("code").is_none());
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_map_keeps_envelope() {
        let result = ServiceResult::success_with_msg(vec![1, 2, 3], "listed").map(|v| v.len());
        assert_eq!(result.data, Some(3));
        assert_eq!(result.msg.as_deref(), Some("listed"));
    }
}
