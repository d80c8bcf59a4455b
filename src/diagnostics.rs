//! The per-handle record of what the last operation did wrong.

use crate::error::{EngineError, ErrorCode};
use serde::{Deserialize, Serialize};

/// The error record a binding hands to its host.
///
/// `minor` and `details` are left out of the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorInfo {
    pub fn none() -> Self {
        Self::from_code(ErrorCode::NoError)
    }

    fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            minor: None,
            details: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.code != ErrorCode::NoError
    }
}

impl Default for ErrorInfo {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&EngineError> for ErrorInfo {
    fn from(error: &EngineError) -> Self {
        Self {
            minor: error.minor(),
            details: error.details(),
            ..Self::from_code(error.code())
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    last: ErrorInfo,
}

impl Diagnostics {
    pub(crate) fn reset(&mut self) {
        self.last = ErrorInfo::none();
    }

    pub(crate) fn record(&mut self, error: &EngineError) {
        log::debug!("recording error {:?}: {}", error.code(), error);
        self.last = ErrorInfo::from(error);
    }

    /// Records the error of a failed result and passes the result through.
    pub(crate) fn track<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(e) = &result {
            self.record(e);
        }
        result
    }

    pub(crate) fn last(&self) -> &ErrorInfo {
        &self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let mut diagnostics = Diagnostics::default();
        assert!(!diagnostics.last().is_error());

        let result: Result<(), _> = diagnostics.track(Err(EngineError::NoMatch("/a".into())));
        assert!(result.is_err());
        assert_eq!(diagnostics.last().code, ErrorCode::NoMatch);
        assert_eq!(diagnostics.last().details.as_deref(), Some("/a"));

        diagnostics.reset();
        assert_eq!(diagnostics.last(), &ErrorInfo::none());
    }

    #[test]
    fn test_serialized_form_omits_absent_fields() {
        let json = serde_json::to_value(ErrorInfo::none()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": 0, "message": "No error" })
        );

        let info = ErrorInfo::from(&EngineError::multiple("/a/*", 2));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["code"], 5);
        assert_eq!(json["minor"], "2 nodes match");
        assert_eq!(json["details"], "/a/*");
    }
}
