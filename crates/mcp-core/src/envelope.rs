//! Tool call outcome: success data or a `ToolFailure`

use serde_json::Value;

use crate::error::ToolFailure;

/// Outcome of one tool call: exactly one of success data or a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Success(Value),
    Failure(ToolFailure),
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    /// Success data as-is, or the failure's error envelope.
    pub fn into_value(self) -> Value {
        match self {
            CallResult::Success(data) => data,
            CallResult::Failure(failure) => failure.envelope(),
        }
    }
}

impl From<ToolFailure> for CallResult {
    fn from(failure: ToolFailure) -> Self {
        CallResult::Failure(failure)
    }
}

impl From<Result<Value, ToolFailure>> for CallResult {
    fn from(result: Result<Value, ToolFailure>) -> Self {
        match result {
            Ok(data) => CallResult::Success(data),
            Err(failure) => CallResult::Failure(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_renders_envelope() {
        let result: CallResult = Err(ToolFailure::internal("boom")).into();
        assert!(!result.is_success());
        assert_eq!(result.into_value()["status"], "error");
    }

    #[test]
    fn success_passes_data_through() {
        let result: CallResult = Ok(json!({"status": "success"})).into();
        assert!(result.is_success());
        assert_eq!(result.into_value(), json!({"status": "success"}));
    }
}
