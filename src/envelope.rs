// src/envelope.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::PollError;

/// Uniform `{ error, data }` shape returned by every operation.
#[derive(Debug, Serialize)]
pub struct ActionResult<T> {
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            error: None,
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn failed(error: &PollError) -> Self {
        Self {
            error: Some(error.to_string()),
            data: None,
            status: error.status_code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl ActionResult<()> {
    /// Success with no payload.
    pub fn done() -> Self {
        Self {
            error: None,
            data: None,
            status: StatusCode::OK,
        }
    }

    pub fn completed(result: Result<(), PollError>) -> Self {
        match result {
            Ok(()) => ActionResult::done(),
            Err(e) => ActionResult::failed(&e),
        }
    }
}

impl<T> From<Result<T, PollError>> for ActionResult<T> {
    fn from(result: Result<T, PollError>) -> Self {
        match result {
            Ok(data) => ActionResult::ok(data),
            Err(e) => ActionResult::failed(&e),
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_error_without_data() {
        let result: ActionResult<u32> = Err(PollError::NotFound("Poll not found".into())).into();
        assert_eq!(result.status(), StatusCode::NOT_FOUND);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Poll not found" }));
    }

    #[test]
    fn success_carries_payload_and_null_error() {
        let result: ActionResult<Vec<&str>> = Ok(vec!["a", "b"]).into();
        assert!(result.is_ok());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({ "error": null, "data": ["a", "b"] }));
    }

    #[test]
    fn done_has_no_payload() {
        let json = serde_json::to_value(ActionResult::done()).unwrap();
        assert_eq!(json, serde_json::json!({ "error": null }));
    }
}
