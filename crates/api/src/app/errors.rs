use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use rowgate_core::GuardError;

/// Map a guard error to an HTTP response. Configuration mistakes are server
/// faults; everything else is a bad request.
pub fn guard_error_to_response(err: GuardError) -> axum::response::Response {
    let status = if err.is_configuration() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
