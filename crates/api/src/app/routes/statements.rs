use axum::{Json, extract::State, response::IntoResponse};

use rowgate_infra::InterceptedStatement;

use crate::app::AppState;
use crate::app::dto::PreviewResponse;
use crate::app::errors::guard_error_to_response;

/// Run the interception hook over a described statement without executing it.
pub async fn preview(
    State(state): State<AppState>,
    Json(mut stmt): Json<InterceptedStatement>,
) -> axum::response::Response {
    match state.interceptor.intercept_current(&mut stmt) {
        Ok(()) => Json(PreviewResponse::from(stmt)).into_response(),
        Err(e) => guard_error_to_response(e),
    }
}
