use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use rowgate_context::ContextCarrier;
use rowgate_core::GuardError;

use crate::app::AppState;
use crate::app::dto::{ContextView, PropagatedView, UserView};
use crate::app::errors::guard_error_to_response;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo the request context, as seen inline and from a spawned task.
pub async fn context(State(state): State<AppState>) -> axum::response::Response {
    let Some(ctx) = ContextCarrier::current() else {
        return guard_error_to_response(GuardError::NoActiveContext);
    };

    let propagated = ContextCarrier::spawn(async {
        PropagatedView {
            tenant_id: ContextCarrier::tenant_id(),
            user_id: ContextCarrier::user().map(|u| u.user_id.get()),
            datasource: ContextCarrier::current_datasource(),
        }
    })
    .await;
    let propagated = match propagated {
        Ok(view) => view,
        Err(e) => {
            tracing::error!(error = %e, "propagated context task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Json(ContextView {
        tenant_id: ctx.tenant_id(),
        user: ctx.user().map(UserView::from),
        data_scope_enabled: ctx.data_scope_enabled(),
        isolation_level: state.config.tenant.isolation_level,
        datasource_stack: ctx.datasource_stack(),
        propagated,
    })
    .into_response()
}
