use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use rowgate_context::{ContextCarrier, RequestContext};
use rowgate_core::TenantContext;
use rowgate_infra::IsolationLevel;

use crate::app::AppState;
use crate::app::errors::{guard_error_to_response, json_error};

/// Build the request context from the tenant header and the user provider,
/// then run the rest of the request inside it.
///
/// A caller whose roles cannot be resolved gets a 500. Naming the super
/// tenant requires the provider's consent.
///
/// The context lives exactly as long as the downstream future, so it is gone
/// on every exit path, including errors and client disconnects.
pub async fn request_context_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();

    let tenant = TenantContext::from_header_value(
        parts
            .headers
            .get(state.config.tenant.tenant_id_header.as_str())
            .and_then(|v| v.to_str().ok()),
    );
    let identity = match state.users.identify(&parts) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!(error = %e, "caller identity unusable");
            return guard_error_to_response(e);
        }
    };
    let super_tenant = tenant
        .tenant_id()
        .filter(|id| state.config.tenant.is_super_tenant(*id));
    if let Some(tenant_id) = super_tenant {
        if !state.users.allows_super_tenant(&identity) {
            tracing::warn!(%tenant_id, "super tenant refused for caller");
            return json_error(
                StatusCode::FORBIDDEN,
                "super_tenant_forbidden",
                format!("caller may not act as tenant {tenant_id}"),
            );
        }
    }
    let ctx = RequestContext::new(tenant)
        .with_shared_user(identity.user.map(Arc::new))
        .with_data_scope(identity.filter_enabled);

    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::now_v7(),
        method = %parts.method,
        path = %parts.uri.path(),
        tenant_id = ?tenant.tenant_id(),
    );
    let req = Request::from_parts(parts, body);

    ContextCarrier::scope(ctx, next.run(req)).instrument(span).await
}

/// In datasource isolation mode, pin the whole request to the tenant's pool.
///
/// Requests without a tenant run against the default pool. A tenant with no
/// datasource configuration gets a diagnostic 500.
pub async fn tenant_datasource_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let router = match (&state.datasources, state.config.tenant.isolation_level) {
        (Some(router), IsolationLevel::Datasource) => router.clone(),
        _ => return next.run(req).await,
    };
    let Some(tenant_id) = ContextCarrier::tenant_id() else {
        return next.run(req).await;
    };

    match router.route(&tenant_id.to_string(), next.run(req)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%tenant_id, error = %e, "tenant datasource unavailable");
            guard_error_to_response(e)
        }
    }
}
