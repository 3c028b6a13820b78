//! HTTP API application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP handlers
//! - `dto.rs`: response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Router, routing::get};
use tower::ServiceBuilder;

use rowgate_core::{GuardError, GuardResult};
use rowgate_infra::{
    DataSourceFactory, GuardConfig, IsolationLevel, SqlxPoolFactory, StatementInterceptor,
    StaticDataSourceProvider, TenantDataSourceDescriptor, TenantDataSourceRouter,
};

use crate::context::{JwtUserContextProvider, UserContextProvider};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

pub type SqlxDataSourceRouter = TenantDataSourceRouter<SqlxPoolFactory>;

/// Shared, read-only state handed to middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuardConfig>,
    pub users: Arc<dyn UserContextProvider>,
    pub interceptor: StatementInterceptor,
    pub datasources: Option<Arc<SqlxDataSourceRouter>>,
}

/// Assembles the router, refusing configurations whose collaborators are
/// missing.
pub struct AppBuilder {
    config: GuardConfig,
    users: Option<Arc<dyn UserContextProvider>>,
    datasources: Option<Arc<SqlxDataSourceRouter>>,
}

impl AppBuilder {
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            users: None,
            datasources: None,
        }
    }

    pub fn with_user_provider(mut self, users: Arc<dyn UserContextProvider>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_datasource_router(mut self, router: Arc<SqlxDataSourceRouter>) -> Self {
        self.datasources = Some(router);
        self
    }

    pub fn build(self) -> GuardResult<Router> {
        let users = self
            .users
            .ok_or_else(|| GuardError::missing_collaborator("UserContextProvider"))?;
        if self.config.tenant.isolation_level == IsolationLevel::Datasource && self.datasources.is_none() {
            return Err(GuardError::missing_collaborator("TenantDataSourceProvider"));
        }

        let config = Arc::new(self.config);
        let state = AppState {
            interceptor: StatementInterceptor::new(config.clone()),
            config,
            users,
            datasources: self.datasources,
        };

        // ServiceBuilder runs top to bottom: context first, then routing.
        let guarded = routes::router().layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::request_context_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    middleware::tenant_datasource_middleware,
                )),
        );

        Ok(Router::new()
            .route("/health", get(routes::system::health))
            .merge(guarded)
            .with_state(state))
    }
}

/// Build the full HTTP router with HS256 bearer-token users (public
/// entrypoint used by `main.rs`).
pub fn build_app(
    config: GuardConfig,
    jwt_secret: String,
    datasources: Option<Arc<SqlxDataSourceRouter>>,
) -> GuardResult<Router> {
    let users = Arc::new(JwtUserContextProvider::new(jwt_secret.as_bytes()));
    let builder = AppBuilder::new(config).with_user_provider(users);
    match datasources {
        Some(router) => builder.with_datasource_router(router).build(),
        None => builder.build(),
    }
}

/// Datasource-mode router from the process environment. See
/// [`datasource_router_from_lookup`].
pub fn datasource_router_from_env(config: &GuardConfig) -> GuardResult<Option<Arc<SqlxDataSourceRouter>>> {
    datasource_router_from_lookup(config, |key| std::env::var(key).ok())
}

/// Build the router used in datasource isolation mode; `None` in line mode.
///
/// - `ROWGATE_TENANT_DATASOURCES`: JSON object, tenant key → descriptor
/// - `ROWGATE_DEFAULT_DATASOURCE`: one descriptor, serves requests that have
///   no tenant selected
///
/// Must be called from within a Tokio runtime.
pub fn datasource_router_from_lookup(
    config: &GuardConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> GuardResult<Option<Arc<SqlxDataSourceRouter>>> {
    if config.tenant.isolation_level != IsolationLevel::Datasource {
        return Ok(None);
    }

    let raw = lookup("ROWGATE_TENANT_DATASOURCES").unwrap_or_else(|| "{}".to_string());
    let provider = StaticDataSourceProvider::from_json(&raw)?;
    tracing::info!(tenants = provider.len(), "tenant datasource descriptors loaded");

    let factory = SqlxPoolFactory::new();
    let router = TenantDataSourceRouter::new(Arc::new(provider), factory.clone());
    let router = match lookup("ROWGATE_DEFAULT_DATASOURCE") {
        Some(raw) => {
            let descriptor: TenantDataSourceDescriptor = serde_json::from_str(&raw)
                .map_err(|e| GuardError::invalid_config(format!("default datasource: {e}")))?;
            let pool = factory.create(&descriptor)?;
            tracing::info!(pool_name = %descriptor.pool_name, "default datasource configured");
            router.with_default_pool(pool)
        }
        None => {
            tracing::warn!("ROWGATE_DEFAULT_DATASOURCE not set; requests without a tenant get no pool");
            router
        }
    };
    Ok(Some(Arc::new(router)))
}
