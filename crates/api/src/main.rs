use anyhow::Context;

use rowgate_infra::GuardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rowgate_observability::init();

    let config = GuardConfig::from_env();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let datasources = rowgate_api::datasource_router_from_env(&config)?;

    tracing::info!(
        isolation_level = ?config.tenant.isolation_level,
        tenant_id_column = %config.tenant.tenant_id_column,
        data_permission = config.data_permission.enabled,
        "guard configured"
    );

    let app = rowgate_api::build_app(config, jwt_secret, datasources)?;

    let bind = std::env::var("ROWGATE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
