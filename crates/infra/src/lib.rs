//! Infrastructure layer: configuration, tenant isolation, datasource routing
//! and the statement interception hook the persistence layer calls into.

pub mod config;
pub mod datasource;
pub mod interceptor;
pub mod tenant;

pub use config::{DataPermissionConfig, GuardConfig, IsolationLevel, TenantIsolationConfig};
pub use datasource::{
    DataSourceFactory, DataSourceGuard, DataSourceRegistry, SqlxPoolFactory,
    StaticDataSourceProvider, TenantDataSourceDescriptor, TenantDataSourceProvider,
    TenantDataSourceRouter,
};
pub use interceptor::{InterceptedStatement, StatementInterceptor, StatementKind};
pub use tenant::TenantLineFilter;
