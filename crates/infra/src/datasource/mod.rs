//! Datasource-level tenant isolation.
//!
//! Instead of filtering rows, each tenant gets its own physical pool. Pools
//! are created lazily from descriptors an embedding application supplies,
//! cached for the process lifetime, and selected per call through the
//! request context's datasource stack.

pub mod descriptor;
pub mod factory;
pub mod registry;
pub mod router;

pub use descriptor::{StaticDataSourceProvider, TenantDataSourceDescriptor, TenantDataSourceProvider};
pub use factory::{DataSourceFactory, SqlxPoolFactory};
pub use registry::DataSourceRegistry;
pub use router::{DataSourceGuard, TenantDataSourceRouter};
