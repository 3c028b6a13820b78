//! HTTP boundary: populates the request context from inbound requests and
//! exposes the interception hook for inspection.

pub mod app;
pub mod context;
pub mod middleware;

pub use app::{
    AppBuilder, AppState, build_app, datasource_router_from_env, datasource_router_from_lookup,
};
pub use context::{CallerIdentity, JwtUserContextProvider, UserContextProvider};
