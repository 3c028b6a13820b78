use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub mod statements;
pub mod system;

/// Routes that run inside a request context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/context", get(system::context))
        .route("/statements/preview", post(statements::preview))
}
