//! Assembles the HTTP surface. Specific feature routes are merged first;
//! the generic collection accessor comes last so named routes shadow it.

use std::sync::Arc;

use axum::Router;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::learn::configure())
        .merge(crate::directory::configure())
        .merge(crate::progress::configure())
        .merge(crate::compiler::configure())
        .merge(crate::tutor::configure())
        .merge(crate::file::configure())
        .merge(crate::collections::configure())
}
