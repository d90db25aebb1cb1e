//! Admin HTTP surface of the router.
//!
//! # Routes
//! - `POST /admin/add`: register a (scope, name, url) entry
//! - `POST /admin/remove`: unregister a (scope, name, url) entry
//! - `GET /admin/list`: current routing configuration
//!
//! # Design Decisions
//! - Handlers validate before touching the configuration; invalid bodies
//!   answer 400 with a JSON error
//! - File writes run on the blocking pool so the admin listener stays
//!   responsive while a persist is in flight

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::handlers::*;
use crate::registry::ConfigurationManager;

#[derive(Clone)]
pub struct AdminState {
    pub manager: Arc<ConfigurationManager>,
}

pub fn setup_admin_router(manager: Arc<ConfigurationManager>) -> Router {
    Router::new()
        .route("/admin/add", post(add_host))
        .route("/admin/remove", post(remove_host))
        .route("/admin/list", get(list_hosts))
        .layer(TraceLayer::new_for_http())
        .with_state(AdminState { manager })
}
