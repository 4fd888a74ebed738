//! Shared application state for all routes. Built once at bootstrap; read-only afterwards.

use crate::registry::Registry;
use crate::routes::RouteTable;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    /// Synthesized from `registry` at startup.
    pub routes: Arc<RouteTable>,
}
