//! agc-an library interface
//!
//! Exposes the router and application state for the binary and for
//! integration testing.

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use agc_common::config::TomlConfig;
use agc_common::IdeaLimits;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::{Analyzer, LlmError};

/// Maximum accepted request body size
pub const MAX_BODY_BYTES: usize = agc_common::config::MAX_REQUEST_BODY_BYTES;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` when no API key is configured; analysis requests get 503
    pub analyzer: Option<Arc<Analyzer>>,
    /// Input length bounds for submitted ideas
    pub limits: IdeaLimits,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last analysis failure for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(analyzer: Option<Analyzer>, limits: IdeaLimits) -> Self {
        Self {
            analyzer: analyzer.map(Arc::new),
            limits,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Build state from bootstrap configuration and the resolved API key
    pub fn from_config(config: &TomlConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let analyzer = api_key
            .map(|key| Analyzer::from_config(config, key))
            .transpose()?;
        Ok(Self::new(analyzer, config.analysis.idea_limits()))
    }

    /// Record a failure for `/health`
    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // UI routes (HTML page + script)
        .merge(api::ui_routes())
        // API routes
        .merge(api::analyze_routes())
        .merge(api::buildinfo_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
