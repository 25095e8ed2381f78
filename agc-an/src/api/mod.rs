//! HTTP API handlers for agc-an

pub mod analyze;
pub mod buildinfo;
pub mod health;
pub mod ui;

pub use analyze::{analyze_app_idea, analyze_routes, get_limits};
pub use buildinfo::{buildinfo_routes, get_build_info};
pub use health::{health_check, health_routes};
pub use ui::{serve_app_js, serve_index, ui_routes};
