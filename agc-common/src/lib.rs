//! # AGC Common Library
//!
//! Shared code for the App Guidelines Checker services including:
//! - Error types
//! - Configuration loading (TOML bootstrap, API key resolution)
//! - App idea input validation
//! - Compliance report model, normalization and text rendering

pub mod config;
pub mod error;
pub mod idea;
pub mod report;

pub use error::{Error, Result};
pub use idea::{AppIdea, IdeaLimits};
pub use report::{ComplianceReport, ReportPolicy, Violation};
