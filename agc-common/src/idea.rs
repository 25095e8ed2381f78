//! App idea input validation
//!
//! An app idea is the free-text description a user submits for analysis.
//! Length is counted in characters (not bytes) after trimming surrounding
//! whitespace.

use crate::{Error, Result};

/// Minimum idea length accepted by default
pub const DEFAULT_MIN_IDEA_CHARS: usize = 50;

/// Maximum idea length accepted by default
pub const DEFAULT_MAX_IDEA_CHARS: usize = 10_000;

/// Length bounds for a submitted app idea
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdeaLimits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for IdeaLimits {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_IDEA_CHARS,
            max_chars: DEFAULT_MAX_IDEA_CHARS,
        }
    }
}

/// A validated, trimmed app idea
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdea(String);

impl AppIdea {
    /// Validate raw user text against `limits`
    pub fn parse(raw: &str, limits: &IdeaLimits) -> Result<Self> {
        let text = raw.trim();
        let len = text.chars().count();

        if len < limits.min_chars {
            return Err(Error::InvalidInput(format!(
                "App idea should be at least {} characters long to provide enough context for analysis.",
                limits.min_chars
            )));
        }

        if len > limits.max_chars {
            return Err(Error::InvalidInput(format!(
                "App idea should be at most {} characters long.",
                limits.max_chars
            )));
        }

        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}
