//! Compliance report model
//!
//! The model is asked to reply with:
//!
//! ```json
//! {
//!   "violations": [
//!     { "guideline": "...", "explanation": "...", "probability": 0.8 }
//!   ],
//!   "isCompliant": false
//! }
//! ```
//!
//! Replies are parsed leniently and then normalized so that every returned
//! violation has a probability in `(0, 1]` and the list is sorted by
//! descending probability.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

/// Violations at or below this probability are dropped by default
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.3;

/// Probability at which a violation counts as "high" by default
pub const DEFAULT_HIGH_PROBABILITY: f64 = 0.7;

/// A single potential guideline violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Guideline section and title, e.g. "4.2 Minimum Functionality"
    pub guideline: String,
    pub explanation: String,
    /// Likelihood that this is a real review issue, in `(0, 1]`
    pub probability: f64,
}

impl Violation {
    /// Probability as a whole percentage, rounded half up
    pub fn confidence_percent(&self) -> u32 {
        (self.probability * 100.0).round() as u32
    }
}

/// Result of analyzing one app idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub violations: Vec<Violation>,
    pub is_compliant: bool,
}

/// Thresholds applied while normalizing a model reply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportPolicy {
    /// Violations with probability `<=` this value are dropped
    pub min_probability: f64,
    /// Used to derive `isCompliant` when the model omits it
    pub high_probability: f64,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            min_probability: DEFAULT_MIN_PROBABILITY,
            high_probability: DEFAULT_HIGH_PROBABILITY,
        }
    }
}

impl ComplianceReport {
    /// Parse and normalize the raw text content of a model reply
    pub fn from_model_output(raw: &str, policy: &ReportPolicy) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            // Empty content is treated as an empty object
            return Ok(Self {
                violations: Vec::new(),
                is_compliant: true,
            });
        }

        // Only fall back to object extraction when the whole reply is not JSON;
        // a bare array or scalar must not be mined for an inner object
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => {
                let json_str = extract_json_object(trimmed).ok_or_else(|| {
                    Error::ModelOutput("no JSON object in model reply".to_string())
                })?;
                serde_json::from_str(json_str).map_err(|e| {
                    Error::ModelOutput(format!("invalid JSON in model reply: {}", e))
                })?
            }
        };

        let object = value.as_object().ok_or_else(|| {
            Error::ModelOutput(format!(
                "model reply must be a JSON object, got {}",
                json_type_name(&value)
            ))
        })?;

        let violations: Vec<Violation> = match object.get("violations") {
            Some(Value::Array(items)) => items.iter().filter_map(violation_from_value).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(Error::ModelOutput(format!(
                    "\"violations\" must be an array, got {}",
                    json_type_name(other)
                )))
            }
        };

        let declared = object.get("isCompliant").and_then(Value::as_bool);

        Ok(Self::normalize(violations, declared, policy))
    }

    /// Apply probability filtering and ordering
    ///
    /// `declared` is the model's own `isCompliant` value. When it is absent the
    /// flag is derived from the remaining violations.
    pub fn normalize(
        violations: Vec<Violation>,
        declared: Option<bool>,
        policy: &ReportPolicy,
    ) -> Self {
        let mut violations: Vec<Violation> = violations
            .into_iter()
            .filter(|v| v.probability.is_finite() && v.probability > 0.0 && v.probability <= 1.0)
            .filter(|v| v.probability > policy.min_probability)
            .collect();

        // sort_by is stable, ties keep model order
        violations.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        let is_compliant = declared.unwrap_or_else(|| {
            !violations
                .iter()
                .any(|v| v.probability >= policy.high_probability)
        });

        Self {
            violations,
            is_compliant,
        }
    }

    /// Violations at or above the policy's high-probability threshold
    pub fn high_probability_count(&self, policy: &ReportPolicy) -> usize {
        self.violations
            .iter()
            .filter(|v| v.probability >= policy.high_probability)
            .count()
    }
}

/// Extract the outermost JSON object from model output.
/// Tolerates code fences or prose around the object.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Convert one entry of the `violations` array, skipping malformed entries
fn violation_from_value(value: &Value) -> Option<Violation> {
    let object = match value.as_object() {
        Some(o) => o,
        None => {
            debug!(entry = %value, "Skipping non-object violation entry");
            return None;
        }
    };

    let probability = match object.get("probability").and_then(probability_from_value) {
        Some(p) => p,
        None => {
            debug!(entry = %value, "Skipping violation without numeric probability");
            return None;
        }
    };

    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    Some(Violation {
        guideline: text("guideline"),
        explanation: text("explanation"),
        probability,
    })
}

/// Models occasionally quote numbers; accept both forms
fn probability_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a report for terminal output
///
/// Mirrors the web form: headline alert, then one block per violation.
pub fn render_text(report: &ComplianceReport) -> String {
    let mut out = String::with_capacity(512);

    if report.is_compliant {
        out.push_str("No Major Issues Found\n");
        out.push_str(
            "Your app idea appears to be compliant with the App Store guidelines. \
             However, please note that this is just an initial analysis and the \
             actual review process may differ.\n",
        );
    } else {
        out.push_str("Potential Guidelines Violations Found\n");
        out.push_str(
            "Your app idea may conflict with some App Store guidelines. See details below.\n",
        );
    }

    if !report.violations.is_empty() {
        out.push_str("\nDetailed Analysis:\n");
        for violation in &report.violations {
            out.push('\n');
            out.push_str("  ");
            out.push_str(&violation.guideline);
            out.push('\n');
            out.push_str("    ");
            out.push_str(&violation.explanation);
            out.push('\n');
            out.push_str(&format!(
                "    Confidence: {}%\n",
                violation.confidence_percent()
            ));
        }
    }

    out
}
