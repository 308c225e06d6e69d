use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Labels used when a request supplies none
pub const DEFAULT_LABELS: [&str; 9] = [
    "car", "cat", "tree", "dog", "building", "person", "sky", "ground", "hardware",
];

pub const DEFAULT_TEMPLATE: &str = "This is a photo of {}.";

/// Boundary clamp for the number of returned segments
pub const MIN_SEGMENTS: usize = 1;
pub const MAX_SEGMENTS: usize = 100;

const SLOT: &str = "{}";

/// Sentence template with exactly one `{}` slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HypothesisTemplate(String);

impl HypothesisTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, PipelineError> {
        let template = template.into();
        let slots = template.matches(SLOT).count();
        if slots != 1 {
            return Err(PipelineError::Config(format!(
                "hypothesis template must contain exactly one {SLOT} slot, found {slots}: {template:?}"
            )));
        }
        Ok(Self(template))
    }

    /// Substitute a class name into the slot
    pub fn render(&self, class_name: &str) -> String {
        self.0.replacen(SLOT, class_name, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HypothesisTemplate {
    fn default() -> Self {
        Self(DEFAULT_TEMPLATE.to_string())
    }
}

impl TryFrom<String> for HypothesisTemplate {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HypothesisTemplate> for String {
    fn from(value: HypothesisTemplate) -> Self {
        value.0
    }
}

impl fmt::Display for HypothesisTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum top score for the mapping gate
    pub threshold: f64,
    /// Minimum gap between the top two scores for the mapping gate
    pub margin: f64,
    pub default_labels: Vec<String>,
    pub hypothesis_template: HypothesisTemplate,
    pub max_segments: usize,
    /// Where rendered crops are written
    pub results_dir: PathBuf,
    /// Prefix of the public crop reference
    pub results_url_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            margin: 0.15,
            default_labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            hypothesis_template: HypothesisTemplate::default(),
            max_segments: 10,
            results_dir: PathBuf::from("static/results"),
            results_url_prefix: "/static/results".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.threshold.is_finite() {
            return Err(PipelineError::Config(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(PipelineError::Config(format!(
                "margin must be finite and non-negative, got {}",
                self.margin
            )));
        }
        if self.default_labels.iter().all(|l| l.trim().is_empty()) {
            return Err(PipelineError::Config(
                "default label set must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Clamp a caller-supplied segment limit into `[1, 100]`
pub fn clamp_max_segments(requested: i64) -> usize {
    requested.clamp(MIN_SEGMENTS as i64, MAX_SEGMENTS as i64) as usize
}
