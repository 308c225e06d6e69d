//! Boundary-facing view of a pipeline run: the JSON response and the
//! streamed progress protocol.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{PipelineResult, SegmentRecord, Totals};
use crate::progress::ProgressEvent;

/// Placeholder some form clients send for an unset field
const PLACEHOLDER_LABELS: &str = "string";

/// Parse a comma-separated label list.
///
/// Returns `None` for empty input, the `"string"` placeholder, or a list with
/// no non-blank entries.
pub fn parse_candidate_labels(raw: &str) -> Option<Vec<String>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(PLACEHOLDER_LABELS) {
        return None;
    }
    let labels: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if labels.is_empty() { None } else { Some(labels) }
}

/// Label frequencies across returned segments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    /// Counts of the top classification label
    pub label: BTreeMap<String, usize>,
    /// Counts of the remapped label
    pub mapped: BTreeMap<String, usize>,
}

impl LabelCounts {
    pub fn from_segments(segments: &[SegmentRecord]) -> Self {
        let mut counts = Self::default();
        for segment in segments {
            if let Some(label) = &segment.label {
                *counts.label.entry(label.clone()).or_insert(0) += 1;
            }
            if let Some(mapped) = &segment.mapped_label {
                *counts.mapped.entry(mapped.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResponse {
    pub image_path: String,
    pub segments: Vec<SegmentRecord>,
    pub counts: LabelCounts,
    pub candidate_labels: Vec<String>,
    pub totals: Totals,
}

impl PipelineResponse {
    pub fn new(result: PipelineResult, image_path: impl Into<String>) -> Self {
        let counts = LabelCounts::from_segments(&result.segments);
        Self {
            image_path: image_path.into(),
            segments: result.segments,
            counts,
            candidate_labels: result.candidate_labels,
            totals: result.totals,
        }
    }
}

/// One line of the streamed progress protocol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    pub stage: String,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineResponse>,
}

impl StreamEvent {
    pub fn complete(response: PipelineResponse) -> Self {
        Self {
            stage: "complete".to_string(),
            progress: 100,
            message: "Processing complete".to_string(),
            result: Some(response),
        }
    }

    pub fn error(last_progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage: "error".to_string(),
            progress: last_progress,
            message: message.into(),
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage == "complete" || self.stage == "error"
    }
}

impl From<ProgressEvent> for StreamEvent {
    fn from(event: ProgressEvent) -> Self {
        Self {
            stage: event.phase.as_str().to_string(),
            progress: event.percent,
            message: event.message,
            result: None,
        }
    }
}
