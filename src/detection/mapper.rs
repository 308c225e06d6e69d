use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::detection::LabelScorer;
use crate::error::PipelineError;
use crate::models::{MappingDecision, ScoreMap};

/// Confidence-gated label remapping.
///
/// The top candidate is accepted only when its score reaches `threshold` and
/// leads the runner-up by at least `margin`. The full score map is returned
/// either way.
pub struct SemanticMapper {
    scorer: Arc<dyn LabelScorer>,
    threshold: f64,
    margin: f64,
}

impl SemanticMapper {
    pub fn new(scorer: Arc<dyn LabelScorer>) -> Self {
        Self {
            scorer,
            threshold: 0.5,
            margin: 0.15,
        }
    }

    pub fn from_config(scorer: Arc<dyn LabelScorer>, config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self::new(scorer)
            .with_threshold(config.threshold)
            .with_margin(config.margin))
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Decide whether `hypothesis` maps confidently onto one of `candidate_labels`.
    ///
    /// With fewer than two candidates the margin rule is undefined and the
    /// decision is always `(None, {})`. Scorer failures are returned as errors.
    pub fn map(&self, hypothesis: &str, candidate_labels: &[String]) -> anyhow::Result<MappingDecision> {
        if candidate_labels.len() < 2 {
            return Ok(MappingDecision::default());
        }

        let scores = self.scorer.score(hypothesis, candidate_labels)?;
        Ok(self.gate(scores))
    }

    /// Apply the threshold/margin gate to an already computed score map
    pub fn gate(&self, scores: ScoreMap) -> MappingDecision {
        let ranked = scores.sorted_desc();
        let Some(&(top_label, top_score)) = ranked.first() else {
            return MappingDecision::default();
        };
        let second_score = ranked.get(1).map(|(_, s)| *s).unwrap_or(0.0);

        let accepted = top_score >= self.threshold && (top_score - second_score) >= self.margin;

        tracing::debug!(
            top = top_label,
            top_score,
            second_score,
            accepted,
            "semantic gate"
        );

        if accepted {
            MappingDecision {
                mapped_label: Some(top_label.to_string()),
                scores,
            }
        } else {
            MappingDecision::rejected(scores)
        }
    }
}
