use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageReader};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{HypothesisTemplate, PipelineConfig, DEFAULT_LABELS};
use crate::detection::{render_masked_crop, LabelScorer, RegionClassifier, RegionProposer, SemanticMapper};
use crate::error::PipelineError;
use crate::models::{MappingDecision, PipelineResult, RankedRegion, Region, ScoreMap, SegmentRecord, Totals};
use crate::progress::{segment_percent, Phase, ProgressReporter, ProgressSink};
use crate::store::ResultsStore;

/// A decoded source image and the name its crops are filed under
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub name: String,
    pub image: DynamicImage,
}

impl PipelineInput {
    pub fn new(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Decode an image file, detecting the format from its content
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|source| PipelineError::ImageRead {
                name: path.display().to_string(),
                source: source.into(),
            })?;
        let image = reader.decode().map_err(|source| PipelineError::ImageRead {
            name: name.clone(),
            source: source.into(),
        })?;

        Ok(Self { name, image })
    }

    /// Decode uploaded bytes
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, PipelineError> {
        let name = name.into();
        let image = image::load_from_memory(bytes).map_err(|source| PipelineError::ImageRead {
            name: name.clone(),
            source: source.into(),
        })?;
        Ok(Self { name, image })
    }
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// `None` or empty selects the pipeline's default label set
    pub candidate_labels: Option<Vec<String>>,
    pub max_segments: usize,
    pub hypothesis_template: HypothesisTemplate,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            candidate_labels: None,
            max_segments: 10,
            hypothesis_template: HypothesisTemplate::default(),
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            candidate_labels: None,
            max_segments: config.max_segments,
            hypothesis_template: config.hypothesis_template.clone(),
        }
    }

    pub fn with_labels(mut self, labels: Option<Vec<String>>) -> Self {
        self.candidate_labels = labels;
        self
    }

    pub fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = max_segments;
        self
    }

    pub fn with_template(mut self, template: HypothesisTemplate) -> Self {
        self.hypothesis_template = template;
        self
    }
}

/// Sort by quality descending and keep at most `max_segments` (floored to 1).
///
/// The sort is stable, so equal qualities keep the proposer's order. NaN
/// qualities rank last.
pub fn rank_regions(mut regions: Vec<Region>, max_segments: usize) -> Vec<RankedRegion> {
    let key = |q: f32| if q.is_nan() { f32::NEG_INFINITY } else { q };
    regions.sort_by(|a, b| key(b.quality).total_cmp(&key(a.quality)));

    regions
        .into_iter()
        .take(max_segments.max(1))
        .enumerate()
        .map(|(i, region)| RankedRegion { rank: i + 1, region })
        .collect()
}

/// Proposal, ranking, per-region crop/classify/map orchestration.
///
/// Capabilities are constructed once by the caller and shared. A run is
/// strictly sequential.
pub struct Pipeline {
    proposer: Arc<dyn RegionProposer>,
    classifier: Arc<dyn RegionClassifier>,
    mapper: SemanticMapper,
    store: ResultsStore,
    default_labels: Vec<String>,
}

impl Pipeline {
    pub fn new(
        proposer: Arc<dyn RegionProposer>,
        classifier: Arc<dyn RegionClassifier>,
        mapper: SemanticMapper,
        store: ResultsStore,
    ) -> Self {
        Self {
            proposer,
            classifier,
            mapper,
            store,
            default_labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn from_config(
        config: &PipelineConfig,
        proposer: Arc<dyn RegionProposer>,
        classifier: Arc<dyn RegionClassifier>,
        scorer: Arc<dyn LabelScorer>,
    ) -> Result<Self, PipelineError> {
        let mapper = SemanticMapper::from_config(scorer, config)?;
        Ok(Self::new(proposer, classifier, mapper, ResultsStore::from_config(config))
            .with_default_labels(config.default_labels.clone()))
    }

    pub fn with_default_labels(mut self, labels: Vec<String>) -> Self {
        let labels = normalize_labels(&labels);
        if !labels.is_empty() {
            self.default_labels = labels;
        }
        self
    }

    pub fn default_labels(&self) -> &[String] {
        &self.default_labels
    }

    pub fn store(&self) -> &ResultsStore {
        &self.store
    }

    /// Labels a run will actually map against
    pub fn resolve_labels(&self, requested: Option<&[String]>) -> Vec<String> {
        let labels = requested.map(normalize_labels).unwrap_or_default();
        if labels.is_empty() {
            self.default_labels.clone()
        } else {
            labels
        }
    }

    /// Run the full pipeline on one image.
    ///
    /// Either returns a complete result or a fatal error; per-region
    /// classification and mapping failures are absorbed into their records.
    pub fn run(
        &self,
        input: &PipelineInput,
        options: &RunOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<PipelineResult, PipelineError> {
        let max_segments = options.max_segments.max(1);
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id, image = %input.name, max_segments);
        let _guard = span.enter();

        let labels = self.resolve_labels(options.candidate_labels.as_deref());
        let mut progress = ProgressReporter::new(progress);

        progress.emit(
            Phase::Proposal,
            30,
            format!("Proposing regions with {}...", self.proposer.name()),
        );
        let regions = self
            .proposer
            .propose(&input.image)
            .map_err(PipelineError::Proposal)?;
        let detected = regions.len();
        info!(detected, proposer = self.proposer.name(), "regions proposed");
        progress.emit(Phase::Proposal, 50, format!("{} regions found", detected));

        let ranked = rank_regions(regions, max_segments);
        let total = ranked.len();

        let mut segments = Vec::with_capacity(total);
        for ranked_region in &ranked {
            let record = self.process_region(input, ranked_region, &labels, &options.hypothesis_template)?;
            progress.emit(
                Phase::Classification,
                segment_percent(ranked_region.rank, total),
                format!("Processing segment {}/{}", ranked_region.rank, total),
            );
            segments.push(record);
        }

        progress.emit(Phase::Finalizing, 95, "Finalizing results...");
        info!(detected, returned = segments.len(), "pipeline finished");

        Ok(PipelineResult {
            image_name: input.name.clone(),
            segments,
            candidate_labels: labels,
            totals: Totals {
                detected,
                returned: total,
            },
        })
    }

    fn process_region(
        &self,
        input: &PipelineInput,
        ranked: &RankedRegion,
        labels: &[String],
        template: &HypothesisTemplate,
    ) -> Result<SegmentRecord, PipelineError> {
        let rank = ranked.rank;
        let region = &ranked.region;

        let crop = render_masked_crop(&input.image, &region.mask, &region.bbox)
            .map_err(|source| PipelineError::Render { rank, source })?;

        let mut record = SegmentRecord {
            bbox: region.bbox,
            score: region.quality,
            crop_path: None,
            label: None,
            mapped_label: None,
            classification: ScoreMap::new(),
            semantic_scores: ScoreMap::new(),
        };

        if crop.width() == 0 || crop.height() == 0 {
            debug!(rank, "empty crop, nothing to classify");
            return Ok(record);
        }

        let name = ResultsStore::crop_name(&input.name, rank);
        let crop_path = self
            .store
            .persist(&name, &crop)
            .map_err(|source| PipelineError::Store { name, source })?;
        record.crop_path = Some(crop_path);

        let classification = match self.classifier.classify(&crop) {
            Ok(classification) => classification,
            Err(e) => {
                warn!(rank, classifier = self.classifier.name(), error = %e, "classification failed");
                ScoreMap::new()
            }
        };
        let label = classification.top().map(|(label, _)| label.to_string());

        let decision = match &label {
            Some(label) => {
                let hypothesis = template.render(label);
                match self.mapper.map(&hypothesis, labels) {
                    Ok(decision) => decision,
                    Err(e) => {
                        warn!(rank, error = %e, "semantic mapping failed");
                        MappingDecision::default()
                    }
                }
            }
            None => MappingDecision::default(),
        };

        debug!(
            rank,
            label = label.as_deref().unwrap_or("-"),
            mapped = decision.mapped_label.as_deref().unwrap_or("-"),
            "segment processed"
        );

        record.label = label;
        record.mapped_label = decision.mapped_label;
        record.classification = classification;
        record.semantic_scores = decision.scores;
        Ok(record)
    }
}

/// Trim, drop empties and duplicates, keep first-seen order
fn normalize_labels(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_string());
        }
    }
    out
}
