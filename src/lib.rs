pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod store;

pub use config::{clamp_max_segments, HypothesisTemplate, PipelineConfig, DEFAULT_LABELS};
pub use detection::{LabelScorer, RegionClassifier, RegionProposer, SemanticMapper};
pub use error::{ImageReadError, PipelineError, RenderError, StoreError};
pub use models::{
    MappingDecision, Mask, PipelineResult, RankedRegion, Region, RegionBox, ScoreMap, SegmentRecord, Totals,
};
pub use pipeline::{rank_regions, Pipeline, PipelineInput, RunOptions};
pub use progress::{ChannelSink, Phase, ProgressEvent, ProgressSink};
pub use report::{parse_candidate_labels, LabelCounts, PipelineResponse, StreamEvent};
pub use store::ResultsStore;
