#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from segmap for tests
pub use segmap::{
    HypothesisTemplate, MappingDecision, Mask, Phase, PipelineError, PipelineInput, PipelineResult, RegionBox,
    RunOptions, ScoreMap, SegmentRecord, Totals,
};
