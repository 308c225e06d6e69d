pub mod classifier;
pub mod crop;
pub mod mapper;
pub mod preprocessing;
pub mod proposer;
pub mod scorer;

use image::DynamicImage;

use crate::models::{Region, ScoreMap};

pub use classifier::PaletteClassifier;
pub use crop::render_masked_crop;
pub use mapper::SemanticMapper;
pub use proposer::ComponentProposer;
pub use scorer::TrigramScorer;

/// Produces candidate object regions for an image.
///
/// Every returned mask must have the image's dimensions. Ordering and
/// limiting done here are not relied upon; the pipeline re-ranks.
pub trait RegionProposer: Send + Sync {
    fn propose(&self, image: &DynamicImage) -> anyhow::Result<Vec<Region>>;

    /// Human-readable name (used in logs)
    fn name(&self) -> &str;
}

/// Classifies a cropped region into a small top-K label distribution.
///
/// An empty crop must produce an empty map or an error, never a panic.
pub trait RegionClassifier: Send + Sync {
    fn classify(&self, crop: &DynamicImage) -> anyhow::Result<ScoreMap>;

    fn name(&self) -> &str;
}

/// Scores a piece of text against each candidate label.
///
/// Scores need not sum to one but must be mutually comparable. Missing
/// entries are tolerated by the mapping gate.
pub trait LabelScorer: Send + Sync {
    fn score(&self, text: &str, labels: &[String]) -> anyhow::Result<ScoreMap>;

    fn name(&self) -> &str;
}
