use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, Rgb, RgbImage};
use segmap::{
    LabelScorer, Mask, Pipeline, ProgressEvent, ProgressSink, Region, RegionClassifier, RegionProposer,
    ResultsStore, ScoreMap, SemanticMapper,
};

/// Creates a width x height RGB gradient image
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    DynamicImage::ImageRgb8(img)
}

/// Mask with the half-open rectangle [x1, x2) x [y1, y2) set
pub fn rect_mask(width: u32, height: u32, x1: u32, y1: u32, x2: u32, y2: u32) -> Mask {
    Mask::from_fn(width, height, |x, y| x >= x1 && x < x2 && y >= y1 && y < y2)
}

pub fn rect_region(width: u32, height: u32, rect: (u32, u32, u32, u32), quality: f32) -> Region {
    let (x1, y1, x2, y2) = rect;
    Region::from_mask(rect_mask(width, height, x1, y1, x2, y2), quality)
}

pub fn scores(entries: &[(&str, f64)]) -> ScoreMap {
    entries.iter().map(|(l, s)| (*l, *s)).collect()
}

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Returns the same regions for every image
pub struct FixedProposer {
    pub regions: Vec<Region>,
}

impl RegionProposer for FixedProposer {
    fn propose(&self, _image: &DynamicImage) -> anyhow::Result<Vec<Region>> {
        Ok(self.regions.clone())
    }

    fn name(&self) -> &str {
        "Fixed"
    }
}

pub struct FailingProposer;

impl RegionProposer for FailingProposer {
    fn propose(&self, _image: &DynamicImage) -> anyhow::Result<Vec<Region>> {
        anyhow::bail!("model unavailable")
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

/// Returns a fixed distribution, failing on the listed call numbers (1-based)
pub struct ScriptedClassifier {
    pub output: ScoreMap,
    pub fail_on: Vec<usize>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(output: ScoreMap) -> Self {
        Self {
            output,
            fail_on: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.fail_on = calls.to_vec();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RegionClassifier for ScriptedClassifier {
    fn classify(&self, _crop: &DynamicImage) -> anyhow::Result<ScoreMap> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            anyhow::bail!("classifier crashed on call {}", call);
        }
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}

/// Returns fixed scores, restricted to the requested labels
pub struct FixedScorer {
    pub scores: ScoreMap,
    pub texts: Mutex<Vec<String>>,
}

impl FixedScorer {
    pub fn new(scores: ScoreMap) -> Self {
        Self {
            scores,
            texts: Mutex::new(Vec::new()),
        }
    }
}

impl LabelScorer for FixedScorer {
    fn score(&self, text: &str, labels: &[String]) -> anyhow::Result<ScoreMap> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(self
            .scores
            .iter()
            .filter(|(label, _)| labels.iter().any(|l| l == label))
            .collect())
    }

    fn name(&self) -> &str {
        "Fixed"
    }
}

pub struct FailingScorer;

impl LabelScorer for FailingScorer {
    fn score(&self, _text: &str, _labels: &[String]) -> anyhow::Result<ScoreMap> {
        anyhow::bail!("scorer offline")
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

/// Collects every delivered event
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn report(&self, event: ProgressEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Rejects every event
pub struct BrokenSink;

impl ProgressSink for BrokenSink {
    fn report(&self, _event: ProgressEvent) -> anyhow::Result<()> {
        anyhow::bail!("client disconnected")
    }
}

/// Creates a results store in a fresh temporary directory.
/// The directory must be kept alive for the duration of the test.
pub fn temp_store() -> (ResultsStore, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let store = ResultsStore::new(dir.path().join("results"), "/static/results");
    (store, dir)
}

/// Pipeline over fake capabilities with default gate settings
pub fn build_pipeline(
    proposer: Arc<dyn RegionProposer>,
    classifier: Arc<dyn RegionClassifier>,
    scorer: Arc<dyn LabelScorer>,
    store: ResultsStore,
) -> Pipeline {
    Pipeline::new(proposer, classifier, SemanticMapper::new(scorer), store)
}
