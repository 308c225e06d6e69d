use std::sync::Arc;

use segmap::detection::{ComponentProposer, PaletteClassifier, TrigramScorer};
use segmap::{Pipeline, PipelineConfig, PipelineInput, ProgressEvent, ProgressSink, RunOptions};

fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "scene.jpg".to_string());
    let input = PipelineInput::open(&path)?;

    let config = PipelineConfig {
        results_dir: "demo_results".into(),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::from_config(
        &config,
        Arc::new(ComponentProposer::default()),
        Arc::new(PaletteClassifier::default()),
        Arc::new(TrigramScorer::default()),
    )?;

    println!("Segmenting {} ({}x{})\n", input.name, input.image.width(), input.image.height());

    let sink = |event: ProgressEvent| -> anyhow::Result<()> {
        println!("  [{:>3}%] {:<14} {}", event.percent, event.phase, event.message);
        Ok(())
    };
    let options = RunOptions::from_config(&config).with_max_segments(6);
    let result = pipeline.run(&input, &options, Some(&sink as &dyn ProgressSink))?;

    println!(
        "\n✓ {} of {} regions returned",
        result.totals.returned, result.totals.detected
    );
    for (i, segment) in result.segments.iter().enumerate() {
        println!(
            "  Segment {}: box=({}, {})-({}, {}) score={:.3} label={} mapped={}",
            i + 1,
            segment.bbox.x1,
            segment.bbox.y1,
            segment.bbox.x2,
            segment.bbox.y2,
            segment.score,
            segment.label.as_deref().unwrap_or("-"),
            segment.mapped_label.as_deref().unwrap_or("-"),
        );
        if let Some(crop) = &segment.crop_path {
            println!("    crop: {}", crop);
        }
    }

    Ok(())
}
