use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use segmap::config::DEFAULT_TEMPLATE;
use segmap::detection::{ComponentProposer, PaletteClassifier, TrigramScorer};
use segmap::{
    clamp_max_segments, parse_candidate_labels, ChannelSink, HypothesisTemplate, Pipeline, PipelineConfig,
    PipelineInput, PipelineResponse, ProgressSink, RunOptions, StreamEvent,
};

#[derive(Parser)]
#[command(name = "segmap")]
#[command(about = "Segment an image, classify each region and remap the labels")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE", required_unless_present = "health")]
    image_path: Option<PathBuf>,

    /// Comma-separated candidate labels (default set when omitted)
    #[arg(short, long, value_name = "LABELS")]
    labels: Option<String>,

    /// Maximum number of segments to return, clamped to 1..=100
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    max_segments: i64,

    /// Hypothesis sentence with one {} slot for the class name
    #[arg(long, env = "SEGMAP_TEMPLATE", default_value = DEFAULT_TEMPLATE)]
    template: String,

    /// Directory rendered crops are written to
    #[arg(long, value_name = "DIR", env = "SEGMAP_RESULTS_DIR", default_value = "static/results")]
    results_dir: PathBuf,

    /// Prefix of crop references in the response
    #[arg(long, default_value = "/static/results")]
    url_prefix: String,

    /// Minimum top score for a remap
    #[arg(long, env = "SEGMAP_THRESHOLD", default_value_t = 0.5)]
    threshold: f64,

    /// Minimum lead of the top score over the runner-up for a remap
    #[arg(long, env = "SEGMAP_MARGIN", default_value_t = 0.15)]
    margin: f64,

    /// Smallest region, in pixels, the proposer keeps
    #[arg(long, default_value_t = 64)]
    min_area: u32,

    /// Largest number of regions the proposer materializes
    #[arg(long, default_value_t = 100)]
    max_regions: usize,

    /// Number of classes the classifier reports per region
    #[arg(long, default_value_t = 5)]
    top_k: usize,

    /// Emit progress events as JSON lines, ending with a complete or error event
    #[arg(long)]
    stream: bool,

    /// Pretty-print the final JSON
    #[arg(long)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print a health probe response and exit
    #[arg(long)]
    health: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let line = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", line);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    if args.health {
        return print_json(&serde_json::json!({ "status": "ok" }), false);
    }

    let image_path = args.image_path.clone().context("no input image given")?;

    let config = PipelineConfig {
        threshold: args.threshold,
        margin: args.margin,
        hypothesis_template: HypothesisTemplate::new(args.template.clone())?,
        max_segments: clamp_max_segments(args.max_segments),
        results_dir: args.results_dir.clone(),
        results_url_prefix: args.url_prefix.clone(),
        ..PipelineConfig::default()
    };
    config.validate()?;

    // Capabilities are built once, up front
    let pipeline = Pipeline::from_config(
        &config,
        Arc::new(
            ComponentProposer::default()
                .with_min_area(args.min_area)
                .with_max_regions(args.max_regions),
        ),
        Arc::new(PaletteClassifier::default().with_top_k(args.top_k)),
        Arc::new(TrigramScorer::default()),
    )?;
    let options = RunOptions::from_config(&config)
        .with_labels(args.labels.as_deref().and_then(parse_candidate_labels));

    info!(image = %image_path.display(), max_segments = options.max_segments, "starting pipeline");

    let (sink, mut events) = ChannelSink::new();
    let stream = args.stream;
    let reporter = tokio::spawn(async move {
        let mut last_percent = 0u8;
        while let Some(event) = events.recv().await {
            last_percent = event.percent;
            if stream {
                if let Err(e) = print_json(&StreamEvent::from(event), false) {
                    warn!(error = %e, "failed to write progress event");
                }
            } else {
                info!(phase = %event.phase, percent = event.percent, "{}", event.message);
            }
        }
        last_percent
    });

    let worker_path = image_path.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let input = PipelineInput::open(&worker_path)?;
        pipeline.run(&input, &options, Some(&sink as &dyn ProgressSink))
    })
    .await
    .context("pipeline task panicked")?;

    // The sink was dropped with the worker closure, so the reporter drains and ends
    let last_percent = reporter.await.context("progress reporter panicked")?;

    match outcome {
        Ok(result) => {
            let response = PipelineResponse::new(result, image_path.display().to_string());
            if stream {
                print_json(&StreamEvent::complete(response), false)
            } else {
                print_json(&response, args.pretty)
            }
        }
        Err(e) => {
            if stream {
                print_json(&StreamEvent::error(last_percent, e.to_string()), false)?;
            }
            Err(e).with_context(|| format!("pipeline failed for {}", image_path.display()))
        }
    }
}
