//! CLI entry-point for batch classification of a post export.

use std::{path::PathBuf, sync::Arc};

use anyhow::{ensure, Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument, warn};

use crate::{
    config::Settings,
    data::posts,
    pipeline::{Pipeline, PolaritySource, StopSignal},
};

/// Args for the `classify` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Post export to read (defaults to `<DATA_DIR>/reddit_posts.csv`).
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Destination CSV (defaults to `<OUTPUTS_DIR>/data_with_sentiment.csv`).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Text the polarity classifier reads.
    #[arg(long, value_enum, default_value = "preprocessed")]
    pub polarity_source: PolaritySource,
    /// Documents classified concurrently.
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Append best-match similarities and sentence to each row.
    #[arg(long)]
    pub explain: bool,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let input = args
        .input
        .unwrap_or_else(|| settings.join_data("reddit_posts.csv"));
    let output = args
        .output
        .unwrap_or_else(|| settings.join_output("data_with_sentiment.csv"));

    let classifier = super::build_classifier(&settings, args.polarity_source)?;
    let documents = posts::read_documents(&input)
        .with_context(|| format!("reading posts from {}", input.display()))?;
    let expected = documents.len();

    let classifier = Arc::new(classifier);
    let pipeline = Pipeline::new(
        Arc::clone(&classifier),
        args.concurrency.unwrap_or(settings.concurrency),
    );
    let stop = StopSignal::new();
    let watcher = {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; finishing posts already in flight");
                stop.stop();
            }
        })
    };
    let report = pipeline.run_until(documents, &stop).await;
    watcher.abort();
    drop(pipeline);
    if let Ok(classifier) = Arc::try_unwrap(classifier) {
        classifier.close();
    }

    ensure!(
        report.summary.is_reconciled() && report.summary.total == expected,
        "run summary does not account for all {expected} input posts"
    );

    posts::write_outcomes_to_path(&output, &report.outcomes, args.explain)
        .with_context(|| format!("writing {}", output.display()))?;
    let summary_path = output.with_extension("summary.json");
    std::fs::write(&summary_path, serde_json::to_vec_pretty(&report.summary)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    info!(
        output = %output.display(),
        summary = %summary_path.display(),
        failed = report.summary.failed,
        "classification complete"
    );
    Ok(())
}
