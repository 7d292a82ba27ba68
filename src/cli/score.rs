//! CLI entry-point for classifying a single text.

use std::io::Read;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{config::Settings, pipeline::PolaritySource};

/// Args for the `score` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Text to classify; read from stdin when omitted.
    #[arg(long)]
    pub text: Option<String>,
}

#[instrument(skip(settings, args))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading text from stdin")?;
            buffer
        }
    };

    let classifier = super::build_classifier(&settings, PolaritySource::Raw)?;
    let result = tokio::task::spawn_blocking(move || {
        let result = classifier.classify_text(&text);
        classifier.close();
        result
    })
        .await
        .context("classification worker aborted")??;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
