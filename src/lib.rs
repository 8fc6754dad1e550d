pub mod cli;
pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod indices;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod retrieval;

use anyhow::Context;
use bytesize::ByteSize;

use crate::config::{ExportConfig, IndexSelection};
use crate::output::CsvSink;
use crate::pipeline::Pipeline;
use crate::retrieval::SearchFetcher;

pub async fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let args = cli::Cli::parse();

    // Configure logger based on debug flag
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
        log::debug!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    // Enable colors if not in quiet mode
    if !args.quiet {
        console::set_colors_enabled(true);
    }

    let config = ExportConfig::from_cli(&args).context("Invalid configuration")?;
    log::info!(
        "Exporting '{}' matches on {} from {} into {}",
        config.query.keyword,
        config.query.match_field,
        config.backend.url,
        config.output_dir.display()
    );

    let client = elasticsearch::create_client(&config.backend)?;
    let fetcher = SearchFetcher::new(client, config.query.clone());
    let pipeline =
        Pipeline::new(fetcher, CsvSink::new(&config.output_dir)).with_progress(config.show_progress);

    let summary = match &config.selection {
        IndexSelection::Range { range, namespace } => pipeline.run_range(range, namespace).await,
        IndexSelection::Explicit(indices) => pipeline.run(indices).await,
    }
    .context("Export aborted")?;

    let elapsed = summary.elapsed;
    log::info!(
        "Export completed: {} indices, {} rows ({}) in {:.2?} ({:.0} rows/sec)",
        summary.indices.len(),
        summary.rows(),
        ByteSize(summary.bytes()),
        elapsed,
        summary.rows() as f64 / elapsed.as_secs_f64().max(1e-6)
    );

    Ok(())
}
