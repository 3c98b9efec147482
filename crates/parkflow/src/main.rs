//! parkflow CLI: converts one CSV export into date-partitioned Parquet.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use parkflow::{
    CliArgs, IngestOptions, NoProgress, cancel_on_shutdown, init_metrics, init_tracing,
    ingest_file,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = CliArgs::parse();

    let config = match args.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(address) = &config.metrics.address
        && let Err(e) = init_metrics(address)
    {
        eprintln!("Failed to start metrics server: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        "Converting {} -> {}",
        args.input.display(),
        args.output.display()
    );

    let shutdown = CancellationToken::new();
    let signals = cancel_on_shutdown(shutdown.clone());

    let options = IngestOptions::from_config(&config).with_target("cli");
    let result = ingest_file(
        &args.input,
        &args.output,
        &options,
        &mut NoProgress,
        shutdown,
    )
    .await;
    signals.abort();

    match result {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to serialize summary: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Ingestion failed: {e}");
            ExitCode::FAILURE
        }
    }
}
