use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use smalldata_loader::{exit_code, run, Cli, LoaderError, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.settings.log_format);

    let max_failed_documents = cli.settings.max_failed_documents;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, stopping the run");
                shutdown_tx.send_replace(true);
            }
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let outcome = run(cli, shutdown_rx).await;

    match &outcome {
        Ok(Some(result)) => print_report(result),
        Ok(None) => {}
        Err(e) => {
            error!("Load failed: {}", e);
            eprintln!("Error: {}", e);

            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("  Caused by: {}", err);
                source = err.source();
            }

            if let LoaderError::PipelineError(pipeline_error) = e {
                if let Some(partial) = pipeline_error.partial_result() {
                    print_report(partial);
                }
            }
        }
    }

    ExitCode::from(exit_code(&outcome, max_failed_documents))
}

fn print_report(result: &smalldata_loader::PipelineResult) {
    match serde_json::to_string_pretty(result) {
        Ok(report) => println!("{}", report),
        Err(e) => error!(error = %e, "Failed to render run report"),
    }
}
