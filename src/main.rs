mod cli;
mod config;
mod observer;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;

use cli::{Cli, Commands};
use fm_av::ToolRegistry;
use fm_batch::{BatchDispatcher, BatchRequest, EventObserver, FfmpegConverter};
use fm_core::config::AppConfig;
use fm_core::events::EventBus;
use fm_core::OutputNaming;
use observer::ConsoleObserver;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise derive the filter from the
    // verbose flag. Logs go to stderr; stdout carries the report.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fastmux=debug,fm_batch=debug,fm_av=debug".to_string()
        } else {
            "fastmux=info,fm_batch=info,fm_av=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            inputs,
            output_dir,
            suffix,
            parallel,
            json,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(&config, inputs, output_dir, suffix, parallel, json))
        }
        Commands::CheckTools => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            check_tools(&config);
            Ok(())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            let config = config::load_config_or_default(path.as_deref())?;
            println!(
                "Configuration OK (max_parallel = {}, suffix = \"{}\")",
                config.batch.max_parallel, config.batch.suffix
            );
            Ok(())
        }
    }
}

/// Run one batch conversion and report the result.
async fn convert(
    config: &AppConfig,
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    suffix: Option<String>,
    parallel: Option<usize>,
    json: bool,
) -> Result<()> {
    for input in &inputs {
        if !fm_core::media::is_supported_input(input) {
            tracing::warn!(
                "{} does not look like a supported video container; attempting anyway",
                input.display()
            );
        }
    }

    let request = BatchRequest {
        inputs,
        output_dir,
        naming: OutputNaming::new(suffix.unwrap_or_else(|| config.batch.suffix.clone())),
        max_parallel: parallel.unwrap_or(config.batch.max_parallel),
    };

    let tools = Arc::new(ToolRegistry::locate(&config.tools));
    let dispatcher = BatchDispatcher::new(Arc::new(FfmpegConverter::new(tools)));

    let summary = if json {
        run_with_json_events(&dispatcher, &request).await?
    } else {
        dispatcher.run(&request, &ConsoleObserver).await?
    };

    if !summary.all_succeeded() {
        anyhow::bail!(
            "{} of {} file(s) failed to convert",
            summary.failed.len(),
            summary.total
        );
    }

    tracing::info!("converted {} file(s)", summary.total);
    Ok(())
}

/// Run a batch while streaming its events to stdout as JSON lines.
async fn run_with_json_events(
    dispatcher: &BatchDispatcher<FfmpegConverter>,
    request: &BatchRequest,
) -> Result<fm_batch::BatchSummary> {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::error!("failed to serialize event: {e}"),
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("event stream lagged; dropped {n} event(s)");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let observer = EventObserver::new(Arc::clone(&bus));
    let summary = dispatcher.run(request, &observer).await;

    // Drop every sender so the printer drains and exits.
    drop(observer);
    drop(bus);
    let _ = printer.await;

    Ok(summary?)
}

/// Report availability of the external tools.
fn check_tools(config: &AppConfig) {
    let registry = ToolRegistry::locate(&config.tools);
    for info in registry.check_all() {
        if info.available {
            let version = info.version.as_deref().unwrap_or("unknown version");
            let path = info
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!("{}: {} ({})", info.name, version, path);
        } else {
            println!("{}: not found", info.name);
        }
    }
}
