use clap::Args;
use anyhow::Result;
use crate::logging::{retention, LogSink, SinkLayer, SinkOptions};
use crate::{Config, Server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct ServeArgs {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    // Load configuration
    let config = Config::load(args.config.as_ref())?;

    // Open the log sink first so startup diagnostics reach the files too
    let (sink, pruned) = LogSink::open(SinkOptions::from(&config.logging))?;
    let sink = Arc::new(sink);

    let sink_layer = SinkLayer::new(Arc::clone(&sink), config.environment.is_development());
    crate::logging::init_logging(&config.logging.level, &config.logging.format, Some(sink_layer))?;

    info!("Starting reqtrail v{}", crate::VERSION);
    match &args.config {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("No configuration file given, using defaults"),
    }
    info!("Writing logs to {}", sink.directory().display());
    retention::log_report(&pruned);

    // Validate configuration
    let warnings = config.validate()?;
    for warning in warnings {
        println!("{}", warning);
    }

    let server = Server::new(config, sink)?;
    info!("Server starting...");

    server.serve().await?;

    Ok(())
}
