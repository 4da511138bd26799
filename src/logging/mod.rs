pub mod clock;
pub mod layer;
pub mod record;
pub mod redact;
pub mod retention;
pub mod sink;

pub use layer::{SinkLayer, ACCESS_TARGET};
pub use record::{LogRecord, RecordKind};
pub use redact::Redactor;
pub use sink::{LogCategory, LogSink, SinkOptions};

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber: console output in `format`, plus the
/// optional bridge that copies diagnostics into the log files.
pub fn init_logging(level: &str, format: &str, sink_layer: Option<SinkLayer>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sink_layer);

    match format {
        "json" => registry.with(fmt::layer().json()).try_init()?,
        "compact" => registry.with(fmt::layer().compact()).try_init()?,
        _ => registry.with(fmt::layer().pretty()).try_init()?,
    }

    Ok(())
}
