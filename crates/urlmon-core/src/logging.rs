//! Logging init: structured events to stdout or stderr, as text or JSON lines.

use anyhow::Result;
use std::io::{self, IsTerminal};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";
const VERBOSE_FILTER: &str = "info,urlmon_core=debug,urlmon=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event with fields flattened to the top level.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose` when set.
/// Returns Err if a subscriber is already installed.
pub fn init_logging(format: LogFormat, target: LogTarget, verbose: bool) -> Result<()> {
    let default_filter = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (writer, ansi) = match target {
        LogTarget::Stdout => (BoxMakeWriter::new(io::stdout), io::stdout().is_terminal()),
        LogTarget::Stderr => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer);

    let installed = match format {
        LogFormat::Text => builder.with_ansi(ansi).try_init(),
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
