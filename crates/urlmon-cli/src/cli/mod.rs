//! CLI for urlmon.

mod commands;
mod interrupt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use urlmon_core::config::{self, UrlmonConfig};
use urlmon_core::logging::{self, LogFormat, LogTarget};

use commands::{run_check, run_show_config};

/// Top-level CLI for urlmon.
#[derive(Debug, Parser)]
#[command(name = "urlmon")]
#[command(about = "urlmon: bounded-concurrency HTTP reachability checks", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/urlmon/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// Debug-level logs for urlmon (ignored when RUST_LOG is set).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Check every URL listed in a file once and report the outcome.
    Check {
        /// File with one URL per line; blank lines and `#` comments are skipped.
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,

        /// Per-request timeout in seconds (overrides config).
        #[arg(short, long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Maximum number of concurrent requests (overrides config).
        #[arg(short, long, value_name = "N")]
        concurrency: Option<usize>,

        /// Cancel whatever is still running after this many seconds.
        #[arg(long, value_name = "SECS")]
        run_timeout: Option<u64>,

        /// Print the results and summary as JSON on stdout (logs move to stderr).
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        cli.run().await
    }

    pub async fn run(self) -> Result<()> {
        let target = match self.command {
            CliCommand::Check { json: true, .. } => LogTarget::Stderr,
            _ => LogTarget::Stdout,
        };
        logging::init_logging(self.log_format.into(), target, self.verbose)?;

        let cfg = config::load(self.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match self.command {
            CliCommand::Check {
                file,
                timeout,
                concurrency,
                run_timeout,
                json,
            } => {
                let cfg = apply_overrides(cfg, timeout, concurrency);
                cfg.validate().context("invalid configuration")?;
                run_check(&cfg, &file, run_timeout.map(Duration::from_secs), json).await?;
            }
            CliCommand::Config => {
                cfg.validate().context("invalid configuration")?;
                run_show_config(&cfg)?;
            }
        }

        Ok(())
    }
}

/// CLI flags win over config file values.
pub(crate) fn apply_overrides(
    mut cfg: UrlmonConfig,
    timeout: Option<u64>,
    concurrency: Option<usize>,
) -> UrlmonConfig {
    if let Some(t) = timeout {
        cfg.timeout_secs = t;
    }
    if let Some(c) = concurrency {
        cfg.concurrency = c;
    }
    cfg
}

#[cfg(test)]
mod tests;
