//! `urlmon config` – print the effective configuration.

use anyhow::Result;
use urlmon_core::config::UrlmonConfig;

pub fn run_show_config(cfg: &UrlmonConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
