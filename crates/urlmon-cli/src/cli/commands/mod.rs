//! CLI command handlers.

mod check;
mod config;

pub use check::run_check;
pub use config::run_show_config;
