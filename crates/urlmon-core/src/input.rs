//! Input reader: one URL candidate per line.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Trimmed, non-empty lines that are not `#` comments, in file order.
pub fn parse_targets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a URL list from `path`.
pub fn read_targets(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read URL list {}", path.display()))?;
    Ok(parse_targets(&text))
}
