//! Output formatting and persistence for the site-data artifact.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Logs a value as pretty-printed JSON at debug level.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    debug!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Serializes `value` as compact JSON to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;

    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}
