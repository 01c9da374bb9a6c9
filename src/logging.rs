use std::fs::{self, File};
use std::path::Path;
use std::str::FromStr;

use color_eyre::eyre::{Result, eyre};
use tracing::Level;

/// Installs a plain-text subscriber writing to `output_path`.
///
/// An unknown `level` falls back to `info`.
pub fn init_file_logging(output_path: &Path, level: &str) -> Result<()> {
    ensure_parent_dir(output_path)?;
    let file = File::options().create(true).append(true).open(output_path)?;

    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(false)
        .with_max_level(parse_level(level))
        .with_writer(std::sync::Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| eyre!("failed to set tracing subscriber: {e}"))?;
    Ok(())
}

pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
