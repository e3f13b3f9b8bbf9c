use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_yaml::Value;

use crate::model::LoafRecord;

pub fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    Ok(())
}

pub fn load_record(path: &Path) -> Result<LoafRecord> {
    ensure_file_exists(path)?;

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Invalid YAML syntax in {}", path.display()))?;
    let record = LoafRecord::from_value(value)
        .with_context(|| format!("failed to load loaf record from {}", path.display()))?;

    Ok(record)
}

pub fn write_record(path: &Path, record: &LoafRecord) -> Result<()> {
    let data = serde_yaml::to_string(record.fields())
        .with_context(|| format!("failed to serialize yaml: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create yaml file: {}", path.display()))?;
    file.write_all(data.as_bytes())
        .with_context(|| format!("failed to write yaml file: {}", path.display()))?;

    Ok(())
}

/// Rounds to `places` decimals from the exact binary value, so results agree
/// with the decimal a reader would compute by hand (70.27027 -> 70.3).
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}
