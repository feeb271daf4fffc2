use crate::pipeline::features::FeatureRow;
use crate::pipeline::report::DataQualityReport;
use crate::teams::MappingEntry;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;

/// Make sure the parent directory of an output file exists
fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Save any serializable value as pretty JSON
pub fn save_json<T: Serialize + ?Sized>(data: &T, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(data).context("Failed to serialize data")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Save the feature table to CSV, one row per game
///
/// Every row must flatten to the same columns; the first row's columns are the header.
pub fn save_feature_table(rows: &[FeatureRow], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    let Some(first) = rows.first() else {
        writer.flush()?;
        return Ok(());
    };
    let header: Vec<String> = first.columns().into_iter().map(|(name, _)| name).collect();
    writer.write_record(&header)?;

    for row in rows {
        let (names, values): (Vec<String>, Vec<String>) = row.columns().into_iter().unzip();
        if names != header {
            bail!(
                "Row for {} at {} on {} has a different column layout",
                row.away_id,
                row.home_id,
                row.date
            );
        }
        writer.write_record(&values)?;
    }
    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

/// Save the data-quality report as JSON
pub fn save_report(report: &DataQualityReport, path: &Path) -> Result<()> {
    save_json(report, path)
}

/// Save a mapping table (e.g. a fresh skeleton) for manual curation
pub fn save_mapping_table(entries: &[MappingEntry], path: &Path) -> Result<()> {
    save_json(entries, path)
}

/// Load a JSON list of team names
pub fn load_team_names(path: &Path) -> Result<Vec<String>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let names: Vec<String> =
        serde_json::from_str(&json).context("Failed to deserialize team names")?;
    Ok(names)
}
