//! Raw tables persisted by the scrapers, and the per-date file layout they live in.
//!
//! Every loader distinguishes a missing file (`Ok(None)`, "no data for that
//! date") from a file that exists but cannot be parsed (`Err`). Neither is
//! fatal to a batch; the orchestrator records both in the data-quality report.

pub mod odds;
pub mod results;
pub mod schedule;
pub mod trends;

use crate::error::PipelineError;
use crate::models::{League, Source, TimeRange};
use crate::pipeline::report::DataQualityReport;
use crate::teams::{NameResolver, Resolution};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCHEDULE_FILE: &str = "daily_schedule.csv";
pub const ODDS_FILE: &str = "dk_odds.json";
pub const RESULTS_FILE: &str = "game_results.csv";
pub const TRENDS_DIR: &str = "ats";

/// Folder names the stats site's three time ranges are stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFolders {
    pub current_season: String,
    pub last_10_years: String,
    pub all_time: String,
}

impl Default for RangeFolders {
    fn default() -> Self {
        Self {
            current_season: "current".to_string(),
            last_10_years: "yearly_since_2014_2015".to_string(),
            all_time: "yearly_all".to_string(),
        }
    }
}

impl RangeFolders {
    pub fn folder(&self, range: TimeRange) -> &str {
        match range {
            TimeRange::CurrentSeason => &self.current_season,
            TimeRange::Last10Years => &self.last_10_years,
            TimeRange::AllTime => &self.all_time,
        }
    }
}

/// `<root>/<LEAGUE>/<YYYY-MM-DD>/...`
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub root: PathBuf,
    pub league: League,
    pub ranges: RangeFolders,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, league: League, ranges: RangeFolders) -> Self {
        Self {
            root: root.into(),
            league,
            ranges,
        }
    }

    pub fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(self.league.code())
            .join(date.format("%Y-%m-%d").to_string())
    }

    pub fn schedule_path(&self, date: NaiveDate) -> PathBuf {
        self.date_dir(date).join(SCHEDULE_FILE)
    }

    pub fn odds_path(&self, date: NaiveDate) -> PathBuf {
        self.date_dir(date).join(ODDS_FILE)
    }

    pub fn results_path(&self, date: NaiveDate) -> PathBuf {
        self.date_dir(date).join(RESULTS_FILE)
    }

    pub fn trends_path(&self, date: NaiveDate, range: TimeRange, split_key: &str) -> PathBuf {
        self.date_dir(date)
            .join(TRENDS_DIR)
            .join(self.ranges.folder(range))
            .join(format!("{}.csv", split_key))
    }
}

/// Read every row of a headed CSV file, or `None` if the file does not exist
pub fn read_csv_rows<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, PipelineError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        })?);
    }
    Ok(Some(rows))
}

/// Read a JSON document, or `None` if the file does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PipelineError> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|source| PipelineError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Resolve a raw name to a canonical id, recording anything short of an exact match
pub fn resolve_team(
    resolver: &NameResolver,
    report: &mut DataQualityReport,
    source: Source,
    raw_name: &str,
    date: NaiveDate,
    context: &str,
) -> Option<String> {
    match resolver.resolve_or_flag(source, raw_name) {
        Resolution::Exact { canonical_id } => Some(canonical_id),
        Resolution::Fuzzy {
            canonical_id,
            score,
        } => {
            info!(
                "Fuzzy matched {} name '{}' to {} (score {:.3})",
                source, raw_name, canonical_id, score
            );
            report.fuzzy_matches += 1;
            Some(canonical_id)
        }
        Resolution::Unresolved { raw_name } => {
            report.record_unresolved(source, &raw_name, date, context);
            None
        }
    }
}

/// Accept a JSON string, number, bool or null where the scrapers are inconsistent
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Accept a JSON bool, a "true"/"false" string, 0/1 or null as a flag
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(flag) => flag,
        serde_json::Value::String(s) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1")
        }
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}
