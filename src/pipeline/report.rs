use crate::models::Source;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// A raw name no variant or fuzzy match could place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedName {
    pub source: Source,
    pub raw_name: String,
    pub date: NaiveDate,
    pub context: String,
}

/// A daily file that was missing or could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIssue {
    pub date: NaiveDate,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-run account of everything that degraded a row instead of failing the batch
///
/// An all-zero report is the success case; it is still produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub dates_processed: usize,
    pub rows_emitted: usize,
    pub rows_labeled: usize,
    pub unresolved: Vec<UnresolvedName>,
    pub missing_files: Vec<FileIssue>,
    pub malformed_files: Vec<FileIssue>,
    pub fuzzy_matches: usize,
    pub missing_odds: usize,
    pub tie_breaks: usize,
    pub neutral_fills: usize,
    pub malformed_fields: usize,
    pub spread_sign_conflicts: usize,
    pub unassigned_roles: usize,
    pub duplicate_results: usize,
    pub unmatched_results: usize,
}

impl DataQualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unresolved(&mut self, source: Source, raw_name: &str, date: NaiveDate, context: &str) {
        warn!("Unresolved {} name '{}' on {} ({})", source, raw_name, date, context);
        self.unresolved.push(UnresolvedName {
            source,
            raw_name: raw_name.to_string(),
            date,
            context: context.to_string(),
        });
    }

    pub fn record_missing_file(&mut self, date: NaiveDate, path: &Path) {
        warn!("No data for {}: {} is missing", date, path.display());
        self.missing_files.push(FileIssue {
            date,
            path: path.display().to_string(),
            detail: None,
        });
    }

    pub fn record_malformed_file(&mut self, date: NaiveDate, path: &Path, detail: &str) {
        warn!("Skipping malformed file {}: {}", path.display(), detail);
        self.malformed_files.push(FileIssue {
            date,
            path: path.display().to_string(),
            detail: Some(detail.to_string()),
        });
    }

    /// Fold another (per-date) report into this one
    pub fn merge(&mut self, other: DataQualityReport) {
        self.dates_processed += other.dates_processed;
        self.rows_emitted += other.rows_emitted;
        self.rows_labeled += other.rows_labeled;
        self.unresolved.extend(other.unresolved);
        self.missing_files.extend(other.missing_files);
        self.malformed_files.extend(other.malformed_files);
        self.fuzzy_matches += other.fuzzy_matches;
        self.missing_odds += other.missing_odds;
        self.tie_breaks += other.tie_breaks;
        self.neutral_fills += other.neutral_fills;
        self.malformed_fields += other.malformed_fields;
        self.spread_sign_conflicts += other.spread_sign_conflicts;
        self.unassigned_roles += other.unassigned_roles;
        self.duplicate_results += other.duplicate_results;
        self.unmatched_results += other.unmatched_results;
    }

    /// Distinct (source, name) pairs awaiting manual curation
    pub fn unresolved_names(&self) -> BTreeSet<(Source, String)> {
        self.unresolved
            .iter()
            .map(|u| (u.source, u.raw_name.clone()))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
            && self.missing_files.is_empty()
            && self.malformed_files.is_empty()
            && self.missing_odds == 0
            && self.tie_breaks == 0
            && self.neutral_fills == 0
            && self.malformed_fields == 0
            && self.spread_sign_conflicts == 0
            && self.unassigned_roles == 0
            && self.duplicate_results == 0
            && self.unmatched_results == 0
    }
}

impl fmt::Display for DataQualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Dates: {} | Rows: {} ({} labeled)",
            self.dates_processed, self.rows_emitted, self.rows_labeled
        )?;
        writeln!(
            f,
            "Unresolved names: {} ({} distinct) | Fuzzy matches: {}",
            self.unresolved.len(),
            self.unresolved_names().len(),
            self.fuzzy_matches
        )?;
        writeln!(
            f,
            "Missing files: {} | Malformed files: {} | Malformed fields: {}",
            self.missing_files.len(),
            self.malformed_files.len(),
            self.malformed_fields
        )?;
        writeln!(
            f,
            "Missing odds: {} | Tie-breaks: {} | Spread sign conflicts: {} | Unassigned roles: {}",
            self.missing_odds, self.tie_breaks, self.spread_sign_conflicts, self.unassigned_roles
        )?;
        write!(
            f,
            "Neutral fills: {} | Duplicate results: {} | Unmatched results: {}",
            self.neutral_fills, self.duplicate_results, self.unmatched_results
        )
    }
}
