use crate::models::{AtsRecord, Source, Split, TeamRangeStats, TimeRange};
use crate::pipeline::report::DataQualityReport;
use crate::sources::{read_csv_rows, resolve_team, DataLayout};
use crate::teams::NameResolver;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// One team's line in a stats-site ATS trends table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStatRow {
    #[serde(alias = "Team")]
    pub team_raw: String,
    #[serde(default)]
    pub split: String,
    #[serde(alias = "ATS Record", default)]
    pub ats_record_text: String,
    #[serde(alias = "Cover %", default)]
    pub cover_pct_text: String,
    #[serde(alias = "MOV", default)]
    pub mov_text: String,
    #[serde(alias = "ATS +/-", default)]
    pub ats_plus_minus_text: String,
}

/// Stats for every loaded (team, split, range)
pub type StatsTable = HashMap<(String, Split, TimeRange), TeamRangeStats>;

/// "55.6%" -> 0.556. Bare numbers above 1 are read as percentages.
/// "--" and anything unreadable is 0; the result is clamped to [0, 1].
pub fn parse_cover_pct(text: &str) -> f64 {
    let trimmed = text.trim();
    let (number, is_percent) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed, false),
    };
    let Ok(value) = number.parse::<f64>() else {
        return 0.0;
    };
    if !value.is_finite() {
        return 0.0;
    }
    let fraction = if is_percent || value > 1.0 {
        value / 100.0
    } else {
        value
    };
    fraction.clamp(0.0, 1.0)
}

/// Signed decimal such as "+3.2" or "-0.8"; "--" and unreadable text are 0
pub fn parse_signed_stat(text: &str) -> f64 {
    let trimmed = text.trim().replace('\u{2212}', "-");
    let unsigned = trimmed.strip_prefix('+').unwrap_or(&trimmed);
    match unsigned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Parse one trends table. A row naming a valid split overrides the file's split.
pub fn to_stats(
    rows: &[RawStatRow],
    split: Split,
    range: TimeRange,
    date: NaiveDate,
    resolver: &NameResolver,
    report: &mut DataQualityReport,
) -> Vec<TeamRangeStats> {
    let context = format!("ats {} {}", range, split);
    rows.iter()
        .filter_map(|row| {
            let canonical_id =
                resolve_team(resolver, report, Source::StatsSite, &row.team_raw, date, &context)?;
            Some(TeamRangeStats {
                canonical_id,
                split: Split::from_key(&row.split).unwrap_or(split),
                range,
                ats_record: AtsRecord::parse(&row.ats_record_text),
                cover_pct: parse_cover_pct(&row.cover_pct_text),
                mov: parse_signed_stat(&row.mov_text),
                ats_plus_minus: parse_signed_stat(&row.ats_plus_minus_text),
            })
        })
        .collect()
}

/// Load the trends tables for the given splits across all three ranges
///
/// Missing or unreadable tables are recorded and contribute nothing.
pub fn load_stats(
    layout: &DataLayout,
    date: NaiveDate,
    splits: &[Split],
    resolver: &NameResolver,
    report: &mut DataQualityReport,
) -> StatsTable {
    let mut table = StatsTable::new();
    for range in TimeRange::ALL {
        for &split in splits {
            let path = layout.trends_path(date, range, split.key());
            let rows: Vec<RawStatRow> = match read_csv_rows(&path) {
                Ok(Some(rows)) => rows,
                Ok(None) => {
                    report.record_missing_file(date, &path);
                    continue;
                }
                Err(err) => {
                    report.record_malformed_file(date, &path, &err.to_string());
                    continue;
                }
            };
            let stats = to_stats(&rows, split, range, date, resolver, report);
            debug!("Loaded {} {} {} stat rows", stats.len(), range, split);
            for stat in stats {
                table.insert(
                    (stat.canonical_id.clone(), stat.split, stat.range),
                    stat,
                );
            }
        }
    }
    table
}
