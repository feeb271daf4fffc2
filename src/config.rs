use crate::error::InvalidWeightsError;
use crate::models::League;
use crate::pipeline::features::RangeWeights;
use crate::sources::{DataLayout, RangeFolders};
use crate::teams::{build_registry, load_mapping_table, FrozenRegistry, MatchPolicy};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;

/// Where the curated team mapping lives and how strictly names are matched against it
#[derive(Args, Debug, Clone)]
pub struct MappingArgs {
    /// Curated team mapping table (JSON)
    #[arg(long, env = "TEAM_MAPPING", default_value = "team_mapping.json")]
    pub mapping: PathBuf,

    /// League to process: pro (NBA) or college (NCB)
    #[arg(long, env = "LEAGUE", default_value = "college")]
    pub league: League,

    /// Minimum normalized edit-distance similarity for a fuzzy name match
    #[arg(long, env = "FUZZY_THRESHOLD", default_value = "0.8")]
    pub fuzzy_threshold: f64,

    /// Lead the best fuzzy candidate needs over the runner-up
    #[arg(long, env = "FUZZY_MARGIN", default_value = "0.05")]
    pub fuzzy_margin: f64,
}

impl MappingArgs {
    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            threshold: self.fuzzy_threshold,
            margin: self.fuzzy_margin,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            anyhow::bail!("fuzzy_threshold must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&self.fuzzy_margin) {
            anyhow::bail!("fuzzy_margin must be between 0.0 and 1.0");
        }
        Ok(())
    }

    /// Load the mapping table and build the frozen registry. Integrity errors are fatal.
    pub fn load_registry(&self) -> Result<FrozenRegistry> {
        let entries = load_mapping_table(&self.mapping)
            .with_context(|| format!("Failed to load team mapping {}", self.mapping.display()))?;
        let registry = build_registry(&entries, self.league)
            .context("Team mapping failed integrity checks; fix it and rerun")?;
        Ok(registry.freeze())
    }
}

/// Settings for one batch run over a date range
#[derive(Args, Debug, Clone)]
pub struct Config {
    #[command(flatten)]
    pub mapping: MappingArgs,

    /// Root of the persisted raw data (<data-dir>/<NBA|NCB>/<YYYY-MM-DD>/...)
    #[arg(long, env = "DATA_DIR", default_value = "raw_data")]
    pub data_dir: PathBuf,

    /// Where the feature table and data-quality report are written
    #[arg(long, env = "OUT_DIR", default_value = "proc_data")]
    pub out_dir: PathBuf,

    /// First date to process (YYYY-MM-DD)
    #[arg(long, env = "START_DATE")]
    pub start: NaiveDate,

    /// Last date to process, inclusive. Defaults to the start date.
    #[arg(long, env = "END_DATE")]
    pub end: Option<NaiveDate>,

    /// Weight of current-season stats
    #[arg(long, env = "WEIGHT_CURRENT", default_value = "0.6")]
    pub weight_current: f64,

    /// Weight of trailing-10-year stats
    #[arg(long, env = "WEIGHT_LAST_10", default_value = "0.3")]
    pub weight_last_10: f64,

    /// Weight of all-time stats
    #[arg(long, env = "WEIGHT_ALL_TIME", default_value = "0.1")]
    pub weight_all_time: f64,

    /// Dates processed in parallel
    #[arg(long, env = "WORKERS", default_value = "4")]
    pub workers: usize,

    /// Folder holding current-season trends
    #[arg(long, env = "CURRENT_SEASON_FOLDER", default_value = "current")]
    pub current_season_folder: String,

    /// Folder holding trailing-10-year trends
    #[arg(long, env = "LAST_10_FOLDER", default_value = "yearly_since_2014_2015")]
    pub last_10_folder: String,

    /// Folder holding all-time trends
    #[arg(long, env = "ALL_TIME_FOLDER", default_value = "yearly_all")]
    pub all_time_folder: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.mapping.validate()?;
        if self.end_date() < self.start {
            anyhow::bail!(
                "end date {} is before start date {}",
                self.end_date(),
                self.start
            );
        }
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        Ok(())
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.unwrap_or(self.start)
    }

    /// Every date from start to end, inclusive
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|date| *date <= self.end_date())
            .collect()
    }

    /// Not validated by `validate`; the feature builder's weights are checked where they are built
    pub fn weights(&self) -> Result<RangeWeights, InvalidWeightsError> {
        RangeWeights::new(self.weight_current, self.weight_last_10, self.weight_all_time)
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(
            self.data_dir.clone(),
            self.mapping.league,
            RangeFolders {
                current_season: self.current_season_folder.clone(),
                last_10_years: self.last_10_folder.clone(),
                all_time: self.all_time_folder.clone(),
            },
        )
    }

    pub fn feature_table_path(&self) -> PathBuf {
        self.out_dir.join(format!(
            "{}_features_{}_{}.csv",
            self.mapping.league.code(),
            self.start.format("%Y-%m-%d"),
            self.end_date().format("%Y-%m-%d")
        ))
    }

    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join(format!(
            "{}_report_{}_{}.json",
            self.mapping.league.code(),
            self.start.format("%Y-%m-%d"),
            self.end_date().format("%Y-%m-%d")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["test"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().config
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--start", "2024-12-01", "--end", "2024-12-03", "--league", "NBA"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.mapping.league, League::Pro);
        assert_eq!(config.dates().len(), 3);
        assert_eq!(config.workers, 4);
        assert!(config.weights().is_ok());
        assert_eq!(
            config.feature_table_path(),
            PathBuf::from("proc_data/NBA_features_2024-12-01_2024-12-03.csv")
        );
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let inverted = parse(&["--start", "2024-12-03", "--end", "2024-12-01"]);
        assert!(inverted.validate().is_err());

        let no_workers = parse(&["--start", "2024-12-03", "--workers", "0"]);
        assert!(no_workers.validate().is_err());

        let bad_threshold = parse(&["--start", "2024-12-03", "--fuzzy-threshold", "1.5"]);
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_bad_weights_are_an_error_not_a_default() {
        let config = parse(&["--start", "2024-12-03", "--weight-current", "0.9"]);
        assert!(config.validate().is_ok());
        assert!(config.weights().is_err());
    }
}
