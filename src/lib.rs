pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod teams;
pub mod utils;

pub use models::*;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::Config;
use error::PipelineError;
use pipeline::features::{build_batch, FeatureRow, RangeWeights};
use pipeline::join::join;
use pipeline::report::DataQualityReport;
use pipeline::stats::{attach_stats, SplitSelection};
use sources::results::{apply_results, RawResultRow};
use sources::schedule::{to_games, RawScheduleRow};
use sources::{odds, read_csv_rows, trends, DataLayout};
use std::path::Path;
use std::sync::Arc;
use teams::{FrozenRegistry, NameResolver};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Everything a per-date worker needs. Shared read-only across workers.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub layout: DataLayout,
    pub resolver: NameResolver,
    pub weights: RangeWeights,
    pub selection: SplitSelection,
}

/// Feature rows and report for one date
#[derive(Debug, Clone)]
pub struct DateOutput {
    pub date: NaiveDate,
    pub rows: Vec<FeatureRow>,
    pub report: DataQualityReport,
}

/// The whole run: every row in date order and the merged report
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub rows: Vec<FeatureRow>,
    pub report: DataQualityReport,
}

/// Unwrap a loader result, recording a missing or unreadable file
fn recorded<T>(
    loaded: Result<Option<T>, PipelineError>,
    path: &Path,
    date: NaiveDate,
    report: &mut DataQualityReport,
) -> Option<T> {
    match loaded {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            report.record_missing_file(date, path);
            None
        }
        Err(err) => {
            report.record_malformed_file(date, path, &err.to_string());
            None
        }
    }
}

/// Build one date's feature rows from its persisted files
///
/// Never fails: missing and malformed files degrade the output and land in
/// the report. Results are optional because upcoming games have none yet.
pub fn process_date(ctx: &BatchContext, date: NaiveDate) -> DateOutput {
    let mut report = DataQualityReport::new();
    report.dates_processed = 1;
    let layout = &ctx.layout;
    let resolver = &ctx.resolver;

    let schedule_path = layout.schedule_path(date);
    let Some(schedule) = recorded(
        read_csv_rows::<RawScheduleRow>(&schedule_path),
        &schedule_path,
        date,
        &mut report,
    ) else {
        return DateOutput {
            date,
            rows: Vec::new(),
            report,
        };
    };
    let mut games = to_games(&schedule, date, resolver, &mut report);
    if games.is_empty() {
        info!("No resolvable games on {}", date);
        return DateOutput {
            date,
            rows: Vec::new(),
            report,
        };
    }

    let odds_path = layout.odds_path(date);
    let quotes = recorded(odds::load_odds_snapshot(&odds_path), &odds_path, date, &mut report)
        .map(|snapshot| {
            report.malformed_fields += snapshot.rejected;
            odds::to_quotes(&snapshot.rows, date, resolver, &mut report)
        })
        .unwrap_or_default();

    let results_path = layout.results_path(date);
    match read_csv_rows::<RawResultRow>(&results_path) {
        Ok(Some(rows)) => apply_results(&mut games, &rows, date, resolver, &mut report),
        Ok(None) => debug!("No results for {} yet", date),
        Err(err) => report.record_malformed_file(date, &results_path, &err.to_string()),
    }

    let table = trends::load_stats(
        layout,
        date,
        &ctx.selection.all_splits(),
        resolver,
        &mut report,
    );

    let partials: Vec<_> = join(games, &quotes, &mut report)
        .into_iter()
        .map(|joined| attach_stats(joined, &table, &ctx.selection, &mut report))
        .collect();
    let rows = build_batch(partials, &ctx.weights, resolver.registry());

    report.rows_emitted = rows.len();
    report.rows_labeled = rows.iter().filter(|row| row.is_labeled()).count();
    info!(
        "{}: {} rows ({} labeled), {} unresolved names",
        date,
        report.rows_emitted,
        report.rows_labeled,
        report.unresolved.len()
    );
    DateOutput { date, rows, report }
}

/// Process every date on a bounded pool of blocking workers
///
/// Rows and reports come back in date order regardless of completion order.
/// Only a worker panic aborts the batch.
pub async fn run_batch(
    ctx: BatchContext,
    dates: Vec<NaiveDate>,
    workers: usize,
) -> Result<BatchOutput, PipelineError> {
    let ctx = Arc::new(ctx);
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();

    for date in dates {
        let ctx = Arc::clone(&ctx);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            tokio::task::spawn_blocking(move || process_date(&ctx, date)).await
        });
    }

    let mut outputs = Vec::new();
    while let Some(joined) = set.join_next().await {
        outputs.push(joined??);
    }
    outputs.sort_by_key(|output| output.date);

    let mut batch = BatchOutput::default();
    for output in outputs {
        batch.rows.extend(output.rows);
        batch.report.merge(output.report);
    }
    Ok(batch)
}

/// Run the configured date range end to end
///
/// Configuration, weight and registry problems stop the run before any date
/// is touched.
pub async fn run(config: &Config) -> Result<BatchOutput> {
    config.validate()?;
    let weights = config.weights().context("Invalid range weights")?;
    let registry: FrozenRegistry = config.mapping.load_registry()?;
    info!(
        "Processing {} {} through {} with {} teams",
        config.mapping.league,
        config.start,
        config.end_date(),
        registry.len()
    );

    let ctx = BatchContext {
        layout: config.layout(),
        resolver: NameResolver::new(registry, config.mapping.policy()),
        weights,
        selection: SplitSelection::default(),
    };
    let output = run_batch(ctx, config.dates(), config.workers).await?;
    Ok(output)
}
