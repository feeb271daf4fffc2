use crate::error::MalformedOddsError;
use crate::models::{GameKey, OddsQuote, Source};
use crate::pipeline::report::DataQualityReport;
use crate::sources::{lenient_flag, lenient_text, resolve_team};
use crate::teams::NameResolver;
use crate::utils::odds::{parse_american_odds, parse_spread, parse_total};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// What the sportsbook scraper writes in the start time column once a game is underway
const LIVE_MARKER: &str = "live game";

/// One scraped sportsbook line, before any parsing
///
/// Field names follow the raw odds contract; the aliases are the column
/// names the sportsbook scraper writes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOddsRow {
    #[serde(alias = "Book Name", default, deserialize_with = "lenient_text")]
    pub book_name: String,
    #[serde(alias = "Away Team", default, deserialize_with = "lenient_text")]
    pub away_team_raw: String,
    #[serde(alias = "Home Team", default, deserialize_with = "lenient_text")]
    pub home_team_raw: String,
    #[serde(alias = "Home Spread", default, deserialize_with = "lenient_text")]
    pub spread_text: String,
    #[serde(alias = "Home Spread Odds", default, deserialize_with = "lenient_text")]
    pub spread_odds_text: String,
    #[serde(alias = "Home ML", default, deserialize_with = "lenient_text")]
    pub moneyline_text: String,
    #[serde(alias = "Away Spread", default, deserialize_with = "lenient_text")]
    pub away_spread_text: String,
    #[serde(alias = "Away Spread Odds", default, deserialize_with = "lenient_text")]
    pub away_spread_odds_text: String,
    #[serde(alias = "Away ML", default, deserialize_with = "lenient_text")]
    pub away_moneyline_text: String,
    #[serde(alias = "Total", default, deserialize_with = "lenient_text")]
    pub total_text: String,
    #[serde(alias = "Over Total Odds", default, deserialize_with = "lenient_text")]
    pub over_odds_text: String,
    #[serde(alias = "Under Total Odds", default, deserialize_with = "lenient_text")]
    pub under_odds_text: String,
    #[serde(alias = "Scrape Time", default, deserialize_with = "lenient_text")]
    pub scrape_timestamp: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_live: bool,
    #[serde(alias = "Start Time", default, deserialize_with = "lenient_text")]
    pub start_time: String,
}

impl RawOddsRow {
    pub fn is_live(&self) -> bool {
        self.is_live || self.start_time.trim().eq_ignore_ascii_case(LIVE_MARKER)
    }
}

/// Rows read from one odds snapshot, plus how many elements could not be read as a row
#[derive(Debug, Clone, Default)]
pub struct OddsSnapshot {
    pub rows: Vec<RawOddsRow>,
    pub rejected: usize,
}

impl OddsSnapshot {
    /// The scraper wraps each row in a one-element list; plain objects are accepted too.
    /// Elements are converted one at a time so a bad one only costs itself.
    fn from_entries(entries: Vec<Value>) -> Self {
        let mut snapshot = OddsSnapshot::default();
        for entry in entries {
            let items = match entry {
                Value::Array(items) => items,
                plain => vec![plain],
            };
            for item in items {
                match serde_json::from_value::<RawOddsRow>(item) {
                    Ok(row) => snapshot.rows.push(row),
                    Err(err) => {
                        warn!("Skipping unreadable odds row: {}", err);
                        snapshot.rejected += 1;
                    }
                }
            }
        }
        snapshot
    }
}

/// Parse an odds snapshot. Only a document that is not a JSON list is an error.
pub fn parse_odds_document(json: &str) -> Result<OddsSnapshot, serde_json::Error> {
    let entries: Vec<Value> = serde_json::from_str(json)?;
    Ok(OddsSnapshot::from_entries(entries))
}

/// Load `dk_odds.json`, `None` if the file is absent
pub fn load_odds_snapshot(
    path: &std::path::Path,
) -> Result<Option<OddsSnapshot>, crate::error::PipelineError> {
    let entries: Option<Vec<Value>> = crate::sources::read_json(path)?;
    Ok(entries.map(OddsSnapshot::from_entries))
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

pub fn parse_scrape_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.naive_local());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Parse a field that must be present. Failures count as malformed and leave it absent.
fn required<T>(
    text: &str,
    parse: fn(&str) -> Result<T, MalformedOddsError>,
    report: &mut DataQualityReport,
) -> Option<T> {
    match parse(text) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("{}", err);
            report.malformed_fields += 1;
            None
        }
    }
}

/// Parse a supplementary field that sportsbooks often leave out
fn optional<T>(
    text: &str,
    parse: fn(&str) -> Result<T, MalformedOddsError>,
    report: &mut DataQualityReport,
) -> Option<T> {
    if text.trim().is_empty() {
        return None;
    }
    required(text, parse, report)
}

/// Keep the home-relative spread consistent with the away side
fn reconcile_spread(
    home: Option<f64>,
    away: Option<f64>,
    key: &GameKey,
    report: &mut DataQualityReport,
) -> Option<f64> {
    match (home, away) {
        (Some(home), Some(away)) => {
            if (home + away).abs() > 1e-9 {
                warn!(
                    "Spread sign conflict for {}: home {} vs away {}, keeping home",
                    key, home, away
                );
                report.spread_sign_conflicts += 1;
            }
            Some(home)
        }
        (None, Some(away)) => Some(if away == 0.0 { 0.0 } else { -away }),
        (home, None) => home,
    }
}

/// Turn a day's raw odds rows into quotes keyed by resolved team pairs
///
/// Rows with an unresolved team or an unreadable scrape timestamp are not
/// quotes; both are recorded.
pub fn to_quotes(
    rows: &[RawOddsRow],
    date: NaiveDate,
    resolver: &NameResolver,
    report: &mut DataQualityReport,
) -> Vec<OddsQuote> {
    let mut quotes = Vec::with_capacity(rows.len());
    for row in rows {
        let away = resolve_team(resolver, report, Source::Sportsbook, &row.away_team_raw, date, "odds");
        let home = resolve_team(resolver, report, Source::Sportsbook, &row.home_team_raw, date, "odds");
        let (Some(away), Some(home)) = (away, home) else {
            continue;
        };

        let Some(scrape_timestamp) = parse_scrape_timestamp(&row.scrape_timestamp) else {
            warn!(
                "Dropping {} at {} quote with unreadable scrape time '{}'",
                away, home, row.scrape_timestamp
            );
            report.malformed_fields += 1;
            continue;
        };

        let game_key = GameKey::new(away, home, date);
        let home_spread = required(&row.spread_text, parse_spread, report);
        let away_spread = optional(&row.away_spread_text, parse_spread, report);
        let spread = reconcile_spread(home_spread, away_spread, &game_key, report);

        quotes.push(OddsQuote {
            book_name: row.book_name.trim().to_string(),
            spread,
            spread_odds: required(&row.spread_odds_text, parse_american_odds, report),
            away_spread_odds: optional(&row.away_spread_odds_text, parse_american_odds, report),
            moneyline: required(&row.moneyline_text, parse_american_odds, report),
            away_moneyline: optional(&row.away_moneyline_text, parse_american_odds, report),
            total_line: required(&row.total_text, parse_total, report),
            over_odds: required(&row.over_odds_text, parse_american_odds, report),
            under_odds: required(&row.under_odds_text, parse_american_odds, report),
            scrape_timestamp,
            is_live: row.is_live(),
            game_key,
        });
    }
    quotes
}
