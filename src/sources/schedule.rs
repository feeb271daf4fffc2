use crate::models::{GameKey, GameRecord, Source};
use crate::pipeline::report::DataQualityReport;
use crate::sources::resolve_team;
use crate::teams::NameResolver;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{debug, warn};

/// One row of the stats site's daily schedule
#[derive(Debug, Clone, Deserialize)]
pub struct RawScheduleRow {
    #[serde(alias = "Matchup")]
    pub matchup_text: String,
    #[serde(alias = "Time", default)]
    pub scheduled_time: String,
}

/// Matchup text split into its two sides
#[derive(Debug, Clone, PartialEq)]
pub struct Matchup {
    pub away: String,
    pub away_rank: u32,
    pub home: String,
    pub home_rank: u32,
    pub neutral_site: bool,
}

/// Strip a leading "#12 " rank off a team name. Unranked is 0.
fn split_rank(side: &str) -> (u32, &str) {
    let side = side.trim();
    let Some(rest) = side.strip_prefix('#') else {
        return (0, side);
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    match rest[..digits_end].parse::<u32>() {
        Ok(rank) => (rank, rest[digits_end..].trim()),
        Err(_) => (0, side),
    }
}

/// Parse "#5 Duke at North Carolina" or "Kansas vs. Kentucky" (neutral site)
pub fn parse_matchup(text: &str) -> Option<Matchup> {
    let text = text.trim();
    let (away, home, neutral_site) = if let Some((away, home)) = text.split_once(" at ") {
        (away, home, false)
    } else if let Some((away, home)) = text.split_once(" vs. ") {
        (away, home, true)
    } else if let Some((away, home)) = text.split_once(" vs ") {
        (away, home, true)
    } else {
        return None;
    };

    let (away_rank, away) = split_rank(away);
    let (home_rank, home) = split_rank(home);
    if away.is_empty() || home.is_empty() {
        return None;
    }
    Some(Matchup {
        away: away.to_string(),
        away_rank,
        home: home.to_string(),
        home_rank,
        neutral_site,
    })
}

const TIME_FORMATS: [&str; 4] = ["%I:%M %p", "%I:%M%p", "%H:%M:%S", "%H:%M"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const TIMEZONE_TOKENS: [&str; 6] = ["ET", "EST", "EDT", "CT", "PT", "UTC"];

/// Parse a schedule time on the given date: "7:00 PM", "7:00 PM ET", "19:30",
/// or a full timestamp
pub fn parse_start_time(date: NaiveDate, text: &str) -> Option<NaiveDateTime> {
    let cleaned: Vec<&str> = text
        .split_whitespace()
        .filter(|token| !TIMEZONE_TOKENS.contains(&token.to_uppercase().as_str()))
        .collect();
    let cleaned = cleaned.join(" ");
    if cleaned.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(datetime);
        }
    }
    let upper = cleaned.to_uppercase();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&upper, format).ok())
        .map(|time| date.and_time(time))
}

/// Turn a day's raw schedule into game records
///
/// Rows whose teams do not resolve are left out of the join and recorded.
pub fn to_games(
    rows: &[RawScheduleRow],
    date: NaiveDate,
    resolver: &NameResolver,
    report: &mut DataQualityReport,
) -> Vec<GameRecord> {
    let mut games: Vec<GameRecord> = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(matchup) = parse_matchup(&row.matchup_text) else {
            warn!("Unparseable matchup '{}' on {}", row.matchup_text, date);
            report.malformed_fields += 1;
            continue;
        };

        let away = resolve_team(resolver, report, Source::StatsSite, &matchup.away, date, "schedule");
        let home = resolve_team(resolver, report, Source::StatsSite, &matchup.home, date, "schedule");
        let (Some(away), Some(home)) = (away, home) else {
            continue;
        };

        let scheduled_time = match parse_start_time(date, &row.scheduled_time) {
            Some(time) => time,
            None => {
                debug!(
                    "Unparsed start time '{}' for {} at {}, using end of day",
                    row.scheduled_time, away, home
                );
                report.malformed_fields += 1;
                date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
            }
        };

        let key = GameKey::new(away, home, date);
        if games.iter().any(|g| g.game_key == key) {
            debug!("Schedule lists {} twice, keeping the first", key);
            continue;
        }
        let mut game = GameRecord::new(key, scheduled_time);
        game.away_rank = matchup.away_rank;
        game.home_rank = matchup.home_rank;
        game.neutral_site = matchup.neutral_site;
        games.push(game);
    }
    games
}
