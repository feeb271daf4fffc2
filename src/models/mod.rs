use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// League a team plays in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum League {
    Pro,
    College,
}

impl League {
    /// Directory code the scrapers file each league's raw data under
    pub fn code(&self) -> &'static str {
        match self {
            League::Pro => "NBA",
            League::College => "NCB",
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            League::Pro => write!(f, "PRO"),
            League::College => write!(f, "COLLEGE"),
        }
    }
}

impl FromStr for League {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pro" | "nba" => Ok(League::Pro),
            "college" | "ncb" | "ncaab" => Ok(League::College),
            other => Err(format!("unknown league: {}", other)),
        }
    }
}

/// Site a raw team name was scraped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    StatsSite,
    Sportsbook,
    ResultsSite,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::StatsSite, Source::Sportsbook, Source::ResultsSite];
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::StatsSite => write!(f, "STATS_SITE"),
            Source::Sportsbook => write!(f, "SPORTSBOOK"),
            Source::ResultsSite => write!(f, "RESULTS_SITE"),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "stats_site" | "stats" | "teamrankings" => Ok(Source::StatsSite),
            "sportsbook" | "draftkings" | "dk" => Ok(Source::Sportsbook),
            "results_site" | "results" | "covers" => Ok(Source::ResultsSite),
            other => Err(format!("unknown source: {}", other)),
        }
    }
}

/// Canonical record for one real-world team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamIdentity {
    pub canonical_id: String,
    pub display_name: String,
    pub league: League,
}

/// A per-source spelling of a team's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVariant {
    pub source: Source,
    pub raw_name: String,
    pub canonical_id: String,
}

/// Identifies one game: (away, home, date) by canonical id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameKey {
    pub away: String,
    pub home: String,
    pub date: NaiveDate,
}

impl GameKey {
    pub fn new(away: impl Into<String>, home: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            away: away.into(),
            home: home.into(),
            date,
        }
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({})", self.away, self.home, self.date)
    }
}

/// One sportsbook line for one game at one scrape time
///
/// `spread` is home-relative: negative means the home team is favored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub game_key: GameKey,
    pub book_name: String,
    pub spread: Option<f64>,
    pub spread_odds: Option<i32>,
    pub away_spread_odds: Option<i32>,
    pub moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub total_line: Option<f64>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    pub scrape_timestamp: NaiveDateTime,
    pub is_live: bool,
}

impl OddsQuote {
    /// Away spread, the mirror of the home-relative spread
    pub fn away_spread(&self) -> Option<f64> {
        self.spread.map(|s| if s == 0.0 { 0.0 } else { -s })
    }
}

/// One scheduled or completed game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_key: GameKey,
    pub away_rank: u32, // 0 = unranked
    pub home_rank: u32,
    pub neutral_site: bool,
    pub scheduled_time: NaiveDateTime,
    pub actual_away_score: Option<u32>,
    pub actual_home_score: Option<u32>,
    pub home_covered: Option<bool>,
}

impl GameRecord {
    pub fn new(game_key: GameKey, scheduled_time: NaiveDateTime) -> Self {
        Self {
            game_key,
            away_rank: 0,
            home_rank: 0,
            neutral_site: false,
            scheduled_time,
            actual_away_score: None,
            actual_home_score: None,
            home_covered: None,
        }
    }

    pub fn has_result(&self) -> bool {
        self.home_covered.is_some()
    }

    /// Attach the realized outcome. Returns false (and leaves the record
    /// untouched) if a result was already recorded.
    pub fn record_result(
        &mut self,
        home_covered: bool,
        away_score: Option<u32>,
        home_score: Option<u32>,
    ) -> bool {
        if self.has_result() {
            return false;
        }
        self.home_covered = Some(home_covered);
        self.actual_away_score = away_score;
        self.actual_home_score = home_score;
        true
    }
}

/// Win-loss-tie record against the spread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtsRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl AtsRecord {
    /// Parse `"W-L-T"`. Anything malformed is a zero record.
    pub fn parse(text: &str) -> Self {
        let parts: Vec<&str> = text.trim().split('-').map(str::trim).collect();
        if parts.len() != 3 {
            return Self::default();
        }
        match (
            parts[0].parse::<u32>(),
            parts[1].parse::<u32>(),
            parts[2].parse::<u32>(),
        ) {
            (Ok(wins), Ok(losses), Ok(ties)) => Self { wins, losses, ties },
            _ => Self::default(),
        }
    }

    pub fn sample_size(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Wins minus losses, pushes counting half
    pub fn net(&self) -> f64 {
        self.wins as f64 + 0.5 * self.ties as f64 - self.losses as f64
    }
}

/// Statistical split published by the stats site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    AllGames,
    IsAfterWin,
    IsAfterLoss,
    IsHome,
    IsAway,
    IsFav,
    IsDog,
    RestAdvantage,
    RestDisadvantage,
    EqualRest,
    FourPlusDaysOff,
    TwoThreeDaysOff,
    OneDayOff,
    NoRest,
}

impl Split {
    pub const ALL: [Split; 14] = [
        Split::AllGames,
        Split::IsAfterWin,
        Split::IsAfterLoss,
        Split::IsHome,
        Split::IsAway,
        Split::IsFav,
        Split::IsDog,
        Split::RestAdvantage,
        Split::RestDisadvantage,
        Split::EqualRest,
        Split::FourPlusDaysOff,
        Split::TwoThreeDaysOff,
        Split::OneDayOff,
        Split::NoRest,
    ];

    /// Key the stats site uses in its URLs and file names
    pub fn key(&self) -> &'static str {
        match self {
            Split::AllGames => "all_games",
            Split::IsAfterWin => "is_after_win",
            Split::IsAfterLoss => "is_after_loss",
            Split::IsHome => "is_home",
            Split::IsAway => "is_away",
            Split::IsFav => "is_fav",
            Split::IsDog => "is_dog",
            Split::RestAdvantage => "rest_advantage",
            Split::RestDisadvantage => "rest_disadvantage",
            Split::EqualRest => "equal_rest",
            Split::FourPlusDaysOff => "four_plus_days_off",
            Split::TwoThreeDaysOff => "two_three_days_off",
            Split::OneDayOff => "one_day_off",
            Split::NoRest => "no_rest",
        }
    }

    pub fn from_key(key: &str) -> Option<Split> {
        Split::ALL.into_iter().find(|s| s.key() == key.trim())
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Window a statistic is aggregated over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    CurrentSeason,
    Last10Years,
    AllTime,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [
        TimeRange::CurrentSeason,
        TimeRange::Last10Years,
        TimeRange::AllTime,
    ];

    /// Column suffix used in the feature table
    pub fn suffix(&self) -> &'static str {
        match self {
            TimeRange::CurrentSeason => "current_season",
            TimeRange::Last10Years => "last_10_seasons",
            TimeRange::AllTime => "all_time",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Aggregate ATS statistic for one team, one split, one time range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRangeStats {
    pub canonical_id: String,
    pub split: Split,
    pub range: TimeRange,
    pub ats_record: AtsRecord,
    pub cover_pct: f64, // always within [0, 1]
    pub mov: f64,
    pub ats_plus_minus: f64,
}

impl TeamRangeStats {
    pub fn stat_line(&self) -> StatLine {
        StatLine {
            sample_size: self.ats_record.sample_size() as f64,
            ats_net: self.ats_record.net(),
            cover_pct: self.cover_pct,
            mov: self.mov,
            ats_plus_minus: self.ats_plus_minus,
        }
    }
}

/// Dense numeric view of a `TeamRangeStats`, the unit the feature table works in
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub sample_size: f64,
    pub ats_net: f64,
    pub cover_pct: f64,
    pub mov: f64,
    pub ats_plus_minus: f64,
}

impl StatLine {
    pub const METRICS: [&'static str; 5] =
        ["Sample Size", "ATS Net", "Cover %", "MOV", "ATS +/-"];

    pub fn values(&self) -> [f64; 5] {
        [
            self.sample_size,
            self.ats_net,
            self.cover_pct,
            self.mov,
            self.ats_plus_minus,
        ]
    }

    pub fn scaled(&self, weight: f64) -> StatLine {
        StatLine {
            sample_size: self.sample_size * weight,
            ats_net: self.ats_net * weight,
            cover_pct: self.cover_pct * weight,
            mov: self.mov * weight,
            ats_plus_minus: self.ats_plus_minus * weight,
        }
    }

    pub fn add(&self, other: &StatLine) -> StatLine {
        StatLine {
            sample_size: self.sample_size + other.sample_size,
            ats_net: self.ats_net + other.ats_net,
            cover_pct: self.cover_pct + other.cover_pct,
            mov: self.mov + other.mov,
            ats_plus_minus: self.ats_plus_minus + other.ats_plus_minus,
        }
    }
}
