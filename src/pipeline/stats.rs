use crate::models::{OddsQuote, Split, StatLine, TimeRange};
use crate::pipeline::join::JoinedGame;
use crate::pipeline::report::DataQualityReport;
use crate::sources::trends::StatsTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Which column group a team's stats land in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Away,
    Home,
    Favorite,
    Underdog,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Away, Role::Home, Role::Favorite, Role::Underdog];

    pub fn label(&self) -> &'static str {
        match self {
            Role::Away => "Away",
            Role::Home => "Home",
            Role::Favorite => "Favorite",
            Role::Underdog => "Underdog",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Splits attached per role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSelection {
    pub away: Vec<Split>,
    pub home: Vec<Split>,
    pub favorite: Vec<Split>,
    pub underdog: Vec<Split>,
}

impl Default for SplitSelection {
    fn default() -> Self {
        Self {
            away: vec![
                Split::AllGames,
                Split::IsAway,
                Split::RestAdvantage,
                Split::RestDisadvantage,
            ],
            home: vec![
                Split::AllGames,
                Split::IsHome,
                Split::RestAdvantage,
                Split::RestDisadvantage,
            ],
            favorite: vec![Split::IsFav],
            underdog: vec![Split::IsDog],
        }
    }
}

impl SplitSelection {
    pub fn splits_for(&self, role: Role) -> &[Split] {
        match role {
            Role::Away => &self.away,
            Role::Home => &self.home,
            Role::Favorite => &self.favorite,
            Role::Underdog => &self.underdog,
        }
    }

    /// Every split some role needs, each once
    pub fn all_splits(&self) -> Vec<Split> {
        let mut splits: Vec<Split> = Role::ALL
            .iter()
            .flat_map(|role| self.splits_for(*role).iter().copied())
            .collect();
        splits.sort();
        splits.dedup();
        splits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Away,
    Home,
}

/// Decide which side is favored from the home-relative spread, falling back
/// to the moneylines when the spread is missing or zero
pub fn favorite_side(quote: Option<&OddsQuote>) -> Option<Side> {
    let quote = quote?;
    match quote.spread {
        Some(spread) if spread < 0.0 => return Some(Side::Home),
        Some(spread) if spread > 0.0 => return Some(Side::Away),
        _ => {}
    }
    match (quote.moneyline, quote.away_moneyline) {
        (Some(home), Some(away)) if home < away => Some(Side::Home),
        (Some(home), Some(away)) if away < home => Some(Side::Away),
        (Some(home), None) if home < 0 => Some(Side::Home),
        (Some(home), None) if home > 100 => Some(Side::Away),
        (None, Some(away)) if away < 0 => Some(Side::Away),
        (None, Some(away)) if away > 100 => Some(Side::Home),
        _ => None,
    }
}

/// One split's stats for one role, one line per range in `TimeRange::ALL` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSplitStats {
    pub role: Role,
    pub split: Split,
    pub ranges: [StatLine; 3],
}

impl RoleSplitStats {
    pub fn range(&self, range: TimeRange) -> &StatLine {
        &self.ranges[range_index(range)]
    }
}

pub(crate) fn range_index(range: TimeRange) -> usize {
    match range {
        TimeRange::CurrentSeason => 0,
        TimeRange::Last10Years => 1,
        TimeRange::AllTime => 2,
    }
}

/// A joined game with both teams' stats attached by role
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub joined: JoinedGame,
    pub favorite: Option<String>,
    pub underdog: Option<String>,
    pub roles_assigned: bool,
    pub stats: Vec<RoleSplitStats>,
    /// (team, split, range) slots filled with zeros for lack of data
    pub neutral_fills: usize,
}

impl StatsRow {
    pub fn get(&self, role: Role, split: Split) -> Option<&RoleSplitStats> {
        self.stats
            .iter()
            .find(|s| s.role == role && s.split == split)
    }

    pub fn team(&self, role: Role) -> Option<&str> {
        match role {
            Role::Away => Some(&self.joined.game.game_key.away),
            Role::Home => Some(&self.joined.game.game_key.home),
            Role::Favorite => self.favorite.as_deref(),
            Role::Underdog => self.underdog.as_deref(),
        }
    }
}

/// Attach every selected (split, range) stat for both teams
///
/// Favorite and underdog columns follow the pre-game quote, so the same team
/// lands in different columns from game to game. Missing stats are zero-filled
/// and counted.
pub fn attach_stats(
    joined: JoinedGame,
    table: &StatsTable,
    selection: &SplitSelection,
    report: &mut DataQualityReport,
) -> StatsRow {
    let key = &joined.game.game_key;
    let (favorite, underdog) = match favorite_side(joined.quote.as_ref()) {
        Some(Side::Home) => (Some(key.home.clone()), Some(key.away.clone())),
        Some(Side::Away) => (Some(key.away.clone()), Some(key.home.clone())),
        None => (None, None),
    };
    let roles_assigned = favorite.is_some();
    if !roles_assigned {
        warn!("Cannot tell favorite from underdog for {}", key);
        report.unassigned_roles += 1;
    }

    let mut row = StatsRow {
        joined,
        favorite,
        underdog,
        roles_assigned,
        stats: Vec::new(),
        neutral_fills: 0,
    };

    for role in Role::ALL {
        let team = row.team(role).map(str::to_string);
        for &split in selection.splits_for(role) {
            let mut ranges = [StatLine::default(); 3];
            for range in TimeRange::ALL {
                let found = team
                    .as_ref()
                    .and_then(|id| table.get(&(id.clone(), split, range)));
                match found {
                    Some(stats) => ranges[range_index(range)] = stats.stat_line(),
                    None => row.neutral_fills += 1,
                }
            }
            row.stats.push(RoleSplitStats {
                role,
                split,
                ranges,
            });
        }
    }

    if row.neutral_fills > 0 {
        debug!(
            "Zero-filled {} stat slots for {}",
            row.neutral_fills, row.joined.game.game_key
        );
        report.neutral_fills += row.neutral_fills;
    }
    row
}
