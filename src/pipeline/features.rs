use crate::error::InvalidWeightsError;
use crate::models::{Split, StatLine, TimeRange};
use crate::pipeline::stats::{range_index, Role, StatsRow};
use crate::teams::TeamRegistry;
use crate::utils::odds::implied_probability;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// How much each time range contributes to a weighted metric
///
/// Only constructible through [`RangeWeights::new`], so a value in hand
/// always sums to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeWeights {
    current_season: f64,
    last_10_years: f64,
    all_time: f64,
}

impl RangeWeights {
    pub fn new(
        current_season: f64,
        last_10_years: f64,
        all_time: f64,
    ) -> Result<Self, InvalidWeightsError> {
        for (range, value) in [
            (TimeRange::CurrentSeason, current_season),
            (TimeRange::Last10Years, last_10_years),
            (TimeRange::AllTime, all_time),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidWeightsError::BadValue {
                    range: range.suffix(),
                    value,
                });
            }
        }
        let sum = current_season + last_10_years + all_time;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(InvalidWeightsError::BadSum { sum });
        }
        Ok(Self {
            current_season,
            last_10_years,
            all_time,
        })
    }

    pub fn weight(&self, range: TimeRange) -> f64 {
        match range {
            TimeRange::CurrentSeason => self.current_season,
            TimeRange::Last10Years => self.last_10_years,
            TimeRange::AllTime => self.all_time,
        }
    }

    /// Σ line[range] * weight[range]
    pub fn combine(&self, lines: &[StatLine; 3]) -> StatLine {
        TimeRange::ALL
            .iter()
            .fold(StatLine::default(), |acc, range| {
                acc.add(&lines[range_index(*range)].scaled(self.weight(*range)))
            })
    }
}

impl Default for RangeWeights {
    fn default() -> Self {
        Self {
            current_season: 0.6,
            last_10_years: 0.3,
            all_time: 0.1,
        }
    }
}

/// One role/split group in a feature row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitFeatures {
    pub role: Role,
    pub split: Split,
    pub ranges: [StatLine; 3],
    pub weighted: StatLine,
}

/// The sportsbook numbers a row was built against, with implied probabilities
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OddsFeatures {
    pub book_name: Option<String>,
    pub home_spread: Option<f64>,
    pub away_spread: Option<f64>,
    pub home_spread_odds: Option<i32>,
    pub away_spread_odds: Option<i32>,
    pub home_moneyline: Option<i32>,
    pub away_moneyline: Option<i32>,
    pub total_line: Option<f64>,
    pub over_odds: Option<i32>,
    pub under_odds: Option<i32>,
    pub home_spread_prob: Option<f64>,
    pub away_spread_prob: Option<f64>,
    pub home_moneyline_prob: Option<f64>,
    pub away_moneyline_prob: Option<f64>,
    pub over_prob: Option<f64>,
    pub under_prob: Option<f64>,
}

/// One game's training or inference example
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub scheduled_time: NaiveDateTime,
    pub away_id: String,
    pub home_id: String,
    pub away_index: Option<usize>,
    pub home_index: Option<usize>,
    pub favorite_id: Option<String>,
    pub underdog_id: Option<String>,
    pub favorite_index: Option<usize>,
    pub underdog_index: Option<usize>,
    pub away_rank: u32,
    pub home_rank: u32,
    pub neutral_site: bool,
    pub odds: OddsFeatures,
    pub splits: Vec<SplitFeatures>,
    pub spread_difference: f64,
    /// Away minus home implied probability of the spread prices
    pub implied_odds_difference: Option<f64>,
    pub away_scoring_metric: f64,
    pub home_scoring_metric: f64,
    pub mov_ats_ratio: f64,
    /// Dense rank among the batch's away (or home) metrics, 1 = best; 0 until the batch is ranked
    pub away_scoring_rank: u32,
    pub home_scoring_rank: u32,
    pub venue_edge: f64,
    pub favorite_edge: f64,
    pub away_rest_days_advantage: f64,
    pub home_rest_days_advantage: f64,
    pub odds_absent: bool,
    pub roles_assigned: bool,
    pub neutral_fills: usize,
    pub actual_away_score: Option<u32>,
    pub actual_home_score: Option<u32>,
    pub home_covered: Option<bool>,
}

impl FeatureRow {
    pub fn split(&self, role: Role, split: Split) -> Option<&SplitFeatures> {
        self.splits
            .iter()
            .find(|s| s.role == role && s.split == split)
    }

    fn weighted_mov(&self, role: Role, split: Split) -> f64 {
        self.split(role, split).map(|s| s.weighted.mov).unwrap_or(0.0)
    }

    pub fn is_labeled(&self) -> bool {
        self.home_covered.is_some()
    }

    /// Flatten into (column, value) pairs; absent values are empty cells
    pub fn columns(&self) -> Vec<(String, String)> {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        let mut columns: Vec<(String, String)> = vec![
            ("Date".into(), self.date.format("%Y-%m-%d").to_string()),
            ("Scheduled Time".into(), self.scheduled_time.format("%Y-%m-%d %H:%M:%S").to_string()),
            ("Away Team".into(), self.away_id.clone()),
            ("Home Team".into(), self.home_id.clone()),
            ("Away Index".into(), opt(&self.away_index)),
            ("Home Index".into(), opt(&self.home_index)),
            ("Favorite Team".into(), opt(&self.favorite_id)),
            ("Underdog Team".into(), opt(&self.underdog_id)),
            ("Favorite Index".into(), opt(&self.favorite_index)),
            ("Underdog Index".into(), opt(&self.underdog_index)),
            ("Away Rank".into(), self.away_rank.to_string()),
            ("Home Rank".into(), self.home_rank.to_string()),
            ("Neutral Site".into(), self.neutral_site.to_string()),
            ("Book Name".into(), opt(&self.odds.book_name)),
            ("Home Spread".into(), opt(&self.odds.home_spread)),
            ("Away Spread".into(), opt(&self.odds.away_spread)),
            ("Home Spread Odds".into(), opt(&self.odds.home_spread_odds)),
            ("Away Spread Odds".into(), opt(&self.odds.away_spread_odds)),
            ("Home ML".into(), opt(&self.odds.home_moneyline)),
            ("Away ML".into(), opt(&self.odds.away_moneyline)),
            ("Total".into(), opt(&self.odds.total_line)),
            ("Over Odds".into(), opt(&self.odds.over_odds)),
            ("Under Odds".into(), opt(&self.odds.under_odds)),
            ("Home Spread Prob".into(), opt(&self.odds.home_spread_prob)),
            ("Away Spread Prob".into(), opt(&self.odds.away_spread_prob)),
            ("Home ML Prob".into(), opt(&self.odds.home_moneyline_prob)),
            ("Away ML Prob".into(), opt(&self.odds.away_moneyline_prob)),
            ("Over Prob".into(), opt(&self.odds.over_prob)),
            ("Under Prob".into(), opt(&self.odds.under_prob)),
        ];

        for group in &self.splits {
            for range in TimeRange::ALL {
                let values = group.ranges[range_index(range)].values();
                for (metric, value) in StatLine::METRICS.iter().zip(values) {
                    columns.push((
                        format!("{} {} {} {}", group.role, group.split, metric, range.suffix()),
                        value.to_string(),
                    ));
                }
            }
            for (metric, value) in StatLine::METRICS.iter().zip(group.weighted.values()) {
                columns.push((
                    format!("{} {} {}_weighted", group.role, group.split, metric),
                    value.to_string(),
                ));
            }
        }

        columns.extend([
            ("Spread Difference".into(), self.spread_difference.to_string()),
            ("Implied Odds Difference".into(), opt(&self.implied_odds_difference)),
            ("Away Scoring Metric".into(), self.away_scoring_metric.to_string()),
            ("Home Scoring Metric".into(), self.home_scoring_metric.to_string()),
            ("MOV ATS Ratio".into(), self.mov_ats_ratio.to_string()),
            ("Away Scoring Rank".into(), self.away_scoring_rank.to_string()),
            ("Home Scoring Rank".into(), self.home_scoring_rank.to_string()),
            ("Venue Edge".into(), self.venue_edge.to_string()),
            ("Favorite Edge".into(), self.favorite_edge.to_string()),
            ("Away Rest Days Advantage".into(), self.away_rest_days_advantage.to_string()),
            ("Home Rest Days Advantage".into(), self.home_rest_days_advantage.to_string()),
            ("Odds Absent".into(), self.odds_absent.to_string()),
            ("Roles Assigned".into(), self.roles_assigned.to_string()),
            ("Neutral Fills".into(), self.neutral_fills.to_string()),
            ("Away Score".into(), opt(&self.actual_away_score)),
            ("Home Score".into(), opt(&self.actual_home_score)),
            ("Home Covered".into(), opt(&self.home_covered.map(u8::from))),
        ]);
        columns
    }
}

const RATIO_GUARD: f64 = 1e-9;

fn probability(odds: Option<i32>) -> Option<f64> {
    odds.and_then(|o| implied_probability(o).ok())
}

/// Away over home scoring metric; the guard keeps a zero home metric finite
fn ratio(away: f64, home: f64) -> f64 {
    away / (home + RATIO_GUARD)
}

/// Build one row. Scoring ranks stay 0 here because they only mean something
/// across a batch; use [`build_batch`] for a day's games.
pub fn build_row(partial: StatsRow, weights: &RangeWeights, registry: &TeamRegistry) -> FeatureRow {
    let splits: Vec<SplitFeatures> = partial
        .stats
        .iter()
        .map(|group| SplitFeatures {
            role: group.role,
            split: group.split,
            ranges: group.ranges,
            weighted: weights.combine(&group.ranges),
        })
        .collect();

    let quote = partial.joined.quote.as_ref();
    let odds = quote
        .map(|q| OddsFeatures {
            book_name: Some(q.book_name.clone()),
            home_spread: q.spread,
            away_spread: q.away_spread(),
            home_spread_odds: q.spread_odds,
            away_spread_odds: q.away_spread_odds,
            home_moneyline: q.moneyline,
            away_moneyline: q.away_moneyline,
            total_line: q.total_line,
            over_odds: q.over_odds,
            under_odds: q.under_odds,
            home_spread_prob: probability(q.spread_odds),
            away_spread_prob: probability(q.away_spread_odds),
            home_moneyline_prob: probability(q.moneyline),
            away_moneyline_prob: probability(q.away_moneyline),
            over_prob: probability(q.over_odds),
            under_prob: probability(q.under_odds),
        })
        .unwrap_or_default();

    // Spreads do not vary by range, so the weighted spread is the spread itself
    let spread_difference =
        odds.away_spread.unwrap_or(0.0) - odds.home_spread.unwrap_or(0.0);
    let implied_odds_difference = odds
        .away_spread_prob
        .zip(odds.home_spread_prob)
        .map(|(away, home)| away - home);

    let game = &partial.joined.game;
    let key = &game.game_key;
    let index = |id: &Option<String>| id.as_deref().and_then(|id| registry.encoding_index(id));

    let mut row = FeatureRow {
        date: key.date,
        scheduled_time: game.scheduled_time,
        away_id: key.away.clone(),
        home_id: key.home.clone(),
        away_index: registry.encoding_index(&key.away),
        home_index: registry.encoding_index(&key.home),
        favorite_index: index(&partial.favorite),
        underdog_index: index(&partial.underdog),
        favorite_id: partial.favorite.clone(),
        underdog_id: partial.underdog.clone(),
        away_rank: game.away_rank,
        home_rank: game.home_rank,
        neutral_site: game.neutral_site,
        odds_absent: partial.joined.odds_absent(),
        odds,
        splits,
        spread_difference,
        implied_odds_difference,
        away_scoring_metric: 0.0,
        home_scoring_metric: 0.0,
        mov_ats_ratio: 0.0,
        away_scoring_rank: 0,
        home_scoring_rank: 0,
        venue_edge: 0.0,
        favorite_edge: 0.0,
        away_rest_days_advantage: 0.0,
        home_rest_days_advantage: 0.0,
        roles_assigned: partial.roles_assigned,
        neutral_fills: partial.neutral_fills,
        actual_away_score: game.actual_away_score,
        actual_home_score: game.actual_home_score,
        home_covered: game.home_covered,
    };

    let scoring = |row: &FeatureRow, role: Role| {
        row.split(role, Split::AllGames)
            .map(|s| s.weighted.mov + s.weighted.ats_plus_minus)
            .unwrap_or(0.0)
    };
    row.away_scoring_metric = scoring(&row, Role::Away);
    row.home_scoring_metric = scoring(&row, Role::Home);
    row.mov_ats_ratio = ratio(row.away_scoring_metric, row.home_scoring_metric);
    row.venue_edge =
        row.weighted_mov(Role::Home, Split::IsHome) - row.weighted_mov(Role::Away, Split::IsAway);
    row.favorite_edge = row.weighted_mov(Role::Favorite, Split::IsFav)
        - row.weighted_mov(Role::Underdog, Split::IsDog);
    let rest = |row: &FeatureRow, role: Role| {
        row.weighted_mov(role, Split::RestAdvantage) - row.weighted_mov(role, Split::RestDisadvantage)
    };
    row.away_rest_days_advantage = rest(&row, Role::Away);
    row.home_rest_days_advantage = rest(&row, Role::Home);
    row
}

/// Dense descending rank of each value, 1 = largest; equal values share a rank
fn dense_ranks(values: &[f64]) -> Vec<u32> {
    let mut distinct = values.to_vec();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());

    values
        .iter()
        .map(|value| {
            distinct
                .iter()
                .position(|d| d.total_cmp(value).is_eq())
                .map(|p| p as u32 + 1)
                .unwrap_or(0)
        })
        .collect()
}

/// Rank the batch's away metrics among themselves and its home metrics among themselves
pub fn assign_scoring_ranks(rows: &mut [FeatureRow]) {
    let away: Vec<f64> = rows.iter().map(|row| row.away_scoring_metric).collect();
    let home: Vec<f64> = rows.iter().map(|row| row.home_scoring_metric).collect();
    let ranks = dense_ranks(&away).into_iter().zip(dense_ranks(&home));
    for (row, (away_rank, home_rank)) in rows.iter_mut().zip(ranks) {
        row.away_scoring_rank = away_rank;
        row.home_scoring_rank = home_rank;
    }
}

/// Build every row of one batch (a day's games) and rank them together
pub fn build_batch(
    partials: Vec<StatsRow>,
    weights: &RangeWeights,
    registry: &TeamRegistry,
) -> Vec<FeatureRow> {
    let mut rows: Vec<FeatureRow> = partials
        .into_iter()
        .map(|partial| build_row(partial, weights, registry))
        .collect();
    assign_scoring_ranks(&mut rows);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameKey, GameRecord, League, OddsQuote, Source};
    use crate::pipeline::join::JoinedGame;
    use crate::pipeline::stats::RoleSplitStats;
    use approx::assert_relative_eq;

    fn line(mov: f64, ats_plus_minus: f64) -> StatLine {
        StatLine {
            mov,
            ats_plus_minus,
            ..Default::default()
        }
    }

    fn registry() -> TeamRegistry {
        let mut registry = TeamRegistry::new();
        for id in ["a", "b", "c", "d"] {
            registry.register(id, id, League::Pro).unwrap();
            registry.add_variant(Source::StatsSite, id, id).unwrap();
        }
        registry
    }

    fn partial(away: &str, home: &str, away_all: f64, home_all: f64) -> StatsRow {
        let date = NaiveDate::from_ymd_opt(2024, 12, 7).unwrap();
        let key = GameKey::new(away, home, date);
        let mut game = GameRecord::new(key.clone(), date.and_hms_opt(19, 0, 0).unwrap());
        game.record_result(true, Some(98), Some(110));
        let quote = OddsQuote {
            game_key: key,
            book_name: "DraftKings".to_string(),
            spread: Some(-3.5),
            spread_odds: Some(-110),
            away_spread_odds: Some(-110),
            moneyline: Some(-150),
            away_moneyline: Some(130),
            total_line: Some(220.5),
            over_odds: Some(-110),
            under_odds: Some(-110),
            scrape_timestamp: date.and_hms_opt(18, 0, 0).unwrap(),
            is_live: false,
        };
        StatsRow {
            joined: JoinedGame {
                game,
                quote: Some(quote),
            },
            favorite: Some(home.to_string()),
            underdog: Some(away.to_string()),
            roles_assigned: true,
            stats: vec![
                RoleSplitStats {
                    role: Role::Away,
                    split: Split::AllGames,
                    ranges: [line(away_all, 0.0); 3],
                },
                RoleSplitStats {
                    role: Role::Home,
                    split: Split::AllGames,
                    ranges: [line(home_all, 1.0); 3],
                },
                RoleSplitStats {
                    role: Role::Home,
                    split: Split::IsHome,
                    ranges: [line(6.0, 0.0); 3],
                },
                RoleSplitStats {
                    role: Role::Away,
                    split: Split::IsAway,
                    ranges: [line(-1.0, 0.0); 3],
                },
                RoleSplitStats {
                    role: Role::Home,
                    split: Split::RestAdvantage,
                    ranges: [line(3.0, 0.0); 3],
                },
                RoleSplitStats {
                    role: Role::Home,
                    split: Split::RestDisadvantage,
                    ranges: [line(-1.5, 0.0); 3],
                },
            ],
            neutral_fills: 0,
        }
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(RangeWeights::new(0.6, 0.3, 0.1).is_ok());
        assert!(RangeWeights::new(1.0, 0.0, 0.0).is_ok());
        assert!(RangeWeights::new(0.6, 0.3, 0.1000005).is_ok());
        assert!(matches!(
            RangeWeights::new(0.5, 0.3, 0.1),
            Err(InvalidWeightsError::BadSum { .. })
        ));
        assert!(matches!(
            RangeWeights::new(1.2, -0.1, -0.1),
            Err(InvalidWeightsError::BadValue { .. })
        ));
        assert!(RangeWeights::new(f64::NAN, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_weighted_mov() {
        let weights = RangeWeights::new(0.6, 0.3, 0.1).unwrap();
        let lines = [line(10.0, 0.0), line(5.0, 0.0), line(0.0, 0.0)];
        assert_relative_eq!(weights.combine(&lines).mov, 7.5, epsilon = 1e-12);
    }

    #[test]
    fn test_build_row_derivations() {
        let row = build_row(partial("a", "b", 2.0, 5.0), &RangeWeights::default(), &registry());

        assert_relative_eq!(row.spread_difference, 7.0, epsilon = 1e-12);
        assert_relative_eq!(row.away_scoring_metric, 2.0, epsilon = 1e-12);
        assert_relative_eq!(row.home_scoring_metric, 6.0, epsilon = 1e-12);
        assert_relative_eq!(row.venue_edge, 7.0, epsilon = 1e-12);
        assert_eq!(row.away_index, Some(0));
        assert_eq!(row.favorite_index, Some(1));
        assert_relative_eq!(row.odds.home_moneyline_prob.unwrap(), 0.6, epsilon = 1e-12);
        assert_eq!(row.home_covered, Some(true));
        assert_eq!(row.away_scoring_rank, 0);
    }

    #[test]
    fn test_away_and_home_ranked_separately() {
        let rows = build_batch(
            vec![partial("a", "b", 10.0, 4.0), partial("c", "d", 1.0, 2.0)],
            &RangeWeights::new(1.0, 0.0, 0.0).unwrap(),
            &registry(),
        );
        // Away metrics 10 and 1, home metrics 5 and 3
        assert_eq!(rows[0].away_scoring_rank, 1);
        assert_eq!(rows[1].away_scoring_rank, 2);
        assert_eq!(rows[0].home_scoring_rank, 1);
        assert_eq!(rows[1].home_scoring_rank, 2);
    }

    #[test]
    fn test_rank_is_dense() {
        let rows = build_batch(
            vec![
                partial("a", "b", 2.0, 5.0),
                partial("c", "d", 6.0, -1.0),
                partial("a", "d", 2.0, -1.0),
            ],
            &RangeWeights::new(1.0, 0.0, 0.0).unwrap(),
            &registry(),
        );
        let away: Vec<u32> = rows.iter().map(|r| r.away_scoring_rank).collect();
        let home: Vec<u32> = rows.iter().map(|r| r.home_scoring_rank).collect();
        assert_eq!(away, vec![2, 1, 2]);
        assert_eq!(home, vec![1, 2, 2]);
    }

    #[test]
    fn test_implied_odds_difference_uses_spread_prices() {
        let mut stats = partial("a", "b", 2.0, 5.0);
        if let Some(quote) = stats.joined.quote.as_mut() {
            quote.away_spread_odds = Some(105);
            quote.spread_odds = Some(-125);
        }
        let row = build_row(stats, &RangeWeights::default(), &registry());
        assert_relative_eq!(
            row.implied_odds_difference.unwrap(),
            100.0 / 205.0 - 125.0 / 225.0,
            epsilon = 1e-12
        );

        let mut no_prices = partial("a", "b", 2.0, 5.0);
        if let Some(quote) = no_prices.joined.quote.as_mut() {
            quote.away_spread_odds = None;
        }
        let row = build_row(no_prices, &RangeWeights::default(), &registry());
        assert_eq!(row.implied_odds_difference, None);
    }

    #[test]
    fn test_mov_ats_ratio_is_guarded() {
        let row = build_row(partial("a", "b", 3.0, 5.0), &RangeWeights::default(), &registry());
        assert_relative_eq!(row.mov_ats_ratio, 0.5, epsilon = 1e-9);

        // Home metric of exactly zero (-1 MOV, +1 ATS +/-) stays finite
        let current_only = RangeWeights::new(1.0, 0.0, 0.0).unwrap();
        let row = build_row(partial("a", "b", 3.0, -1.0), &current_only, &registry());
        assert!(row.mov_ats_ratio.is_finite());
        assert_relative_eq!(row.mov_ats_ratio, 3.0e9, max_relative = 1e-9);
    }

    #[test]
    fn test_rest_days_advantage_per_side() {
        let row = build_row(partial("a", "b", 2.0, 5.0), &RangeWeights::default(), &registry());
        assert_relative_eq!(row.home_rest_days_advantage, 4.5, epsilon = 1e-12);
        // The away side has no rest splits attached, so both terms are zero
        assert_eq!(row.away_rest_days_advantage, 0.0);
    }

    #[test]
    fn test_columns_are_stable() {
        let row = build_row(partial("a", "b", 2.0, 5.0), &RangeWeights::default(), &registry());
        let columns = row.columns();
        let names: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
        assert!(names.contains(&"Home is_home MOV_weighted"));
        assert!(names.contains(&"Away all_games Cover % last_10_seasons"));
        for derived in ["Implied Odds Difference", "MOV ATS Ratio", "Home Rest Days Advantage"] {
            assert!(names.contains(&derived), "{}", derived);
        }
        assert_eq!(columns.last().unwrap(), &("Home Covered".to_string(), "1".to_string()));

        let mut unlabeled = row.clone();
        unlabeled.home_covered = None;
        assert_eq!(unlabeled.columns().last().unwrap().1, "");
    }
}
