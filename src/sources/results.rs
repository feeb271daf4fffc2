use crate::models::{GameKey, GameRecord, Source};
use crate::pipeline::report::DataQualityReport;
use crate::sources::resolve_team;
use crate::teams::NameResolver;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

/// One completed game from the results site
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResultRow {
    #[serde(alias = "Away Team")]
    pub away_team_raw: String,
    #[serde(alias = "Home Team")]
    pub home_team_raw: String,
    #[serde(alias = "Cover Team", default)]
    pub cover_team_raw: String,
    #[serde(alias = "Closing Spread", default)]
    pub closing_spread_text: String,
    #[serde(alias = "Closing Total Line", default)]
    pub closing_total_text: String,
    #[serde(alias = "Actual Total Score", default)]
    pub actual_total_score: String,
    #[serde(alias = "Away Score", default)]
    pub away_score: String,
    #[serde(alias = "Home Score", default)]
    pub home_score: String,
}

fn parse_score(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Attach the day's results to its scheduled games
///
/// The home team covered when the resolved cover team is the home team; a
/// push is not a cover. A game that already has a result keeps it.
pub fn apply_results(
    games: &mut [GameRecord],
    rows: &[RawResultRow],
    date: NaiveDate,
    resolver: &NameResolver,
    report: &mut DataQualityReport,
) {
    for row in rows {
        let away = resolve_team(resolver, report, Source::ResultsSite, &row.away_team_raw, date, "results");
        let home = resolve_team(resolver, report, Source::ResultsSite, &row.home_team_raw, date, "results");
        let (Some(away), Some(home)) = (away, home) else {
            continue;
        };
        let key = GameKey::new(away, home, date);

        let home_covered = if row.cover_team_raw.trim().eq_ignore_ascii_case("push") {
            false
        } else {
            let Some(cover) = resolve_team(
                resolver,
                report,
                Source::ResultsSite,
                &row.cover_team_raw,
                date,
                "results cover team",
            ) else {
                continue;
            };
            if cover != key.away && cover != key.home {
                warn!("Cover team {} did not play in {}", cover, key);
                report.malformed_fields += 1;
                continue;
            }
            cover == key.home
        };

        let Some(game) = games.iter_mut().find(|g| g.game_key == key) else {
            debug!("Result for {} matches no scheduled game", key);
            report.unmatched_results += 1;
            continue;
        };
        if !game.record_result(
            home_covered,
            parse_score(&row.away_score),
            parse_score(&row.home_score),
        ) {
            warn!("Ignoring second result for {}", key);
            report.duplicate_results += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::League;
    use crate::teams::{MatchPolicy, TeamRegistry};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 7).unwrap()
    }

    fn resolver() -> NameResolver {
        let mut registry = TeamRegistry::new();
        for (id, name) in [("duke", "Duke"), ("unc", "N Carolina"), ("kansas", "Kansas")] {
            registry.register(id, name, League::College).unwrap();
            registry.add_variant(Source::ResultsSite, name, id).unwrap();
        }
        NameResolver::new(registry.freeze(), MatchPolicy::default())
    }

    fn row(away: &str, home: &str, cover: &str) -> RawResultRow {
        RawResultRow {
            away_team_raw: away.to_string(),
            home_team_raw: home.to_string(),
            cover_team_raw: cover.to_string(),
            away_score: "70".to_string(),
            home_score: "81".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_results() {
        let time = date().and_hms_opt(19, 0, 0).unwrap();
        let mut games = vec![
            GameRecord::new(GameKey::new("duke", "unc", date()), time),
            GameRecord::new(GameKey::new("kansas", "duke", date()), time),
        ];
        let rows = vec![
            row("Duke", "N Carolina", "N Carolina"),
            row("Kansas", "Duke", "Push"),
            row("Duke", "N Carolina", "Duke"),
            row("N Carolina", "Kansas", "Kansas"),
        ];
        let mut report = DataQualityReport::new();
        apply_results(&mut games, &rows, date(), &resolver(), &mut report);

        assert_eq!(games[0].home_covered, Some(true));
        assert_eq!(games[0].actual_home_score, Some(81));
        assert_eq!(games[1].home_covered, Some(false));
        assert_eq!(report.duplicate_results, 1);
        assert_eq!(report.unmatched_results, 1);
    }

    #[test]
    fn test_cover_team_outside_game_is_malformed() {
        let time = date().and_hms_opt(19, 0, 0).unwrap();
        let mut games = vec![GameRecord::new(GameKey::new("duke", "unc", date()), time)];
        let mut report = DataQualityReport::new();
        apply_results(
            &mut games,
            &[row("Duke", "N Carolina", "Kansas")],
            date(),
            &resolver(),
            &mut report,
        );
        assert!(!games[0].has_result());
        assert_eq!(report.malformed_fields, 1);
    }
}
