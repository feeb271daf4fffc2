// tests/pipeline.rs
use std::fs;
use std::path::{Path, PathBuf};

use basketball_trends::config::{Config, MappingArgs};
use basketball_trends::pipeline::{Role, FeatureRow};
use basketball_trends::{League, Split};
use chrono::NaiveDate;

fn tmp_dir(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("basketball_trends_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&p);
    fs::create_dir_all(&p).unwrap();
    p
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

const MAPPING: &str = r#"[
    {
        "Team Rankings Name": "New York",
        "DraftKings Name": "NY Knicks",
        "TeamID": "NYK",
        "Full Name": "New York Knicks",
        "Covers": "New York"
    },
    {
        "Team Rankings Name": "Boston",
        "DraftKings Name": "BOS Celtics",
        "TeamID": "BOS",
        "Full Name": "Boston Celtics",
        "Covers": "Boston"
    }
]"#;

const ODDS: &str = r#"[
    [{
        "Scrape Time": "2024-12-07 17:00:00",
        "Book Name": "DraftKings",
        "Start Time": "Today 7:30 PM",
        "Away Team": "NY Knicks",
        "Away Spread": "+3.5",
        "Away Spread Odds": "-110",
        "Total": "221.5",
        "Over Total Odds": "-110",
        "Away ML": "+140",
        "Home Team": "BOS Celtics",
        "Home Spread": "-3.5",
        "Home Spread Odds": "-110",
        "Under Total Odds": "-110",
        "Home ML": "-165"
    }]
]"#;

fn seed(root: &Path) {
    let day1 = root.join("NBA/2024-12-07");
    let day2 = root.join("NBA/2024-12-08");
    let schedule = "Rank,Matchup,Time\n1,New York at Boston,7:30 PM\n";

    write(&day1.join("daily_schedule.csv"), schedule);
    write(&day1.join("dk_odds.json"), ODDS);
    write(
        &day1.join("game_results.csv"),
        "Away Team,Home Team,Cover Team,Closing Spread,Closing Total Line,Actual Total Score\n\
         New York,Boston,Boston,-3.5,221.5,215\n",
    );
    write(
        &day1.join("ats/current/is_fav.csv"),
        "Team,ATS Record,Cover %,MOV,ATS +/-\nBoston,12-6-1,66.7%,+4.0,+2.5\n",
    );
    write(
        &day1.join("ats/current/is_dog.csv"),
        "Team,ATS Record,Cover %,MOV,ATS +/-\nNew York,5-7-0,41.7%,-2.0,-1.1\n",
    );

    // Second day has a schedule but the odds scrape never ran
    write(&day2.join("daily_schedule.csv"), schedule);
}

fn config(root: &Path) -> Config {
    let date = NaiveDate::from_ymd_opt(2024, 12, 7).unwrap();
    Config {
        mapping: MappingArgs {
            mapping: root.join("team_mapping.json"),
            league: League::Pro,
            fuzzy_threshold: 0.8,
            fuzzy_margin: 0.05,
        },
        data_dir: root.to_path_buf(),
        out_dir: root.join("out"),
        start: date,
        end: date.succ_opt(),
        weight_current: 1.0,
        weight_last_10: 0.0,
        weight_all_time: 0.0,
        workers: 2,
        current_season_folder: "current".to_string(),
        last_10_folder: "yearly_since_2014_2015".to_string(),
        all_time_folder: "yearly_all".to_string(),
    }
}

fn weighted_mov(row: &FeatureRow, role: Role, split: Split) -> f64 {
    row.split(role, split).unwrap().weighted.mov
}

#[tokio::test]
async fn batch_joins_roles_and_survives_missing_odds() {
    let root = tmp_dir("batch");
    write(&root.join("team_mapping.json"), MAPPING);
    seed(&root);

    let output = basketball_trends::run(&config(&root)).await.unwrap();
    let report = &output.report;

    assert_eq!(output.rows.len(), 2);
    assert_eq!(report.dates_processed, 2);
    assert!(report.unresolved.is_empty());

    let first = &output.rows[0];
    assert_eq!(first.away_id, "NYK");
    assert_eq!(first.home_id, "BOS");
    assert_eq!(first.favorite_id.as_deref(), Some("BOS"));
    assert!((weighted_mov(first, Role::Favorite, Split::IsFav) - 4.0).abs() < 1e-9);
    assert!((weighted_mov(first, Role::Underdog, Split::IsDog) + 2.0).abs() < 1e-9);
    assert!((first.spread_difference - 7.0).abs() < 1e-9);
    assert_eq!(first.home_covered, Some(true));
    assert_eq!(first.away_rank, 0);

    // Missing odds file: row still produced, odds absent, event recorded
    let second = &output.rows[1];
    assert!(second.odds_absent);
    assert_eq!(second.odds.home_spread, None);
    assert_eq!(second.spread_difference, 0.0);
    assert!(!second.roles_assigned);
    assert_eq!(second.home_covered, None);
    assert_eq!(report.missing_odds, 1);
    assert!(report
        .missing_files
        .iter()
        .any(|f| f.path.ends_with("2024-12-08/dk_odds.json")));
    assert_eq!(report.rows_labeled, 1);

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn missing_schedule_is_not_fatal() {
    let root = tmp_dir("no_schedule");
    write(&root.join("team_mapping.json"), MAPPING);

    let output = basketball_trends::run(&config(&root)).await.unwrap();
    assert!(output.rows.is_empty());
    assert_eq!(output.report.dates_processed, 2);
    assert_eq!(output.report.missing_files.len(), 2);

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn unreadable_odds_file_is_reported_and_other_dates_survive() {
    let root = tmp_dir("bad_odds");
    write(&root.join("team_mapping.json"), MAPPING);
    seed(&root);
    write(&root.join("NBA/2024-12-08/dk_odds.json"), "{not json");

    let output = basketball_trends::run(&config(&root)).await.unwrap();
    let report = &output.report;

    assert_eq!(output.rows.len(), 2);
    assert_eq!(output.rows[0].favorite_id.as_deref(), Some("BOS"));
    assert!(!output.rows[0].odds_absent);
    assert!(output.rows[1].odds_absent);
    assert_eq!(report.malformed_files.len(), 1);
    assert!(report.malformed_files[0]
        .path
        .ends_with("2024-12-08/dk_odds.json"));
    assert!(!report
        .missing_files
        .iter()
        .any(|f| f.path.ends_with("2024-12-08/dk_odds.json")));

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn unreadable_schedule_skips_only_that_date() {
    let root = tmp_dir("bad_schedule");
    write(&root.join("team_mapping.json"), MAPPING);
    seed(&root);
    // No Matchup column, so no row can be read
    write(
        &root.join("NBA/2024-12-08/daily_schedule.csv"),
        "Rank,Game,Time\n1,New York at Boston,7:30 PM\n",
    );

    let output = basketball_trends::run(&config(&root)).await.unwrap();
    let report = &output.report;

    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.rows[0].date, NaiveDate::from_ymd_opt(2024, 12, 7).unwrap());
    assert_eq!(report.dates_processed, 2);
    assert!(report
        .malformed_files
        .iter()
        .any(|f| f.path.ends_with("2024-12-08/daily_schedule.csv")));

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn conflicting_mapping_aborts_before_any_date() {
    let root = tmp_dir("conflict");
    write(
        &root.join("team_mapping.json"),
        r#"[
            {"TeamID": "BOS", "Team Rankings Name": "Boston", "DraftKings Name": "Celtics"},
            {"TeamID": "NYK", "Team Rankings Name": "New York", "DraftKings Name": "Celtics"}
        ]"#,
    );
    seed(&root);

    assert!(basketball_trends::run(&config(&root)).await.is_err());
    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn invalid_weights_fail_instead_of_defaulting() {
    let root = tmp_dir("weights");
    write(&root.join("team_mapping.json"), MAPPING);
    let mut config = config(&root);
    config.weight_current = 0.5;

    let err = basketball_trends::run(&config).await.unwrap_err();
    assert!(err.to_string().contains("Invalid range weights"));
    fs::remove_dir_all(&root).unwrap();
}
