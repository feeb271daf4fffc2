use crate::models::{GameKey, GameRecord, OddsQuote};
use crate::pipeline::report::DataQualityReport;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A scheduled game with the quote it will be modelled against, if any
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedGame {
    pub game: GameRecord,
    pub quote: Option<OddsQuote>,
}

impl JoinedGame {
    pub fn odds_absent(&self) -> bool {
        self.quote.is_none()
    }
}

/// Pick the last pre-game quote: latest scrape strictly before tip-off,
/// live quotes excluded. Equal timestamps go to the later quote in input
/// order; the second value reports whether that tie-break happened.
pub fn pregame_quote<'a>(
    game: &GameRecord,
    quotes: &[&'a OddsQuote],
) -> (Option<&'a OddsQuote>, bool) {
    let mut best: Option<&OddsQuote> = None;
    let mut tied = false;
    for &quote in quotes {
        if quote.is_live || quote.scrape_timestamp >= game.scheduled_time {
            continue;
        }
        match best {
            Some(current) if quote.scrape_timestamp < current.scrape_timestamp => {}
            Some(current) if quote.scrape_timestamp == current.scrape_timestamp => {
                best = Some(quote);
                tied = true;
            }
            _ => {
                best = Some(quote);
                tied = false;
            }
        }
    }
    (best, tied)
}

/// Join a day's schedule with its odds on the resolved (away, home, date) key
///
/// Games without a usable quote are kept with their odds absent.
pub fn join(
    schedule: Vec<GameRecord>,
    quotes: &[OddsQuote],
    report: &mut DataQualityReport,
) -> Vec<JoinedGame> {
    let mut by_game: HashMap<&GameKey, Vec<&OddsQuote>> = HashMap::new();
    for quote in quotes {
        by_game.entry(&quote.game_key).or_default().push(quote);
    }

    schedule
        .into_iter()
        .map(|game| {
            let candidates = by_game
                .get(&game.game_key)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let (quote, tied) = pregame_quote(&game, candidates);
            if tied {
                debug!(
                    "Several quotes for {} share the latest timestamp, using the last",
                    game.game_key
                );
                report.tie_breaks += 1;
            }
            if quote.is_none() {
                warn!("No pre-game odds for {}", game.game_key);
                report.missing_odds += 1;
            }
            JoinedGame {
                quote: quote.cloned(),
                game,
            }
        })
        .collect()
}
