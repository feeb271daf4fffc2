use crate::error::MalformedOddsError;

/// Markers the sportsbook scraper writes when a cell was empty or missing
const ABSENT_MARKERS: [&str; 4] = ["", "-999", "n/a", "--"];

/// Trim the text and swap the typographic minus sportsbooks render for ASCII
fn clean(text: &str) -> Result<String, MalformedOddsError> {
    let cleaned = text.trim().replace(['\u{2212}', '\u{2013}'], "-");
    if ABSENT_MARKERS.contains(&cleaned.to_lowercase().as_str()) {
        return Err(MalformedOddsError::new(text, "value absent"));
    }
    Ok(cleaned)
}

/// Split an optional leading sign off the text
fn split_sign(text: &str) -> (f64, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        (-1.0, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (1.0, rest)
    } else {
        (1.0, text)
    }
}

/// Parse a signed point spread: "+3.5", "-7", "PK"
pub fn parse_spread(text: &str) -> Result<f64, MalformedOddsError> {
    let cleaned = clean(text)?;
    if matches!(cleaned.to_lowercase().as_str(), "pk" | "pick" | "pick'em") {
        return Ok(0.0);
    }
    let (sign, digits) = split_sign(&cleaned);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(MalformedOddsError::new(text, "spread is not a signed decimal"));
    }
    digits
        .parse::<f64>()
        .map(|value| sign * value)
        .map_err(|_| MalformedOddsError::new(text, "spread is not a signed decimal"))
}

/// Parse a game total, tolerating an over/under prefix: "O 220.5", "u221"
pub fn parse_total(text: &str) -> Result<f64, MalformedOddsError> {
    let cleaned = clean(text)?;
    let lower = cleaned.to_lowercase();
    let number = lower
        .strip_prefix("o/u")
        .or_else(|| lower.strip_prefix('o'))
        .or_else(|| lower.strip_prefix('u'))
        .unwrap_or(&lower)
        .trim();
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(MalformedOddsError::new(text, "total is not a decimal"));
    }
    number
        .parse::<f64>()
        .map_err(|_| MalformedOddsError::new(text, "total is not a decimal"))
}

/// Parse American odds: "-110", "+150", "Even"
pub fn parse_american_odds(text: &str) -> Result<i32, MalformedOddsError> {
    let cleaned = clean(text)?;
    if matches!(cleaned.to_lowercase().as_str(), "even" | "ev") {
        return Ok(100);
    }
    let (sign, digits) = split_sign(&cleaned);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(MalformedOddsError::new(text, "odds are not a signed integer"));
    }
    let magnitude = digits
        .parse::<i32>()
        .map_err(|_| MalformedOddsError::new(text, "odds are out of range"))?;
    if magnitude == 0 {
        return Err(MalformedOddsError::new(text, "odds of zero are invalid"));
    }
    Ok(if sign < 0.0 { -magnitude } else { magnitude })
}

/// Convert American odds to implied probability
/// Positive odds (+150) mean you win $150 on a $100 bet
/// Negative odds (-150) mean you need to bet $150 to win $100
pub fn implied_probability(odds: i32) -> Result<f64, MalformedOddsError> {
    if odds > 0 {
        // For positive odds: 100 / (odds + 100)
        Ok(100.0 / (odds as f64 + 100.0))
    } else if odds < 0 {
        // For negative odds: |odds| / (|odds| + 100)
        let abs_odds = (odds as f64).abs();
        Ok(abs_odds / (abs_odds + 100.0))
    } else {
        Err(MalformedOddsError::new("0", "odds of zero are invalid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_spread() {
        assert_eq!(parse_spread("+3.5").unwrap(), 3.5);
        assert_eq!(parse_spread("-7").unwrap(), -7.0);
        assert_eq!(parse_spread(" 4.5 ").unwrap(), 4.5);
        // DraftKings renders a unicode minus
        assert_eq!(parse_spread("\u{2212}2.5").unwrap(), -2.5);
        assert_eq!(parse_spread("PK").unwrap(), 0.0);

        assert!(parse_spread("abc").is_err());
        assert!(parse_spread("+").is_err());
        assert!(parse_spread("-3.5x").is_err());
        assert!(parse_spread("-999").is_err());
        assert!(parse_spread("").is_err());
    }

    #[test]
    fn test_parse_american_odds() {
        assert_eq!(parse_american_odds("Even").unwrap(), 100);
        assert_eq!(parse_american_odds("EV").unwrap(), 100);
        assert_eq!(parse_american_odds("-110").unwrap(), -110);
        assert_eq!(parse_american_odds("+150").unwrap(), 150);
        assert_eq!(parse_american_odds("\u{2212}125").unwrap(), -125);
        assert_eq!(parse_american_odds("200").unwrap(), 200);

        assert!(parse_american_odds("0").is_err());
        assert!(parse_american_odds("-0").is_err());
        assert!(parse_american_odds("-11.5").is_err());
        assert!(parse_american_odds("N/A").is_err());
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total("220.5").unwrap(), 220.5);
        assert_eq!(parse_total("O 220.5").unwrap(), 220.5);
        assert_eq!(parse_total("u141").unwrap(), 141.0);
        assert!(parse_total("over").is_err());
    }

    #[test]
    fn test_implied_probability() {
        assert_relative_eq!(implied_probability(-110).unwrap(), 0.5238, epsilon = 1e-4);
        assert_relative_eq!(implied_probability(150).unwrap(), 0.4, epsilon = 1e-12);
        assert_relative_eq!(implied_probability(100).unwrap(), 0.5, epsilon = 1e-12);
        assert!(implied_probability(0).is_err());
    }

    #[test]
    fn test_implied_probability_bounds_and_monotonicity() {
        let favorites = [-105, -150, -300, -1000];
        let underdogs = [105, 150, 300, 1000];
        for pair in favorites.windows(2) {
            assert!(implied_probability(pair[0]).unwrap() < implied_probability(pair[1]).unwrap());
        }
        for pair in underdogs.windows(2) {
            assert!(implied_probability(pair[0]).unwrap() > implied_probability(pair[1]).unwrap());
        }
        for odds in favorites.iter().chain(underdogs.iter()) {
            let p = implied_probability(*odds).unwrap();
            assert!(p > 0.0 && p < 1.0);
        }
    }
}
