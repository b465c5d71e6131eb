//! Free-text duration parsing ("3 weeks", "yesterday", "a long time")

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_WITH_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(day|week|month|year)").expect("duration pattern compiles")
});

static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("number pattern compiles"));

/// Bare numbers at or above this are not read as days ("45" is probably an age)
const BARE_NUMBER_LIMIT: u32 = 100;

/// Fuzzy phrases, checked in order when no `<n> <unit>` is present
const FUZZY_PHRASES: &[(&str, u32)] = &[
    ("a week", 7),
    ("one week", 7),
    ("a month", 30),
    ("one month", 30),
    ("yesterday", 1),
    ("today", 0),
    ("long time", 365),
    ("years", 365),
];

/// Convert a duration phrase to a day count
///
/// Expects normalized (lowercased) input. Returns `None` when the text
/// carries no recognizable duration or the count overflows.
pub fn parse_days(text: &str) -> Option<u32> {
    if let Some(caps) = NUMBER_WITH_UNIT.captures(text) {
        let count: u32 = caps.get(1)?.as_str().parse().ok()?;
        let per_unit = match caps.get(2)?.as_str() {
            "day" => 1,
            "week" => 7,
            "month" => 30,
            _ => 365,
        };
        return count.checked_mul(per_unit);
    }

    if let Some((_, days)) = FUZZY_PHRASES.iter().find(|(phrase, _)| text.contains(phrase)) {
        return Some(*days);
    }

    let bare: u32 = BARE_NUMBER.find(text)?.as_str().parse().ok()?;
    (bare < BARE_NUMBER_LIMIT).then_some(bare)
}

/// Shift a parsed count across a threshold when the speaker said "more than"/"less than"
///
/// "more than 2 weeks" is strictly above 14 days even though "2 weeks" parses to 14.
pub fn apply_comparative(text: &str, days: u32) -> u32 {
    const ABOVE: &[&str] = &["more than", "over", "above", "longer than"];
    const BELOW: &[&str] = &["less than", "under", "below", "shorter than"];

    if ABOVE.iter().any(|w| text.contains(w)) {
        days.saturating_add(1)
    } else if BELOW.iter().any(|w| text.contains(w)) {
        days.saturating_sub(1)
    } else {
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_agree() {
        assert_eq!(parse_days("14 days"), Some(14));
        assert_eq!(parse_days("2 weeks"), Some(14));
        assert_eq!(parse_days("14 days"), parse_days("2 weeks"));
        assert_eq!(parse_days("3 months"), Some(90));
        assert_eq!(parse_days("1 year"), Some(365));
        assert_eq!(parse_days("5days"), Some(5));
    }

    #[test]
    fn test_fuzzy_phrases() {
        assert_eq!(parse_days("about a week"), Some(7));
        assert_eq!(parse_days("since yesterday"), Some(1));
        assert_eq!(parse_days("started today"), Some(0));
        assert_eq!(parse_days("a long time"), Some(365));
        assert_eq!(parse_days("for years"), Some(365));
    }

    #[test]
    fn test_bare_numbers() {
        assert_eq!(parse_days("10"), Some(10));
        assert_eq!(parse_days("150"), None);
        assert_eq!(parse_days("no idea"), None);
    }

    #[test]
    fn test_overflow_is_none() {
        assert_eq!(parse_days("99999999999 days"), None);
        assert_eq!(parse_days("4000000000 years"), None);
    }

    #[test]
    fn test_comparatives() {
        assert_eq!(apply_comparative("more than 2 weeks", 14), 15);
        assert_eq!(apply_comparative("less than 5 days", 5), 4);
        assert_eq!(apply_comparative("less than a day", 0), 0);
        assert_eq!(apply_comparative("2 weeks", 14), 14);
    }
}
