//! Match format classification from heading and match-number text.

use crate::models::MatchFormat;

/// Explicit format tokens, checked in order. The first hit wins.
const FORMAT_TOKENS: &[(MatchFormat, &[&str])] = &[
    (MatchFormat::T20, &[" t20 ", "twenty20", "t20i"]),
    (MatchFormat::ODI, &[" odi ", "one-day", "1st odi"]),
    (MatchFormat::Test, &[" test ", "day series", "unofficial test"]),
];

/// Tournament names that imply a format, checked after the explicit tokens.
const TOURNAMENT_ALIASES: &[(MatchFormat, &[&str])] = &[
    (MatchFormat::T20, &["wbbl", "bbl"]),
    (MatchFormat::ODI, &["one day cup", "list a"]),
    (MatchFormat::Test, &["first-class", "sheffield shield"]),
];

/// Classify the stored format of a match.
///
/// Never guesses: when no token or alias matches the result is `Unknown`.
pub fn classify_format(team_heading: &str, match_number_venue: &str) -> MatchFormat {
    let combined = format!("{} {}", team_heading, match_number_venue).to_lowercase();

    first_match(&combined, FORMAT_TOKENS)
        .or_else(|| first_match(&combined, TOURNAMENT_ALIASES))
        .unwrap_or(MatchFormat::Unknown)
}

/// Format used to decide prediction eligibility.
///
/// Women's fixtures with no recognisable format token are almost always T20
/// internationals on the source page, so `Unknown` is promoted for them. This
/// never feeds back into the stored format.
pub fn prediction_format(stored: MatchFormat, team_heading: &str) -> MatchFormat {
    if stored == MatchFormat::Unknown && team_heading.to_lowercase().contains("women") {
        MatchFormat::T20
    } else {
        stored
    }
}

fn first_match(text: &str, table: &[(MatchFormat, &[&str])]) -> Option<MatchFormat> {
    table
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|t| text.contains(t)))
        .map(|(format, _)| *format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_tokens() {
        assert_eq!(
            classify_format("India vs Australia,", "2nd T20I • Sydney Cricket Ground"),
            MatchFormat::T20
        );
        assert_eq!(
            classify_format("India vs Australia,", "3rd ODI • Melbourne Cricket Ground"),
            MatchFormat::ODI
        );
        assert_eq!(
            classify_format("England vs India,", "1st Test • Headingley, Leeds"),
            MatchFormat::Test
        );
        assert_eq!(
            classify_format("Kent vs Surrey,", "Match 4 • Canterbury, One-Day Cup"),
            MatchFormat::ODI
        );
    }

    #[test]
    fn test_t20_wins_over_test() {
        assert_eq!(
            classify_format("Test XI vs T20 Stars", "Exhibition test match"),
            MatchFormat::T20
        );
    }

    #[test]
    fn test_tournament_aliases() {
        assert_eq!(
            classify_format("Sixers vs Heat,", "Match 12 • BBL 2024-25"),
            MatchFormat::T20
        );
        assert_eq!(
            classify_format("Victoria vs Queensland,", "Sheffield Shield • MCG"),
            MatchFormat::Test
        );
        assert_eq!(
            classify_format("Hampshire vs Kent,", "List A • Southampton"),
            MatchFormat::ODI
        );
    }

    #[test]
    fn test_unknown_is_not_guessed() {
        assert_eq!(
            classify_format("India Women vs England Women,", "Match 3 • Mumbai"),
            MatchFormat::Unknown
        );
        assert_eq!(classify_format("", ""), MatchFormat::Unknown);
    }

    #[test]
    fn test_women_fallback_is_separate() {
        let heading = "India Women vs England Women,";
        let stored = classify_format(heading, "Match 3 • Mumbai");
        assert_eq!(stored, MatchFormat::Unknown);
        assert_eq!(prediction_format(stored, heading), MatchFormat::T20);

        // Known formats are left alone
        assert_eq!(prediction_format(MatchFormat::ODI, heading), MatchFormat::ODI);
        // Men's fixtures stay unknown
        assert_eq!(
            prediction_format(MatchFormat::Unknown, "Nepal vs Oman,"),
            MatchFormat::Unknown
        );
    }
}
