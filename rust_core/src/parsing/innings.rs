//! Multi-innings score strings, as shown for first-class matches.
//!
//! `"350 & 120-4 d"`, `"187 & 45-2 f/o"`: innings are separated by `&`, a trailing
//! `d` marks a declaration and `f/o` marks an innings batted as a follow-on.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_INNINGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)(?:\s*[-/]\s*(\d+))?(\s*d\b)?").expect("innings pattern compiles")
});

/// One innings of a team as read from a score string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsScore {
    /// 1-based position within the score string
    pub innings_number: u32,
    pub runs: u32,
    pub wickets: Option<u32>,
    pub declared: bool,
    pub follow_on: bool,
}

/// Split a score string into innings. Segments without a run count are skipped.
pub fn parse_innings(score: &str) -> Vec<InningsScore> {
    let mut innings = Vec::new();
    if score.trim().is_empty() {
        return innings;
    }

    for (idx, segment) in score.split('&').enumerate() {
        let segment = segment.trim();
        let Some(caps) = RE_INNINGS.captures(segment) else {
            continue;
        };
        let Ok(runs) = caps[1].parse::<u32>() else {
            continue;
        };

        innings.push(InningsScore {
            innings_number: idx as u32 + 1,
            runs,
            wickets: caps.get(2).and_then(|w| w.as_str().parse().ok()),
            declared: caps.get(3).is_some(),
            follow_on: segment.to_lowercase().contains("f/o"),
        });
    }

    innings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_on_innings() {
        let innings = parse_innings("187 & 45-2 f/o");
        assert_eq!(innings.len(), 2);

        assert_eq!(innings[0].innings_number, 1);
        assert_eq!(innings[0].runs, 187);
        assert!(!innings[0].declared);
        assert!(!innings[0].follow_on);

        assert_eq!(innings[1].innings_number, 2);
        assert_eq!(innings[1].runs, 45);
        assert_eq!(innings[1].wickets, Some(2));
        assert!(innings[1].follow_on);
    }

    #[test]
    fn test_declared_innings() {
        let innings = parse_innings("450-7 d & 120/2");
        assert_eq!(innings.len(), 2);
        assert!(innings[0].declared);
        assert_eq!(innings[0].wickets, Some(7));
        assert!(!innings[1].declared);
    }

    #[test]
    fn test_single_limited_overs_score() {
        let innings = parse_innings("240/3 (43.2)");
        assert_eq!(innings.len(), 1);
        assert_eq!(innings[0].runs, 240);
        assert!(!innings[0].declared);
    }

    #[test]
    fn test_empty_and_garbage() {
        assert!(parse_innings("").is_empty());
        assert!(parse_innings("Yet to bat").is_empty());

        // Unparseable segment keeps the numbering of the others
        let innings = parse_innings("Yet to bat & 12-0");
        assert_eq!(innings.len(), 1);
        assert_eq!(innings[0].innings_number, 2);
    }
}
