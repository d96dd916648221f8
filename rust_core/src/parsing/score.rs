//! Score string parsing.
//!
//! The live-scores page prints the batting side's score in two shapes:
//! - slash form: `240/3 (43.2)` (sometimes `142/4 (20 Ovs)`)
//! - dashed form: `100-2 (20 Ovs)`
//!
//! A string that matches neither grammar is an error, never a zero score.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Highest wicket count an innings can show.
pub const MAX_WICKETS: u32 = 10;

static RE_SLASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*/\s*(\d+)\s*\(\s*(\d+(?:\.\d+)?)\s*(?:Ovs?)?\s*\)")
        .expect("slash score pattern compiles")
});

static RE_DASHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*-\s*(\d+)\s*\(\s*(\d+(?:\.\d+)?)\s*Ovs\s*\)")
        .expect("dashed score pattern compiles")
});

/// Which score grammar to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreGrammar {
    /// `R/W (O)`
    Slash,
    /// `R-W (O Ovs)`
    Dashed,
}

impl ScoreGrammar {
    fn pattern(&self) -> &'static Regex {
        match self {
            ScoreGrammar::Slash => &RE_SLASH,
            ScoreGrammar::Dashed => &RE_DASHED,
        }
    }
}

/// Runs, wickets and overs of the innings in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedScore {
    pub runs: u32,
    pub wickets: u32,
    pub overs: f64,
}

impl ParsedScore {
    /// True when no ball has been bowled yet (0/0 after 0 overs).
    pub fn is_innings_start(&self) -> bool {
        self.runs == 0 && self.wickets == 0 && self.overs == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreParseError {
    #[error("score string is empty")]
    Empty,
    #[error("score '{0}' matches no known grammar")]
    NoMatch(String),
    #[error("score '{input}' has {wickets} wickets (max {MAX_WICKETS})")]
    WicketsOutOfRange { input: String, wickets: u32 },
    #[error("score '{input}' has a non-numeric component '{component}'")]
    InvalidNumber { input: String, component: String },
}

/// Parse `raw` with a single grammar.
pub fn parse_score(raw: &str, grammar: ScoreGrammar) -> Result<ParsedScore, ScoreParseError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(ScoreParseError::Empty);
    }

    let caps = grammar
        .pattern()
        .captures(input)
        .ok_or_else(|| ScoreParseError::NoMatch(input.to_string()))?;

    let runs = parse_component::<u32>(input, &caps[1])?;
    let wickets = parse_component::<u32>(input, &caps[2])?;
    let overs = parse_component::<f64>(input, &caps[3])?;

    if wickets > MAX_WICKETS {
        return Err(ScoreParseError::WicketsOutOfRange {
            input: input.to_string(),
            wickets,
        });
    }

    Ok(ParsedScore {
        runs,
        wickets,
        overs,
    })
}

/// Slash grammar first, dashed grammar only when the slash form does not match.
pub fn parse_score_any(raw: &str) -> Result<ParsedScore, ScoreParseError> {
    match parse_score(raw, ScoreGrammar::Slash) {
        Err(ScoreParseError::NoMatch(_)) => parse_score(raw, ScoreGrammar::Dashed),
        other => other,
    }
}

fn parse_component<T: std::str::FromStr>(input: &str, component: &str) -> Result<T, ScoreParseError> {
    component
        .parse::<T>()
        .map_err(|_| ScoreParseError::InvalidNumber {
            input: input.to_string(),
            component: component.to_string(),
        })
}
