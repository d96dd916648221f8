// Shared models for the live score services
use crate::parsing::ParsedScore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Format & Status Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchFormat {
    T20,
    ODI,
    Test,
    Unknown,
}

impl MatchFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchFormat::T20 => "T20",
            MatchFormat::ODI => "ODI",
            MatchFormat::Test => "TEST",
            MatchFormat::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored format string. Anything unrecognised is `Unknown`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "T20" => MatchFormat::T20,
            "ODI" => MatchFormat::ODI,
            "TEST" => MatchFormat::Test,
            _ => MatchFormat::Unknown,
        }
    }

    /// Limited-overs formats the prediction service has models for.
    pub fn is_predictable(&self) -> bool {
        matches!(self, MatchFormat::T20 | MatchFormat::ODI)
    }
}

impl fmt::Display for MatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    Live,
    Completed,
}

impl MatchStatus {
    /// A match is completed exactly when the page shows a result line.
    pub fn from_completion_text(text: &str) -> Self {
        if text.trim().is_empty() {
            MatchStatus::Live
        } else {
            MatchStatus::Completed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Live => "LIVE",
            MatchStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("COMPLETED") {
            MatchStatus::Completed
        } else {
            MatchStatus::Live
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Toss
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TossDecision {
    Bat,
    Field,
}

impl TossDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TossDecision::Bat => "bat",
            TossDecision::Field => "field",
        }
    }

    /// Accepts "bat"/"batting" and "field"/"bowl"/"fielding"/"bowling".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bat" | "batting" => Some(TossDecision::Bat),
            "field" | "fielding" | "bowl" | "bowling" => Some(TossDecision::Field),
            _ => None,
        }
    }
}

/// Where a toss result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TossSource {
    /// Inferred from the live status line
    Scraped,
    /// Set by an operator; scrapes never overwrite it
    Manual,
}

impl TossSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TossSource::Scraped => "SCRAPED",
            TossSource::Manual => "MANUAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TossInfo {
    pub winner: String,
    pub decision: TossDecision,
    pub source: TossSource,
}

impl TossInfo {
    pub fn scraped(winner: impl Into<String>, decision: TossDecision) -> Self {
        Self {
            winner: winner.into(),
            decision,
            source: TossSource::Scraped,
        }
    }

    pub fn manual(winner: impl Into<String>, decision: TossDecision) -> Self {
        Self {
            winner: winner.into(),
            decision,
            source: TossSource::Manual,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.source == TossSource::Manual
    }
}

// ============================================================================
// Scraped fragment & canonical record
// ============================================================================

/// Raw text of one match block on the live-scores page. Any field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFragment {
    pub team_heading: String,
    pub match_number_venue: String,
    pub batting_team: String,
    pub batting_score: String,
    pub bowling_team: String,
    pub bowling_score: String,
    pub live_text: String,
    pub completion_text: String,
    pub link: String,
}

/// Canonical match state, one per team heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Assigned by storage on first save
    pub match_id: Option<i64>,
    /// Upsert key
    pub team_heading: String,
    pub match_number_venue: String,
    pub team1: String,
    pub team2: String,
    pub city: String,
    pub batting_team: String,
    pub batting_score: String,
    pub batting_parsed: Option<ParsedScore>,
    pub bowling_team: String,
    pub bowling_score: String,
    pub bowling_parsed: Option<ParsedScore>,
    /// True while the first innings is in progress (no bowling-side score yet)
    pub batting_first: bool,
    pub live_text: String,
    pub completion_text: String,
    pub match_format: MatchFormat,
    pub status: MatchStatus,
    pub link: String,
    pub toss: Option<TossInfo>,
    pub last_updated: DateTime<Utc>,
}

impl MatchRecord {
    pub fn manual_toss(&self) -> Option<&TossInfo> {
        self.toss.as_ref().filter(|t| t.is_manual())
    }

    /// Same observation as `other`, ignoring identity and timestamp.
    pub fn same_observation(&self, other: &MatchRecord) -> bool {
        let mut normalized = self.clone();
        normalized.match_id = other.match_id;
        normalized.last_updated = other.last_updated;
        normalized == *other
    }

    /// Short label for logs.
    pub fn label(&self) -> String {
        match self.match_id {
            Some(id) => format!("#{} {}", id, self.team_heading),
            None => self.team_heading.clone(),
        }
    }
}

// ============================================================================
// Operator commands
// ============================================================================

/// Manual toss override sent by an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TossOverrideCommand {
    pub match_id: i64,
    pub toss_winner: String,
    pub toss_decision: String,
}

/// Request for the current scorecard of a stored match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorecardRequest {
    pub match_id: i64,
}

// ============================================================================
// Pub/Sub channels
// ============================================================================

pub mod channels {
    pub const LIVE_MATCHES: &str = "matches:live";
    pub const MATCH_PREDICTIONS: &str = "matches:predictions";
    pub const TOSS_OVERRIDE: &str = "matches:toss_override";
    pub const SCORECARD_REQUEST: &str = "matches:scorecard_request";
    pub const SCORECARDS: &str = "matches:scorecards";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_completion_text() {
        assert_eq!(MatchStatus::from_completion_text(""), MatchStatus::Live);
        assert_eq!(MatchStatus::from_completion_text("   "), MatchStatus::Live);
        assert_eq!(
            MatchStatus::from_completion_text("India won by 6 wkts"),
            MatchStatus::Completed
        );
    }

    #[test]
    fn test_format_serialization() {
        assert_eq!(serde_json::to_string(&MatchFormat::Test).unwrap(), "\"TEST\"");
        assert_eq!(serde_json::to_string(&MatchFormat::ODI).unwrap(), "\"ODI\"");
        assert_eq!(MatchFormat::from_str_lossy("odi"), MatchFormat::ODI);
        assert_eq!(MatchFormat::from_str_lossy("hundred"), MatchFormat::Unknown);
        assert!(MatchFormat::T20.is_predictable());
        assert!(!MatchFormat::Test.is_predictable());
        assert!(!MatchFormat::Unknown.is_predictable());
    }

    #[test]
    fn test_toss_decision_parse() {
        assert_eq!(TossDecision::parse("Bat"), Some(TossDecision::Bat));
        assert_eq!(TossDecision::parse("bowl"), Some(TossDecision::Field));
        assert_eq!(TossDecision::parse("field"), Some(TossDecision::Field));
        assert_eq!(TossDecision::parse("toss"), None);
        assert_eq!(
            serde_json::to_string(&TossDecision::Field).unwrap(),
            "\"field\""
        );
    }

    #[test]
    fn test_toss_override_command_deserialize() {
        let cmd: TossOverrideCommand = serde_json::from_str(
            r#"{"match_id": 7, "toss_winner": "India", "toss_decision": "bat"}"#,
        )
        .unwrap();
        assert_eq!(cmd.match_id, 7);
        assert_eq!(cmd.toss_winner, "India");
    }
}
