//! Shared fixtures for unit tests.

use crate::models::{MatchFormat, MatchRecord, MatchStatus, TossDecision, TossInfo};
use crate::parsing::ParsedScore;
use chrono::{TimeZone, Utc};

/// A live first-innings T20 record for "India vs Australia".
pub(crate) fn sample_record() -> MatchRecord {
    MatchRecord {
        match_id: None,
        team_heading: "India vs Australia,".to_string(),
        match_number_venue: "3rd T20I • Melbourne Cricket Ground".to_string(),
        team1: "India".to_string(),
        team2: "Australia".to_string(),
        city: "Melbourne".to_string(),
        batting_team: "India".to_string(),
        batting_score: "142/4 (18.2)".to_string(),
        batting_parsed: Some(ParsedScore {
            runs: 142,
            wickets: 4,
            overs: 18.2,
        }),
        bowling_team: "Australia".to_string(),
        bowling_score: String::new(),
        bowling_parsed: None,
        batting_first: true,
        live_text: "Australia opt to bowl".to_string(),
        completion_text: String::new(),
        match_format: MatchFormat::T20,
        status: MatchStatus::Live,
        link: "/live-cricket-scores/1".to_string(),
        toss: Some(TossInfo::scraped("Australia", TossDecision::Field)),
        last_updated: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
    }
}

pub(crate) fn record_for(heading: &str) -> MatchRecord {
    MatchRecord {
        team_heading: heading.to_string(),
        ..sample_record()
    }
}
