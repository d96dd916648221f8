//! Fragment -> canonical `MatchRecord`.
//!
//! Validation is staged and fail-fast; the first failing stage rejects the fragment:
//! 1. heading names exactly two teams
//! 2. venue yields a city
//! 3. batting score parses
//! 4. toss is known (scraped, else carried from the stored record)
//! 5. batting team is one of the heading teams
//! 6. format is known (only when `strict_format` is set)

use crate::classify::{classify_format, extract_toss, StadiumDirectory, TeamDirectory};
use crate::clock::Clock;
use crate::models::{MatchFormat, MatchFragment, MatchRecord, MatchStatus, TossInfo};
use crate::parsing::{parse_score_any, ScoreParseError};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

static RE_VS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+vs\.?\s+").expect("vs pattern compiles"));

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Reject fragments whose toss cannot be determined
    pub require_toss: bool,
    /// Reject fragments whose format classifies as `Unknown` instead of storing them
    pub strict_format: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            require_toss: true,
            strict_format: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("heading '{0}' does not name two teams")]
    BadHeading(String),
    #[error("no city for venue '{0}'")]
    UnknownCity(String),
    #[error("batting score unparseable: {0}")]
    UnparseableScore(#[from] ScoreParseError),
    #[error("toss unknown")]
    MissingToss,
    #[error("batting team '{batting}' is neither '{team1}' nor '{team2}'")]
    BattingTeamMismatch {
        batting: String,
        team1: String,
        team2: String,
    },
    #[error("format unknown for '{0}'")]
    UnknownFormat(String),
}

pub struct MatchNormalizer {
    stadiums: Arc<StadiumDirectory>,
    teams: Arc<TeamDirectory>,
    clock: Arc<dyn Clock>,
    config: NormalizerConfig,
}

impl MatchNormalizer {
    pub fn new(
        stadiums: Arc<StadiumDirectory>,
        teams: Arc<TeamDirectory>,
        clock: Arc<dyn Clock>,
        config: NormalizerConfig,
    ) -> Self {
        Self {
            stadiums,
            teams,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one fragment. `existing` is the stored record for the same heading, if any;
    /// its toss is used when the live text carries none.
    pub fn normalize(
        &self,
        fragment: &MatchFragment,
        existing: Option<&MatchRecord>,
    ) -> Result<MatchRecord, RejectReason> {
        let (team1, team2) = split_heading(&fragment.team_heading)
            .ok_or_else(|| RejectReason::BadHeading(fragment.team_heading.clone()))?;
        let team1 = self.teams.standardize(&team1);
        let team2 = self.teams.standardize(&team2);

        let city = self.stadiums.city_for_venue(&fragment.match_number_venue);
        if city.is_empty() {
            return Err(RejectReason::UnknownCity(fragment.match_number_venue.clone()));
        }

        let batting_parsed = parse_score_any(&fragment.batting_score)?;

        let toss = self.resolve_toss(&fragment.live_text, &team1, &team2, existing);
        if toss.is_none() && self.config.require_toss {
            return Err(RejectReason::MissingToss);
        }

        let batting_team = self.teams.standardize(&fragment.batting_team);
        if !self.teams.same_team(&batting_team, &team1) && !self.teams.same_team(&batting_team, &team2)
        {
            return Err(RejectReason::BattingTeamMismatch {
                batting: batting_team,
                team1,
                team2,
            });
        }

        let match_format = classify_format(&fragment.team_heading, &fragment.match_number_venue);
        if self.config.strict_format && match_format == MatchFormat::Unknown {
            return Err(RejectReason::UnknownFormat(fragment.team_heading.clone()));
        }

        let bowling_score = fragment.bowling_score.trim().to_string();
        // A bowling-side score the grammars cannot read is kept raw; only prediction needs it parsed
        let bowling_parsed = if bowling_score.is_empty() {
            None
        } else {
            parse_score_any(&bowling_score).ok()
        };

        Ok(MatchRecord {
            match_id: existing.and_then(|e| e.match_id),
            team_heading: fragment.team_heading.trim().to_string(),
            match_number_venue: fragment.match_number_venue.trim().to_string(),
            team1,
            team2,
            city,
            batting_team,
            batting_score: fragment.batting_score.trim().to_string(),
            batting_parsed: Some(batting_parsed),
            bowling_team: self.teams.standardize(&fragment.bowling_team),
            batting_first: bowling_score.is_empty(),
            bowling_score,
            bowling_parsed,
            live_text: fragment.live_text.trim().to_string(),
            completion_text: fragment.completion_text.trim().to_string(),
            match_format,
            status: MatchStatus::from_completion_text(&fragment.completion_text),
            link: fragment.link.trim().to_string(),
            toss,
            last_updated: self.clock.now(),
        })
    }

    /// Scraped toss, else the manual toss on the stored record, else the stored scraped toss.
    fn resolve_toss(
        &self,
        live_text: &str,
        team1: &str,
        team2: &str,
        existing: Option<&MatchRecord>,
    ) -> Option<TossInfo> {
        if let Some(extracted) = extract_toss(live_text) {
            let winner = [team1, team2]
                .into_iter()
                .find(|t| self.teams.same_team(t, &extracted.winner))
                .map(str::to_string)
                .unwrap_or(extracted.winner);
            return Some(TossInfo::scraped(winner, extracted.decision));
        }

        let stored = existing.and_then(|e| e.toss.as_ref())?;
        Some(stored.clone())
    }
}

/// Split "India vs Australia, 3rd ODI" into ("India", "Australia").
fn split_heading(heading: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = RE_VS.split(heading.trim()).collect();
    if parts.len() != 2 {
        return None;
    }
    let clean = |s: &str| s.split(',').next().unwrap_or_default().trim().to_string();
    let (a, b) = (clean(parts[0]), clean(parts[1]));
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a, b))
}
