//! Prediction request payloads, results and the user-facing status annotation.

use crate::circuit_breaker::{ApiCircuitBreaker, ApiCircuitState};
use crate::classify::prediction_format;
use crate::models::{MatchFormat, MatchRecord, MatchStatus, TossDecision};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// Request / response
// ============================================================================

/// Body of a prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPayload {
    pub team1: String,
    pub team2: String,
    pub city: String,
    pub current_score: u32,
    pub current_wickets: u32,
    pub current_over: f64,
    pub batting_team: String,
    pub toss_winner: String,
    pub toss_decision: TossDecision,
    pub match_format: MatchFormat,
    /// Runs needed to win; only present while chasing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    /// 1 while the first innings is in progress, 0 while chasing
    pub batting_first: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub likely_winner: String,
    /// Team name -> probability of winning (0..1)
    pub win_probability: BTreeMap<String, f64>,
    #[serde(default)]
    pub predicted_final_score: Option<f64>,
}

impl PredictionResult {
    pub fn winner_probability(&self) -> Option<f64> {
        self.win_probability.get(&self.likely_winner).copied()
    }
}

/// Why a payload could not be built from a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("city unknown")]
    MissingCity,
    #[error("toss unknown")]
    MissingToss,
    #[error("batting score not parsed")]
    UnparsedBattingScore,
    #[error("bowling score present but not parsed: {0}")]
    UnparsedBowlingScore(String),
    #[error("no target can follow a first-innings total of {0}")]
    TargetOutOfRange(u32),
}

impl PredictionPayload {
    /// Build the request for `record`, using `format` (already past the prediction fallback).
    pub fn from_record(record: &MatchRecord, format: MatchFormat) -> Result<Self, PayloadError> {
        if record.city.trim().is_empty() {
            return Err(PayloadError::MissingCity);
        }
        let toss = record.toss.as_ref().ok_or(PayloadError::MissingToss)?;
        let batting = record
            .batting_parsed
            .ok_or(PayloadError::UnparsedBattingScore)?;

        let (target, batting_first) = if record.bowling_score.trim().is_empty() {
            (None, 1)
        } else {
            let bowling = record
                .bowling_parsed
                .ok_or_else(|| PayloadError::UnparsedBowlingScore(record.bowling_score.clone()))?;
            let target = bowling
                .runs
                .checked_add(1)
                .ok_or(PayloadError::TargetOutOfRange(bowling.runs))?;
            (Some(target), 0)
        };

        Ok(Self {
            team1: record.team1.clone(),
            team2: record.team2.clone(),
            city: record.city.clone(),
            current_score: batting.runs,
            current_wickets: batting.wickets,
            current_over: batting.overs,
            batting_team: record.batting_team.clone(),
            toss_winner: toss.winner.clone(),
            toss_decision: toss.decision,
            match_format: format,
            target,
            batting_first,
        })
    }
}

// ============================================================================
// Collaborator
// ============================================================================

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction service circuit breaker open")]
    CircuitOpen,
    #[error("prediction timed out after {0:?}")]
    Timeout(Duration),
    #[error("prediction request failed: {0}")]
    Transport(String),
    #[error("prediction service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("prediction response malformed: {0}")]
    Decode(String),
}

/// External win-probability model.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, payload: &PredictionPayload) -> Result<PredictionResult, PredictionError>;

    async fn health_check(&self) -> bool;
}

/// Wraps a [`Predictor`] with a circuit breaker and a per-call timeout so a slow or
/// failing service cannot stall the fan-out.
pub struct GuardedPredictor {
    inner: Arc<dyn Predictor>,
    breaker: ApiCircuitBreaker,
    timeout: Duration,
}

impl GuardedPredictor {
    pub fn new(inner: Arc<dyn Predictor>, breaker: ApiCircuitBreaker, timeout: Duration) -> Self {
        Self {
            inner,
            breaker,
            timeout,
        }
    }

    pub fn breaker(&self) -> &ApiCircuitBreaker {
        &self.breaker
    }

    pub async fn predict(
        &self,
        payload: &PredictionPayload,
    ) -> Result<PredictionResult, PredictionError> {
        if !self.breaker.is_available() {
            return Err(PredictionError::CircuitOpen);
        }

        // A half-open breaker probes health before sending real traffic
        if self.breaker.state() == ApiCircuitState::HalfOpen {
            let healthy = tokio::time::timeout(self.timeout, self.inner.health_check())
                .await
                .unwrap_or(false);
            if !healthy {
                self.breaker.record_failure();
                return Err(PredictionError::CircuitOpen);
            }
        }

        let result = match tokio::time::timeout(self.timeout, self.inner.predict(payload)).await {
            Ok(result) => result,
            Err(_) => Err(PredictionError::Timeout(self.timeout)),
        };

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(e) => {
                warn!("Prediction for {} vs {} failed: {}", payload.team1, payload.team2, e);
                self.breaker.record_failure();
            }
        }
        result
    }

    /// Full prediction sub-path for one record; never fails, every outcome is a status.
    pub async fn annotate(&self, record: &MatchRecord) -> PredictionStatus {
        let format = match eligible_format(record) {
            Ok(format) => format,
            Err(status) => return status,
        };

        let payload = match PredictionPayload::from_record(record, format) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("No prediction payload for {}: {}", record.label(), e);
                return PredictionStatus::Unavailable(Unavailable::Data);
            }
        };

        match self.predict(&payload).await {
            Ok(result) => PredictionStatus::Available(result),
            Err(_) => PredictionStatus::Unavailable(Unavailable::Service),
        }
    }
}

// ============================================================================
// Status annotation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotApplicable {
    MatchCompleted,
    UnsupportedFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// Service down, timed out or refused by the breaker
    Service,
    /// Record lacks what the model needs (city, toss, parsed scores)
    Data,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionStatus {
    Available(PredictionResult),
    NotApplicable(NotApplicable),
    Unavailable(Unavailable),
}

impl PredictionStatus {
    pub fn message(&self) -> String {
        match self {
            PredictionStatus::Available(r) => match r.winner_probability() {
                Some(p) => format!("{} likely to win ({:.0}%)", r.likely_winner, p * 100.0),
                None => format!("{} likely to win", r.likely_winner),
            },
            PredictionStatus::NotApplicable(NotApplicable::MatchCompleted) => {
                "Match completed".to_string()
            }
            PredictionStatus::NotApplicable(NotApplicable::UnsupportedFormat) => {
                "Prediction not available for this match format".to_string()
            }
            PredictionStatus::Unavailable(Unavailable::Service) => {
                "Prediction currently unavailable".to_string()
            }
            PredictionStatus::Unavailable(Unavailable::Data) => {
                "Prediction data unavailable".to_string()
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PredictionStatus::Available(_) => "available",
            PredictionStatus::NotApplicable(_) => "not_applicable",
            PredictionStatus::Unavailable(_) => "unavailable",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PredictionStatus::Available(_))
    }
}

/// Message published on the predictions channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionAnnotation {
    pub match_id: Option<i64>,
    pub team_heading: String,
    pub status: String,
    pub message: String,
    pub prediction: Option<PredictionResult>,
}

impl PredictionAnnotation {
    pub fn new(record: &MatchRecord, status: &PredictionStatus) -> Self {
        Self {
            match_id: record.match_id,
            team_heading: record.team_heading.clone(),
            status: status.kind().to_string(),
            message: status.message(),
            prediction: match status {
                PredictionStatus::Available(r) => Some(r.clone()),
                _ => None,
            },
        }
    }
}

/// Format to request a prediction for, or the reason no request should be made.
pub fn eligible_format(record: &MatchRecord) -> Result<MatchFormat, PredictionStatus> {
    if record.status == MatchStatus::Completed {
        return Err(PredictionStatus::NotApplicable(NotApplicable::MatchCompleted));
    }
    let format = prediction_format(record.match_format, &record.team_heading);
    if !format.is_predictable() {
        return Err(PredictionStatus::NotApplicable(
            NotApplicable::UnsupportedFormat,
        ));
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TossInfo;
    use crate::parsing::ParsedScore;
    use chrono::Utc;

    fn record() -> MatchRecord {
        MatchRecord {
            match_id: Some(3),
            team_heading: "India vs Australia".to_string(),
            match_number_venue: "3rd ODI • Melbourne Cricket Ground".to_string(),
            team1: "India".to_string(),
            team2: "Australia".to_string(),
            city: "Melbourne".to_string(),
            batting_team: "India".to_string(),
            batting_score: "240/3 (43.2)".to_string(),
            batting_parsed: Some(ParsedScore {
                runs: 240,
                wickets: 3,
                overs: 43.2,
            }),
            bowling_team: "Australia".to_string(),
            bowling_score: String::new(),
            bowling_parsed: None,
            batting_first: true,
            live_text: "India opt to bat".to_string(),
            completion_text: String::new(),
            match_format: MatchFormat::ODI,
            status: MatchStatus::Live,
            link: String::new(),
            toss: Some(TossInfo::scraped("India", TossDecision::Bat)),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_first_innings_payload() {
        let payload = PredictionPayload::from_record(&record(), MatchFormat::ODI).unwrap();
        assert_eq!(payload.current_score, 240);
        assert_eq!(payload.current_wickets, 3);
        assert_eq!(payload.batting_first, 1);
        assert_eq!(payload.target, None);

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("target").is_none());
        assert_eq!(json["match_format"], "ODI");
        assert_eq!(json["toss_decision"], "bat");
    }

    #[test]
    fn test_chasing_payload_sets_target() {
        let mut r = record();
        r.bowling_score = "287/6 (50)".to_string();
        r.bowling_parsed = Some(ParsedScore {
            runs: 287,
            wickets: 6,
            overs: 50.0,
        });
        let payload = PredictionPayload::from_record(&r, MatchFormat::ODI).unwrap();
        assert_eq!(payload.target, Some(288));
        assert_eq!(payload.batting_first, 0);
    }

    #[test]
    fn test_target_overflow_is_error() {
        let mut r = record();
        r.bowling_score = "4294967295/6 (50)".to_string();
        r.bowling_parsed = Some(ParsedScore {
            runs: u32::MAX,
            wickets: 6,
            overs: 50.0,
        });
        assert_eq!(
            PredictionPayload::from_record(&r, MatchFormat::ODI),
            Err(PayloadError::TargetOutOfRange(u32::MAX))
        );
    }

    #[test]
    fn test_payload_requires_parsed_bowling_score() {
        let mut r = record();
        r.bowling_score = "Yet to bat".to_string();
        assert_eq!(
            PredictionPayload::from_record(&r, MatchFormat::ODI),
            Err(PayloadError::UnparsedBowlingScore("Yet to bat".to_string()))
        );
    }

    #[test]
    fn test_payload_requires_city_and_toss() {
        let mut r = record();
        r.city.clear();
        assert_eq!(
            PredictionPayload::from_record(&r, MatchFormat::ODI),
            Err(PayloadError::MissingCity)
        );

        let mut r = record();
        r.toss = None;
        assert_eq!(
            PredictionPayload::from_record(&r, MatchFormat::ODI),
            Err(PayloadError::MissingToss)
        );
    }

    #[test]
    fn test_eligibility() {
        let r = record();
        assert_eq!(eligible_format(&r), Ok(MatchFormat::ODI));

        let mut done = record();
        done.status = MatchStatus::Completed;
        assert_eq!(
            eligible_format(&done).unwrap_err().message(),
            "Match completed"
        );

        let mut test = record();
        test.match_format = MatchFormat::Test;
        assert_eq!(
            eligible_format(&test).unwrap_err().message(),
            "Prediction not available for this match format"
        );

        let mut women = record();
        women.team_heading = "India Women vs Australia Women".to_string();
        women.match_format = MatchFormat::Unknown;
        assert_eq!(eligible_format(&women), Ok(MatchFormat::T20));
    }

    #[test]
    fn test_available_message() {
        let mut win_probability = BTreeMap::new();
        win_probability.insert("India".to_string(), 0.64);
        win_probability.insert("Australia".to_string(), 0.36);
        let status = PredictionStatus::Available(PredictionResult {
            likely_winner: "India".to_string(),
            win_probability,
            predicted_final_score: Some(301.5),
        });
        assert_eq!(status.message(), "India likely to win (64%)");
        assert_eq!(status.kind(), "available");
    }

    #[test]
    fn test_unavailable_messages() {
        assert_eq!(
            PredictionStatus::Unavailable(Unavailable::Service).message(),
            "Prediction currently unavailable"
        );
        assert_eq!(
            PredictionStatus::Unavailable(Unavailable::Data).message(),
            "Prediction data unavailable"
        );
    }

    struct SlowPredictor;

    #[async_trait]
    impl Predictor for SlowPredictor {
        async fn predict(
            &self,
            _payload: &PredictionPayload,
        ) -> Result<PredictionResult, PredictionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(PredictionError::Transport("unreachable".to_string()))
        }

        async fn health_check(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_guarded_predictor_times_out_and_opens() {
        let guarded = GuardedPredictor::new(
            Arc::new(SlowPredictor),
            ApiCircuitBreaker::new(
                "prediction",
                crate::circuit_breaker::ApiCircuitBreakerConfig::new(1, Duration::from_secs(60)),
            ),
            Duration::from_millis(20),
        );
        let payload = PredictionPayload::from_record(&record(), MatchFormat::ODI).unwrap();

        let first = guarded.predict(&payload).await;
        assert!(matches!(first, Err(PredictionError::Timeout(_))));
        assert_eq!(guarded.breaker().state(), ApiCircuitState::Open);

        let second = guarded.predict(&payload).await;
        assert!(matches!(second, Err(PredictionError::CircuitOpen)));
    }
}
