//! CricScore core - live cricket score ingestion, normalization and fan-out.
//!
//! This crate provides:
//! - Structural extraction of match blocks and scorecards from the live-scores page
//! - Tolerant score parsing (`R/W (O)`, `R-W (O Ovs)`, multi-innings strings)
//! - Format, venue->city, team and toss classifiers over injectable lookup tables
//! - The match normalizer, per-heading reconciler and fan-out dispatcher
//! - Periodic scrape cycles with bounded concurrency and a cycle deadline
//! - Adapters: Postgres/in-memory stores, Redis broadcast, HTTP source and prediction clients
//! - Circuit breaker for external HTTP dependencies

pub mod broadcast;
pub mod circuit_breaker;
pub mod classify;
pub mod clients;
pub mod clock;
pub mod db;
pub mod dispatch;
pub mod history;
pub mod lookup;
pub mod models;
pub mod normalizer;
pub mod parsing;
pub mod pipeline;
pub mod prediction;
pub mod reconcile;
pub mod redis;
pub mod scrape;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::Broadcaster;
pub use dispatch::{DispatchReport, FanOutDispatcher};
pub use history::{ChartSeries, ScoreHistory, ScoreHistoryEntry};
pub use models::{MatchFormat, MatchFragment, MatchRecord, MatchStatus, TossDecision, TossInfo};
pub use normalizer::{MatchNormalizer, NormalizerConfig, RejectReason};
pub use parsing::{parse_score, parse_score_any, ParsedScore, ScoreGrammar, ScoreParseError};
pub use pipeline::{CycleConfig, CycleReport, ScrapeCycle, ScrapeJob, Trigger};
pub use reconcile::{ReconcileAction, Reconciled, Reconciler};
