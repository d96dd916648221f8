//! live_scores_rust - periodic live-score scraping with Redis fan-out, operator toss overrides and on-demand scorecards

pub mod config;
pub mod overrides;
pub mod scorecards;
pub mod service;

pub use config::{LiveScoresConfig, StoreBackend};
pub use overrides::handle_toss_override;
pub use scorecards::{handle_scorecard_request, ScorecardReply};
pub use service::LiveScoresService;
