//! Tolerant parsers for score text scraped from the live-scores page.

pub mod innings;
pub mod score;

pub use innings::{parse_innings, InningsScore};
pub use score::{parse_score, parse_score_any, ParsedScore, ScoreGrammar, ScoreParseError};
