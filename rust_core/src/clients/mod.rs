pub mod cricbuzz;
pub mod prediction;

pub use cricbuzz::{CricbuzzClient, PageSource, ScorecardSource, DEFAULT_LIVE_SCORES_URL};
pub use prediction::PredictionClient;
