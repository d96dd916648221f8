//! On-demand scorecards requested on `matches:scorecard_request`.

use anyhow::{anyhow, Context, Result};
use cricscore_rust_core::clients::ScorecardSource;
use cricscore_rust_core::db::MatchStore;
use cricscore_rust_core::models::ScorecardRequest;
use cricscore_rust_core::scrape::Scorecard;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Published on `matches:scorecards`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardReply {
    pub match_id: i64,
    pub team_heading: String,
    pub scorecard: Scorecard,
}

/// Look up the match, fetch its scorecard page and parse it. `Ok(None)` means no
/// match has the given id.
pub async fn handle_scorecard_request(
    store: &dyn MatchStore,
    source: &dyn ScorecardSource,
    payload: &[u8],
) -> Result<Option<ScorecardReply>> {
    let request: ScorecardRequest =
        serde_json::from_slice(payload).context("Malformed scorecard request")?;

    let Some(record) = store.find_by_id(request.match_id).await? else {
        warn!("Scorecard requested for unknown match {}", request.match_id);
        return Ok(None);
    };
    if record.link.trim().is_empty() {
        return Err(anyhow!("{} has no scorecard link", record.label()));
    }

    let scorecard = source
        .fetch_scorecard(record.link.trim())
        .await
        .with_context(|| format!("Failed to fetch scorecard for {}", record.label()))?;

    Ok(Some(ScorecardReply {
        match_id: request.match_id,
        team_heading: record.team_heading,
        scorecard,
    }))
}
