//! Operator toss overrides received on `matches:toss_override`.

use anyhow::{anyhow, Context, Result};
use cricscore_rust_core::models::{MatchRecord, TossDecision, TossOverrideCommand};
use cricscore_rust_core::reconcile::Reconciler;

/// Apply one JSON override command. `Ok(None)` means no match has the given id.
pub async fn handle_toss_override(
    reconciler: &Reconciler,
    payload: &[u8],
) -> Result<Option<MatchRecord>> {
    let cmd: TossOverrideCommand =
        serde_json::from_slice(payload).context("Malformed toss override command")?;

    let winner = cmd.toss_winner.trim();
    if winner.is_empty() {
        return Err(anyhow!("toss_winner must not be empty"));
    }
    let decision = TossDecision::parse(&cmd.toss_decision)
        .ok_or_else(|| anyhow!("toss_decision '{}' must be bat or field", cmd.toss_decision))?;

    reconciler.set_manual_toss(cmd.match_id, winner, decision).await
}
