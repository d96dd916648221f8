//! Insert/update decisions against stored state, serialized per team heading.

use crate::clock::Clock;
use crate::db::MatchStore;
use crate::models::{MatchRecord, TossDecision, TossInfo};
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// First sighting of the heading; storage assigns the id
    Insert,
    /// Known heading with new content
    Update,
    /// Content equal to the stored record; no write needed
    Unchanged,
}

impl ReconcileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileAction::Insert => "insert",
            ReconcileAction::Update => "update",
            ReconcileAction::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub record: MatchRecord,
    pub action: ReconcileAction,
}

/// Holds the heading lock from lookup until the record is persisted.
pub struct ReconcileSession {
    heading: String,
    existing: Option<MatchRecord>,
    _guard: OwnedMutexGuard<()>,
}

impl ReconcileSession {
    pub fn heading(&self) -> &str {
        &self.heading
    }

    /// Stored record for this heading as of lock acquisition.
    pub fn existing(&self) -> Option<&MatchRecord> {
        self.existing.as_ref()
    }
}

pub struct Reconciler {
    store: Arc<dyn MatchStore>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn MatchStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    async fn lock_heading(&self, heading: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .entry(heading.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Lock the heading and load its stored record.
    pub async fn begin(&self, heading: &str) -> Result<ReconcileSession> {
        let heading = heading.trim().to_string();
        let guard = self.lock_heading(&heading).await;
        let existing = self.store.find_by_team_heading(&heading).await?;
        Ok(ReconcileSession {
            heading,
            existing,
            _guard: guard,
        })
    }

    /// Decide what `candidate` means relative to the session's stored record.
    /// Identity and a manual toss are carried from storage; everything else is overwritten.
    pub fn reconcile(&self, session: &ReconcileSession, mut candidate: MatchRecord) -> Reconciled {
        let Some(existing) = session.existing() else {
            candidate.match_id = None;
            return Reconciled {
                record: candidate,
                action: ReconcileAction::Insert,
            };
        };

        candidate.match_id = existing.match_id;
        if let Some(manual) = existing.manual_toss() {
            candidate.toss = Some(manual.clone());
        }

        if candidate.same_observation(existing) {
            Reconciled {
                record: existing.clone(),
                action: ReconcileAction::Unchanged,
            }
        } else {
            Reconciled {
                record: candidate,
                action: ReconcileAction::Update,
            }
        }
    }

    /// Write the reconciled record (unless unchanged) and release the heading lock.
    pub async fn persist(&self, session: ReconcileSession, reconciled: Reconciled) -> Result<Reconciled> {
        let Reconciled { record, action } = reconciled;
        let record = match action {
            ReconcileAction::Unchanged => {
                debug!("No change for {}", record.label());
                record
            }
            ReconcileAction::Insert | ReconcileAction::Update => {
                let saved = self.store.save(record).await?;
                debug!("{} {}", action.as_str(), saved.label());
                saved
            }
        };
        drop(session);
        Ok(Reconciled { record, action })
    }

    /// Lookup, decide and save in one call.
    pub async fn reconcile_and_save(&self, candidate: MatchRecord) -> Result<Reconciled> {
        let session = self.begin(&candidate.team_heading).await?;
        let reconciled = self.reconcile(&session, candidate);
        self.persist(session, reconciled).await
    }

    /// Operator override. Returns `None` when no match has this id.
    pub async fn set_manual_toss(
        &self,
        match_id: i64,
        winner: &str,
        decision: TossDecision,
    ) -> Result<Option<MatchRecord>> {
        let Some(found) = self.store.find_by_id(match_id).await? else {
            warn!("Toss override for unknown match {}", match_id);
            return Ok(None);
        };

        let _guard = self.lock_heading(&found.team_heading).await;
        // Re-read under the lock; a scrape may have written since the lookup
        let mut record = self
            .store
            .find_by_team_heading(&found.team_heading)
            .await?
            .unwrap_or(found);

        record.toss = Some(TossInfo::manual(winner.trim(), decision));
        record.last_updated = self.clock.now();
        let saved = self.store.save(record).await?;

        info!(
            "Manual toss set for {}: {} chose to {}",
            saved.label(),
            winner.trim(),
            decision.as_str()
        );
        Ok(Some(saved))
    }

    /// Forget heading locks nobody is holding or waiting on.
    pub fn prune_idle_locks(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::InMemoryMatchStore;
    use crate::models::TossSource;
    use crate::testing::sample_record;
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Arc<InMemoryMatchStore>, Arc<FixedClock>, Reconciler) {
        let store = Arc::new(InMemoryMatchStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let reconciler = Reconciler::new(store.clone(), clock.clone());
        (store, clock, reconciler)
    }

    #[tokio::test]
    async fn test_insert_then_unchanged() {
        let (store, _, reconciler) = setup();

        let first = reconciler.reconcile_and_save(sample_record()).await.unwrap();
        assert_eq!(first.action, ReconcileAction::Insert);
        let id = first.record.match_id;
        assert!(id.is_some());

        let mut again = sample_record();
        again.last_updated += Duration::seconds(30);
        let second = reconciler.reconcile_and_save(again).await.unwrap();

        assert_eq!(second.action, ReconcileAction::Unchanged);
        assert_eq!(second.record, first.record);
        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_identity() {
        let (store, _, reconciler) = setup();
        let first = reconciler.reconcile_and_save(sample_record()).await.unwrap();

        let mut newer = sample_record();
        newer.batting_score = "150/4 (19.1)".to_string();
        let second = reconciler.reconcile_and_save(newer).await.unwrap();

        assert_eq!(second.action, ReconcileAction::Update);
        assert_eq!(second.record.match_id, first.record.match_id);
        assert_eq!(second.record.batting_score, "150/4 (19.1)");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_manual_toss_survives_scrapes() {
        let (_, clock, reconciler) = setup();
        let first = reconciler.reconcile_and_save(sample_record()).await.unwrap();
        let id = first.record.match_id.unwrap();

        clock.advance(Duration::minutes(1));
        let overridden = reconciler
            .set_manual_toss(id, "India", TossDecision::Bat)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(overridden.toss, Some(TossInfo::manual("India", TossDecision::Bat)));
        assert_eq!(overridden.last_updated, clock.now());

        // Scraped toss says Australia; the stored manual toss wins
        let mut scraped = sample_record();
        scraped.batting_score = "160/5 (20)".to_string();
        let after = reconciler.reconcile_and_save(scraped).await.unwrap();
        let toss = after.record.toss.unwrap();
        assert_eq!(toss.source, TossSource::Manual);
        assert_eq!(toss.winner, "India");
    }

    #[tokio::test]
    async fn test_manual_toss_unknown_match() {
        let (_, _, reconciler) = setup();
        let result = reconciler
            .set_manual_toss(404, "India", TossDecision::Bat)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_session_sees_stored_record() {
        let (_, _, reconciler) = setup();
        reconciler.reconcile_and_save(sample_record()).await.unwrap();

        let session = reconciler.begin("India vs Australia,").await.unwrap();
        assert!(session.existing().is_some());
        assert_eq!(session.heading(), "India vs Australia,");
    }

    #[tokio::test]
    async fn test_same_heading_serialized() {
        let (store, _, reconciler) = setup();
        let reconciler = Arc::new(reconciler);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let r = reconciler.clone();
                tokio::spawn(async move {
                    let mut rec = sample_record();
                    rec.batting_score = format!("{}/4 (19)", 140 + i);
                    r.reconcile_and_save(rec).await.unwrap()
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(reconciler.prune_idle_locks(), 1);
    }
}
