//! Fan-out of a reconciled record: persist, then chart/broadcast/predict concurrently.
//! A failed branch is reported, never propagated.

use crate::broadcast::Broadcaster;
use crate::history::ScoreHistory;
use crate::models::MatchRecord;
use crate::prediction::{GuardedPredictor, PredictionAnnotation, PredictionStatus};
use crate::reconcile::{ReconcileAction, ReconcileSession, Reconciled, Reconciler};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What happened on each branch for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub record: MatchRecord,
    pub action: ReconcileAction,
    /// Storage write error, if the write failed; the other branches still ran
    pub persist_error: Option<String>,
    pub history_entries: usize,
    pub broadcast: bool,
    pub prediction: PredictionStatus,
    pub prediction_published: bool,
}

pub struct FanOutDispatcher {
    reconciler: Arc<Reconciler>,
    history: Arc<ScoreHistory>,
    broadcaster: Arc<dyn Broadcaster>,
    predictor: Arc<GuardedPredictor>,
}

impl FanOutDispatcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        history: Arc<ScoreHistory>,
        broadcaster: Arc<dyn Broadcaster>,
        predictor: Arc<GuardedPredictor>,
    ) -> Self {
        Self {
            reconciler,
            history,
            broadcaster,
            predictor,
        }
    }

    /// Persist under the heading lock, then run the remaining branches. When the
    /// write fails the unsaved record is still charted, broadcast and predicted; it
    /// keeps the stored id on updates and has none on inserts.
    pub async fn dispatch(&self, session: ReconcileSession, reconciled: Reconciled) -> DispatchReport {
        let unsaved = reconciled.clone();
        let (Reconciled { record, action }, persist_error) =
            match self.reconciler.persist(session, reconciled).await {
                Ok(saved) => (saved, None),
                Err(e) => {
                    error!("Storage write failed for {}: {:#}", unsaved.record.label(), e);
                    (unsaved, Some(format!("{:#}", e)))
                }
            };

        let (history_entries, broadcast, (prediction, prediction_published)) = tokio::join!(
            async { self.history.update_from_record(&record) },
            self.broadcast(&record),
            self.predict(&record),
        );

        debug!(
            "Dispatched {} ({}): persisted={} history={} broadcast={} prediction={}",
            record.label(),
            action.as_str(),
            persist_error.is_none(),
            history_entries,
            broadcast,
            prediction.kind()
        );

        DispatchReport {
            record,
            action,
            persist_error,
            history_entries,
            broadcast,
            prediction,
            prediction_published,
        }
    }

    async fn broadcast(&self, record: &MatchRecord) -> bool {
        match self.broadcaster.publish(record).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Broadcast failed for {}: {:#}", record.label(), e);
                false
            }
        }
    }

    async fn predict(&self, record: &MatchRecord) -> (PredictionStatus, bool) {
        let status = self.predictor.annotate(record).await;
        let annotation = PredictionAnnotation::new(record, &status);
        let published = match self.broadcaster.publish_prediction(&annotation).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Prediction publish failed for {}: {:#}", record.label(), e);
                false
            }
        };
        (status, published)
    }
}
