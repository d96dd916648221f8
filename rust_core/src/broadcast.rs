//! Real-time push of match updates.

use crate::models::MatchRecord;
use crate::prediction::PredictionAnnotation;
use anyhow::Result;
use async_trait::async_trait;

/// Fire-and-forget publisher. Errors are reported to the caller for logging only;
/// nothing is retried.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish(&self, record: &MatchRecord) -> Result<()>;

    async fn publish_prediction(&self, annotation: &PredictionAnnotation) -> Result<()>;
}
