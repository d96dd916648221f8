use crate::broadcast::Broadcaster;
use crate::models::{channels, MatchRecord};
use crate::prediction::PredictionAnnotation;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{aio::Connection, AsyncCommands, Client};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Shared publish connection plus a client for opening subscriptions.
#[derive(Clone)]
pub struct RedisBus {
    client: Client,
    connection: Arc<Mutex<Connection>>,
}

impl RedisBus {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("Invalid REDIS_URL")?;
        let connection = client
            .get_async_connection()
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", redis_url))?;

        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Connect using `REDIS_URL`, defaulting to a local server.
    pub async fn from_env() -> Result<Self> {
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
        Self::new(&redis_url).await
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, message: &T) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.connection.lock().await;
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .with_context(|| format!("Failed to publish on {}", channel))?;
        Ok(())
    }

    /// Dedicated subscription connection for `channel`.
    pub async fn subscribe(&self, channel: &str) -> Result<redis::aio::PubSub> {
        let conn = self.client.get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        pubsub.subscribe(channel).await?;
        Ok(pubsub)
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

#[async_trait]
impl Broadcaster for RedisBus {
    async fn publish(&self, record: &MatchRecord) -> Result<()> {
        self.publish_json(channels::LIVE_MATCHES, record).await?;
        debug!("Broadcast {}", record.label());
        Ok(())
    }

    async fn publish_prediction(&self, annotation: &PredictionAnnotation) -> Result<()> {
        self.publish_json(channels::MATCH_PREDICTIONS, annotation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{PredictionStatus, Unavailable};
    use crate::testing::sample_record;
    use futures_util::StreamExt;

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_publish_reaches_subscriber() {
        let bus = RedisBus::from_env().await.unwrap();
        let mut pubsub = bus.subscribe(channels::MATCH_PREDICTIONS).await.unwrap();

        let annotation = PredictionAnnotation::new(
            &sample_record(),
            &PredictionStatus::Unavailable(Unavailable::Service),
        );
        bus.publish_prediction(&annotation).await.unwrap();

        let mut stream = pubsub.on_message();
        let msg = stream.next().await.unwrap();
        let payload: String = msg.get_payload().unwrap();
        assert!(payload.contains("Prediction currently unavailable"));
    }
}
