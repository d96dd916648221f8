use crate::prediction::{PredictionError, PredictionPayload, PredictionResult, Predictor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the win-prediction service (`POST /predict`, `GET /health`).
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

impl PredictionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build prediction HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Predictor for PredictionClient {
    async fn predict(&self, payload: &PredictionPayload) -> Result<PredictionResult, PredictionError> {
        let url = format!("{}/predict", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PredictionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: PredictionResult = resp
            .json()
            .await
            .map_err(|e| PredictionError::Decode(e.to_string()))?;
        debug!(
            "Prediction for {} vs {}: {} ({:?})",
            payload.team1,
            payload.team2,
            result.likely_winner,
            result.winner_probability()
        );
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<HealthResponse>()
                .await
                .map(|h| h.status.eq_ignore_ascii_case("healthy"))
                .unwrap_or(false),
            Ok(resp) => {
                debug!("Prediction health check returned {}", resp.status());
                false
            }
            Err(e) => {
                debug!("Prediction health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = PredictionClient::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_result_decodes_service_response() {
        let body = r#"{
            "status": "success",
            "match_format": "T20",
            "batting_team": "India",
            "likely_winner": "India",
            "win_probability": {"India": 0.64, "Australia": 0.36},
            "predicted_final_score": 182.5,
            "target": null
        }"#;
        let result: PredictionResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.likely_winner, "India");
        assert_eq!(result.winner_probability(), Some(0.64));
        assert_eq!(result.predicted_final_score, Some(182.5));
    }

    #[tokio::test]
    #[ignore] // Requires a running prediction service
    async fn test_health_check() {
        let client = PredictionClient::new("http://localhost:5000", Duration::from_secs(2)).unwrap();
        println!("Prediction service healthy: {}", client.health_check().await);
    }
}
