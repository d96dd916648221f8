use crate::circuit_breaker::{ApiCircuitBreaker, ApiCircuitBreakerConfig, ApiCircuitState};
use crate::scrape::{parse_scorecard, Scorecard};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LIVE_SCORES_URL: &str = "https://www.cricbuzz.com/cricket-match/live-scores";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) cricscore/0.1";

/// Anything that can hand the pipeline the current live-scores page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_live_page(&self) -> Result<String>;
}

/// Fetches a match scorecard on demand.
#[async_trait]
pub trait ScorecardSource: Send + Sync {
    async fn fetch_scorecard(&self, link: &str) -> Result<Scorecard>;
}

#[derive(Clone)]
pub struct CricbuzzClient {
    client: Client,
    live_scores_url: String,
    circuit_breaker: Arc<ApiCircuitBreaker>,
}

impl std::fmt::Debug for CricbuzzClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CricbuzzClient")
            .field("live_scores_url", &self.live_scores_url)
            .field("circuit_breaker_state", &self.circuit_breaker.state())
            .finish()
    }
}

impl CricbuzzClient {
    pub fn new(live_scores_url: &str, timeout: Duration, config: ApiCircuitBreakerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build source page HTTP client")?;

        Ok(Self {
            client,
            live_scores_url: live_scores_url.to_string(),
            circuit_breaker: Arc::new(ApiCircuitBreaker::new("cricbuzz", config)),
        })
    }

    pub fn circuit_state(&self) -> ApiCircuitState {
        self.circuit_breaker.state()
    }

    /// Fetch and parse a scorecard page. Relative links from the live page are resolved
    /// against the live-scores URL.
    pub async fn get_scorecard(&self, link: &str) -> Result<Scorecard> {
        let url = self.resolve(link)?;
        let html = self.get_html(&url).await?;
        Ok(parse_scorecard(&html)?)
    }

    fn resolve(&self, link: &str) -> Result<String> {
        let base = reqwest::Url::parse(&self.live_scores_url)
            .with_context(|| format!("Invalid live scores URL {}", self.live_scores_url))?;
        let url = base
            .join(link)
            .with_context(|| format!("Invalid scorecard link {}", link))?;
        Ok(url.to_string())
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        if !self.circuit_breaker.is_available() {
            return Err(anyhow!("Source page circuit breaker is open ({})", url));
        }

        let result = self.fetch_internal(url).await;
        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(_) => self.circuit_breaker.record_failure(),
        }
        result
    }

    async fn fetch_internal(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {} returned {}", url, status));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl PageSource for CricbuzzClient {
    async fn fetch_live_page(&self) -> Result<String> {
        let url = self.live_scores_url.clone();
        self.get_html(&url).await
    }
}

#[async_trait]
impl ScorecardSource for CricbuzzClient {
    async fn fetch_scorecard(&self, link: &str) -> Result<Scorecard> {
        self.get_scorecard(link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CricbuzzClient {
        CricbuzzClient::new(
            DEFAULT_LIVE_SCORES_URL,
            Duration::from_secs(5),
            ApiCircuitBreakerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_relative_link() {
        let url = client()
            .resolve("/live-cricket-scorecard/100247/ind-vs-ban-2nd-t20i")
            .unwrap();
        assert_eq!(
            url,
            "https://www.cricbuzz.com/live-cricket-scorecard/100247/ind-vs-ban-2nd-t20i"
        );
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_live_page() {
        match client().fetch_live_page().await {
            Ok(html) => println!("Fetched {} bytes", html.len()),
            Err(e) => println!("Warning: could not fetch live page: {}", e),
        }
    }
}
