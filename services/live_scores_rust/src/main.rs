use anyhow::Result;
use dotenv::dotenv;
use live_scores_rust::{LiveScoresConfig, LiveScoresService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting live_scores_rust...");

    let config = LiveScoresConfig::from_env()?;
    let service = LiveScoresService::new(config).await?;

    service.run().await
}
