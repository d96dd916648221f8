//! LiveScoresService: wires collaborators and runs the scrape job plus the command listeners.

use crate::config::{LiveScoresConfig, StoreBackend};
use crate::overrides::handle_toss_override;
use crate::scorecards::handle_scorecard_request;
use anyhow::{anyhow, Context, Result};
use cricscore_rust_core::broadcast::Broadcaster;
use cricscore_rust_core::circuit_breaker::{ApiCircuitBreaker, ApiCircuitBreakerConfig};
use cricscore_rust_core::classify::{StadiumDirectory, TeamDirectory};
use cricscore_rust_core::clients::{CricbuzzClient, PageSource, PredictionClient};
use cricscore_rust_core::clock::{Clock, SystemClock};
use cricscore_rust_core::db::{create_pool, DbPoolConfig, InMemoryMatchStore, MatchStore, PgMatchStore};
use cricscore_rust_core::dispatch::FanOutDispatcher;
use cricscore_rust_core::history::ScoreHistory;
use cricscore_rust_core::models::channels;
use cricscore_rust_core::normalizer::MatchNormalizer;
use cricscore_rust_core::pipeline::{IntervalTrigger, ScrapeCycle, ScrapeJob};
use cricscore_rust_core::prediction::{GuardedPredictor, Predictor};
use cricscore_rust_core::reconcile::Reconciler;
use cricscore_rust_core::redis::RedisBus;
use futures_util::stream::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

pub struct LiveScoresService {
    config: LiveScoresConfig,
    bus: RedisBus,
    reconciler: Arc<Reconciler>,
    source: Arc<CricbuzzClient>,
    cycle: Arc<ScrapeCycle>,
}

impl LiveScoresService {
    pub async fn new(config: LiveScoresConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let stadiums = StadiumDirectory::default();
        if let Some(path) = config.stadium_mappings_path.as_deref() {
            let added = stadiums.load_json(path).with_context(|| {
                format!("Failed to load stadium mappings from {}", path.display())
            })?;
            info!("Loaded {} stadium mappings from {}", added, path.display());
        }
        let teams = TeamDirectory::default();
        if let Some(path) = config.team_mappings_path.as_deref() {
            let added = teams.load_json(path).with_context(|| {
                format!("Failed to load team mappings from {}", path.display())
            })?;
            info!("Loaded {} team mappings from {}", added, path.display());
        }

        let store = build_store(&config).await?;
        let bus = RedisBus::new(&config.redis_url).await?;
        info!("Connected to Redis");

        let source = Arc::new(CricbuzzClient::new(
            &config.scrape_url,
            Duration::from_secs(config.source_timeout_secs),
            ApiCircuitBreakerConfig::new(
                config.source_cb_failure_threshold,
                Duration::from_secs(config.source_cb_recovery_timeout_secs),
            ),
        )?);

        let prediction_timeout = Duration::from_secs(config.prediction_timeout_secs);
        let prediction_client: Arc<dyn Predictor> = Arc::new(PredictionClient::new(
            &config.prediction_url,
            prediction_timeout,
        )?);
        let predictor = Arc::new(GuardedPredictor::new(
            prediction_client,
            ApiCircuitBreaker::new(
                "prediction",
                ApiCircuitBreakerConfig::new(
                    config.prediction_cb_failure_threshold,
                    Duration::from_secs(config.prediction_cb_recovery_timeout_secs),
                ),
            ),
            prediction_timeout,
        ));

        let reconciler = Arc::new(Reconciler::new(store, clock.clone()));
        let history = Arc::new(ScoreHistory::new());
        let normalizer = Arc::new(MatchNormalizer::new(
            Arc::new(stadiums),
            Arc::new(teams),
            clock,
            config.normalizer_config(),
        ));
        let dispatcher = Arc::new(FanOutDispatcher::new(
            reconciler.clone(),
            history.clone(),
            Arc::new(bus.clone()),
            predictor,
        ));
        let page: Arc<dyn PageSource> = source.clone();
        let cycle = Arc::new(ScrapeCycle::new(
            page,
            normalizer,
            reconciler.clone(),
            dispatcher,
            config.cycle_config(),
        )?);

        Ok(Self {
            config,
            bus,
            reconciler,
            source,
            cycle,
        })
    }

    /// Run until Ctrl-C. The current cycle is allowed to finish before returning.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let job = ScrapeJob::new(
            self.cycle.clone(),
            Box::new(IntervalTrigger::new(Duration::from_secs(
                self.config.poll_interval_secs,
            ))),
            shutdown_rx.clone(),
        );
        info!(
            "Scrape job scheduled every {}s against {}",
            self.config.poll_interval_secs, self.config.scrape_url
        );
        let job_handle = tokio::spawn(job.run());

        let overrides = {
            let bus = self.bus.clone();
            let reconciler = self.reconciler.clone();
            tokio::spawn(listen(
                self.bus.clone(),
                channels::TOSS_OVERRIDE,
                shutdown_rx.clone(),
                move |payload| apply_toss_override(bus.clone(), reconciler.clone(), payload),
            ))
        };
        let scorecards = {
            let bus = self.bus.clone();
            let store = self.reconciler.store().clone();
            let source = self.source.clone();
            tokio::spawn(listen(
                self.bus.clone(),
                channels::SCORECARD_REQUEST,
                shutdown_rx,
                move |payload| answer_scorecard(bus.clone(), store.clone(), source.clone(), payload),
            ))
        };

        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        shutdown_tx.send(true).ok();
        match job_handle.await {
            Ok(cycles) => info!("Scrape job finished after {} cycles", cycles),
            Err(e) => error!("Scrape job panicked: {}", e),
        }
        overrides.abort();
        scorecards.abort();
        Ok(())
    }
}

async fn build_store(config: &LiveScoresConfig) -> Result<Arc<dyn MatchStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory match store; state is lost on restart");
            Ok(Arc::new(InMemoryMatchStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;
            let pool_config = DbPoolConfig::from_env_with_defaults(DbPoolConfig::default());
            let store = PgMatchStore::new(create_pool(url, &pool_config).await?);
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
    }
}

async fn apply_toss_override(bus: RedisBus, reconciler: Arc<Reconciler>, payload: Vec<u8>) {
    match handle_toss_override(&reconciler, &payload).await {
        Ok(Some(record)) => {
            if let Err(e) = bus.publish(&record).await {
                warn!("Failed to broadcast override for {}: {:#}", record.label(), e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Ignoring toss override: {:#}", e),
    }
}

async fn answer_scorecard(
    bus: RedisBus,
    store: Arc<dyn MatchStore>,
    source: Arc<CricbuzzClient>,
    payload: Vec<u8>,
) {
    match handle_scorecard_request(store.as_ref(), source.as_ref(), &payload).await {
        Ok(Some(reply)) => {
            if let Err(e) = bus.publish_json(channels::SCORECARDS, &reply).await {
                warn!("Failed to publish scorecard for match {}: {:#}", reply.match_id, e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Scorecard request failed: {:#}", e),
    }
}

/// Feed each message on `channel` to `handle`, resubscribing after connection loss,
/// until shutdown.
async fn listen<F, Fut>(bus: RedisBus, channel: &'static str, mut shutdown: watch::Receiver<bool>, handle: F)
where
    F: Fn(Vec<u8>) -> Fut,
    Fut: Future<Output = ()>,
{
    while !*shutdown.borrow() {
        let mut pubsub = match bus.subscribe(channel).await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                error!("Failed to subscribe to {}: {}", channel, e);
                tokio::select! {
                    _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => continue,
                    _ = shutdown.changed() => break,
                }
            }
        };
        info!("Listening on {}", channel);

        let mut stream = pubsub.on_message();
        loop {
            let msg = tokio::select! {
                msg = stream.next() => msg,
                _ = shutdown.changed() => return,
            };
            let Some(msg) = msg else {
                warn!("Subscription to {} closed; resubscribing", channel);
                break;
            };

            match msg.get_payload::<Vec<u8>>() {
                Ok(payload) => handle(payload).await,
                Err(e) => warn!("Unreadable payload on {}: {}", channel, e),
            }
        }

        drop(stream);
        tokio::select! {
            _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
            _ = shutdown.changed() => break,
        }
    }
}
