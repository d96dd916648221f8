//! One scrape cycle (extract -> normalize -> reconcile -> dispatch) and the periodic job
//! that drives it.

use crate::clients::PageSource;
use crate::dispatch::{DispatchReport, FanOutDispatcher};
use crate::models::MatchFragment;
use crate::normalizer::{MatchNormalizer, RejectReason};
use crate::reconcile::{ReconcileAction, Reconciler};
use crate::scrape::FragmentSelectors;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Whole-cycle budget; fragments still pending when it expires are abandoned
    pub deadline: Duration,
    pub fragment_timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(25),
            fragment_timeout: Duration::from_secs(10),
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub fragments: usize,
    pub dispatched: Vec<DispatchReport>,
    pub rejected: Vec<(String, RejectReason)>,
    /// Lookup or storage-write failures; a failed write is also in `dispatched`
    pub failed: Vec<(String, String)>,
    /// Timed out, or never started before the deadline
    pub abandoned: usize,
}

impl CycleReport {
    fn count(&self, action: ReconcileAction) -> usize {
        self.dispatched
            .iter()
            .filter(|r| r.action == action && r.persist_error.is_none())
            .count()
    }

    pub fn inserted(&self) -> usize {
        self.count(ReconcileAction::Insert)
    }

    pub fn updated(&self) -> usize {
        self.count(ReconcileAction::Update)
    }

    pub fn unchanged(&self) -> usize {
        self.count(ReconcileAction::Unchanged)
    }

    pub fn summary(&self) -> String {
        format!(
            "fragments={} inserted={} updated={} unchanged={} rejected={} failed={} abandoned={}",
            self.fragments,
            self.inserted(),
            self.updated(),
            self.unchanged(),
            self.rejected.len(),
            self.failed.len(),
            self.abandoned
        )
    }
}

enum FragmentOutcome {
    Dispatched(DispatchReport),
    Rejected(String, RejectReason),
    Failed(String, anyhow::Error),
    TimedOut(String),
}

pub struct ScrapeCycle {
    source: Arc<dyn PageSource>,
    selectors: FragmentSelectors,
    normalizer: Arc<MatchNormalizer>,
    reconciler: Arc<Reconciler>,
    dispatcher: Arc<FanOutDispatcher>,
    config: CycleConfig,
}

impl ScrapeCycle {
    pub fn new(
        source: Arc<dyn PageSource>,
        normalizer: Arc<MatchNormalizer>,
        reconciler: Arc<Reconciler>,
        dispatcher: Arc<FanOutDispatcher>,
        config: CycleConfig,
    ) -> Result<Self> {
        let selectors = FragmentSelectors::new().context("Invalid live-scores selectors")?;
        Ok(Self {
            source,
            selectors,
            normalizer,
            reconciler,
            dispatcher,
            config,
        })
    }

    /// Fetch the page and process every match block on it. Fails only when the page
    /// cannot be fetched.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let html = self
            .source
            .fetch_live_page()
            .await
            .context("Failed to fetch live scores page")?;
        let fragments = self.selectors.extract(&html);
        debug!("Extracted {} match fragments", fragments.len());
        Ok(self.process_fragments(fragments).await)
    }

    pub async fn process_fragments(&self, fragments: Vec<MatchFragment>) -> CycleReport {
        let mut report = CycleReport {
            fragments: fragments.len(),
            ..Default::default()
        };
        let deadline = Instant::now() + self.config.deadline;
        let per_fragment = self.config.fragment_timeout;

        let mut outcomes = Box::pin(
            stream::iter(fragments)
                .map(|fragment| async move {
                    let heading = fragment.team_heading.trim().to_string();
                    match tokio::time::timeout(per_fragment, self.process(&fragment)).await {
                        Ok(outcome) => outcome,
                        Err(_) => FragmentOutcome::TimedOut(heading),
                    }
                })
                .buffer_unordered(self.config.max_concurrency.max(1)),
        );

        let mut seen = 0;
        loop {
            let next = match tokio::time::timeout_at(deadline, outcomes.next()).await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => break,
                Err(_) => {
                    let pending = report.fragments - seen;
                    warn!("Cycle deadline reached; abandoning {} fragments", pending);
                    report.abandoned += pending;
                    break;
                }
            };
            seen += 1;

            match next {
                FragmentOutcome::Dispatched(d) => {
                    if let Some(e) = &d.persist_error {
                        report.failed.push((d.record.team_heading.clone(), e.clone()));
                    }
                    report.dispatched.push(d);
                }
                FragmentOutcome::Rejected(heading, reason) => {
                    info!("Rejected '{}': {}", heading, reason);
                    report.rejected.push((heading, reason));
                }
                FragmentOutcome::Failed(heading, e) => {
                    error!("Processing '{}' failed: {:#}", heading, e);
                    report.failed.push((heading, format!("{:#}", e)));
                }
                FragmentOutcome::TimedOut(heading) => {
                    warn!("'{}' exceeded {:?}; retrying next cycle", heading, per_fragment);
                    report.abandoned += 1;
                }
            }
        }

        // Abandoned futures hold their heading locks until the stream is gone
        drop(outcomes);
        self.reconciler.prune_idle_locks();
        report
    }

    async fn process(&self, fragment: &MatchFragment) -> FragmentOutcome {
        let heading = fragment.team_heading.trim().to_string();
        if heading.is_empty() {
            return FragmentOutcome::Rejected(heading, RejectReason::BadHeading(String::new()));
        }

        let session = match self.reconciler.begin(&heading).await {
            Ok(session) => session,
            Err(e) => return FragmentOutcome::Failed(heading, e),
        };

        let candidate = match self.normalizer.normalize(fragment, session.existing()) {
            Ok(record) => record,
            Err(reason) => return FragmentOutcome::Rejected(heading, reason),
        };

        let reconciled = self.reconciler.reconcile(&session, candidate);
        FragmentOutcome::Dispatched(self.dispatcher.dispatch(session, reconciled).await)
    }
}

// ============================================================================
// Triggers
// ============================================================================

/// Decides when the next cycle runs. `tick` returning false ends the job.
#[async_trait]
pub trait Trigger: Send {
    async fn tick(&mut self) -> bool;
}

pub struct IntervalTrigger {
    interval: tokio::time::Interval,
}

impl IntervalTrigger {
    /// First tick fires immediately.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// One cycle per message; ends when every sender is dropped.
pub struct ChannelTrigger {
    rx: mpsc::Receiver<()>,
}

impl ChannelTrigger {
    pub fn new(rx: mpsc::Receiver<()>) -> Self {
        Self { rx }
    }

    pub fn channel(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl Trigger for ChannelTrigger {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

// ============================================================================
// Job
// ============================================================================

pub struct ScrapeJob {
    cycle: Arc<ScrapeCycle>,
    trigger: Box<dyn Trigger>,
    shutdown: watch::Receiver<bool>,
}

impl ScrapeJob {
    pub fn new(
        cycle: Arc<ScrapeCycle>,
        trigger: Box<dyn Trigger>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            cycle,
            trigger,
            shutdown,
        }
    }

    /// Run cycles until shutdown is signalled or the trigger ends. Returns cycles run.
    pub async fn run(mut self) -> u64 {
        let mut cycles = 0u64;
        info!("Scrape job started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                more = self.trigger.tick() => {
                    if !more {
                        break;
                    }
                    cycles += 1;
                    match self.cycle.run_once().await {
                        Ok(report) => info!("Cycle {}: {}", cycles, report.summary()),
                        Err(e) => warn!("Cycle {} skipped: {:#}", cycles, e),
                    }
                }
            }
        }

        info!("Scrape job stopped after {} cycles", cycles);
        cycles
    }
}
