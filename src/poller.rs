//! Fetching chart data and driving the auto-refresh timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::PollError;
use crate::results::PollResponse;

/// Identifies the question whose results are being watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollQuery {
    pub comp_slug: Option<String>,
    pub event_slug: String,
    pub question_no: u32,
}

impl PollQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("event_slug", self.event_slug.clone()),
            ("question_no", self.question_no.to_string()),
        ];
        if let Some(comp) = &self.comp_slug {
            params.push(("comp_slug", comp.clone()));
        }
        params
    }
}

#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn fetch(&self, query: &PollQuery) -> Result<PollResponse, PollError>;
}

/// Reads chart data from the voting server over HTTP.
pub struct HttpResultSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResultSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PollError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("votewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpResultSource {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ResultSource for HttpResultSource {
    async fn fetch(&self, query: &PollQuery) -> Result<PollResponse, PollError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.bytes().await?;
        PollResponse::parse(&body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    Manual,
}

/// Result of one fetch, tagged with what it was a fetch for.
#[derive(Debug)]
pub struct PollOutcome {
    /// Increases with every request issued, whatever its trigger.
    pub seq: u64,
    pub query: PollQuery,
    pub trigger: Trigger,
    pub result: Result<PollResponse, PollError>,
}

/// Issues fetches for the current query and forwards the outcomes to the UI loop.
#[derive(Clone)]
pub struct Poller {
    source: Arc<dyn ResultSource>,
    query: watch::Receiver<PollQuery>,
    outcomes: mpsc::Sender<PollOutcome>,
    seq: Arc<AtomicU64>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn ResultSource>,
        query: watch::Receiver<PollQuery>,
        outcomes: mpsc::Sender<PollOutcome>,
    ) -> Self {
        Poller {
            source,
            query,
            outcomes,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn refresh_all(&self, trigger: Trigger) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = self.query.borrow().clone();
        debug!(
            seq,
            ?trigger,
            event = %query.event_slug,
            question = query.question_no,
            "fetching chart data"
        );

        let result = self.source.fetch(&query).await;
        if let Err(e) = &result {
            warn!(seq, "poll failed: {}", e);
        }

        let outcome = PollOutcome {
            seq,
            query,
            trigger,
            result,
        };
        if self.outcomes.send(outcome).await.is_err() {
            debug!(seq, "outcome dropped, UI loop is gone");
        }
    }

    /// Fire a single refresh in the background.
    pub fn spawn_refresh(&self) -> JoinHandle<()> {
        let poller = self.clone();
        tokio::spawn(async move { poller.refresh_all(Trigger::Manual).await })
    }
}

pub enum RefreshState {
    Inactive,
    Active {
        handle: JoinHandle<()>,
        stop: oneshot::Sender<()>,
    },
}

/// The auto-refresh switch. Owns the only timer task.
pub struct RefreshToggle {
    poller: Poller,
    interval: Duration,
    state: RefreshState,
    /// Only the first activation refreshes immediately.
    started: bool,
}

impl RefreshToggle {
    pub fn new(poller: Poller, interval: Duration) -> Self {
        RefreshToggle {
            poller,
            interval,
            state: RefreshState::Inactive,
            started: false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RefreshState::Active { .. })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the timer. Returns `false` and does nothing if it is already running.
    pub fn activate(&mut self) -> bool {
        if self.is_active() {
            debug!("auto-refresh already active");
            return false;
        }
        let first_tick = if self.started {
            Instant::now() + self.interval
        } else {
            Instant::now()
        };
        self.started = true;
        let (stop, stop_rx) = oneshot::channel();
        let timer = run_timer(self.poller.clone(), first_tick, self.interval, stop_rx);
        let handle = tokio::spawn(timer);
        self.state = RefreshState::Active { handle, stop };
        info!(interval_secs = self.interval.as_secs(), "auto-refresh on");
        true
    }

    /// Stop the timer. A fetch already in flight completes and is still delivered.
    pub fn deactivate(&mut self) -> bool {
        match std::mem::replace(&mut self.state, RefreshState::Inactive) {
            RefreshState::Inactive => false,
            RefreshState::Active { handle, stop } => {
                let _ = stop.send(());
                drop(handle);
                info!("auto-refresh off");
                true
            }
        }
    }

    /// Flip the switch; returns whether auto-refresh is now on.
    pub fn toggle(&mut self) -> bool {
        if self.is_active() {
            self.deactivate();
        } else {
            self.activate();
        }
        self.is_active()
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        if self.deactivate() {
            self.activate();
        }
    }
}

impl Drop for RefreshToggle {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn run_timer(
    poller: Poller,
    first_tick: Instant,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    // Ticks missed while a fetch is running collapse into one.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => poller.refresh_all(Trigger::Timer).await,
        }
    }
    debug!("refresh timer stopped");
}
