use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use super::state::DashboardState;
use crate::fetch::HttpClient;
use crate::pipeline::{RefreshOutcome, fetch_snapshot};

/// Refresh cadence of the live dashboard.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

type Completion = (u64, Result<RefreshOutcome>);

/// Periodically refreshes the transportation snapshot.
pub struct Poller<C> {
    client: Arc<C>,
    url: String,
    interval: Duration,
}

impl<C: HttpClient + 'static> Poller<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            url: url.into(),
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starts polling. The first refresh is issued immediately.
    pub fn spawn(self) -> PollerHandle {
        let state = Arc::new(watch::Sender::new(DashboardState::new()));
        let task = tokio::spawn(self.run(state.clone()));
        PollerHandle { state, task }
    }

    /// Issues a refresh on every tick and applies completions as they arrive.
    ///
    /// Refreshes are independent tasks; nothing waits for the previous one. The
    /// completion channel makes this loop the only writer of the state slot.
    #[tracing::instrument(skip_all, fields(source = %self.url, interval_secs = self.interval.as_secs()))]
    async fn run(self, state: Arc<watch::Sender<DashboardState>>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let mut ticker = tokio::time::interval(self.interval);
        let mut next_generation = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let generation = next_generation;
                    next_generation += 1;
                    self.issue_refresh(generation, done_tx.clone());
                }
                Some((generation, result)) = done_rx.recv() => {
                    let mut applied = false;
                    state.send_if_modified(|s| {
                        applied = s.apply(generation, result);
                        applied
                    });
                    if applied {
                        debug!(generation, "Refresh applied");
                    }
                }
            }
        }
    }

    fn issue_refresh(&self, generation: u64, done_tx: mpsc::UnboundedSender<Completion>) {
        let client = self.client.clone();
        let url = self.url.clone();
        let span = tracing::info_span!("refresh", generation);

        tokio::spawn(
            async move {
                let pipeline = tokio::spawn(async move { fetch_snapshot(client.as_ref(), &url).await });
                let result = pipeline
                    .await
                    .map_err(|e| anyhow!("refresh task failed: {e}"));
                let _ = done_tx.send((generation, result));
            }
            .instrument(span),
        );
    }
}

/// Read side of a running [`Poller`], plus user selection.
pub struct PollerHandle {
    state: Arc<watch::Sender<DashboardState>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// Copy of the current dashboard state.
    pub fn current(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Selects a bus by display id. See [`DashboardState::select`].
    pub fn select(&self, bus_id: &str) -> Result<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|s| match s.select(bus_id) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    pub fn clear_selection(&self) {
        self.state.send_modify(DashboardState::clear_selection);
    }

    /// Stops issuing refreshes. In-flight refreshes finish but are not applied.
    pub fn stop(self) {
        info!("Stopping transportation data poller");
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedResponse;
    use crate::pipeline::tests::{ROUTE_SEVEN, ScriptedClient};
    use crate::poller::state::{LOAD_ERROR_MESSAGE, Phase};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const URL: &str = "https://example.org/transit";

    async fn wait_for<F>(rx: &mut watch::Receiver<DashboardState>, pred: F) -> DashboardState
    where
        F: FnMut(&DashboardState) -> bool,
    {
        let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
            .await
            .expect("timed out waiting for dashboard state")
            .expect("poller stopped");
        state.clone()
    }

    #[tokio::test]
    async fn test_first_refresh_selects_active_bus() {
        let handle = Poller::new(ScriptedClient::ok(200, ROUTE_SEVEN), URL).spawn();
        let mut rx = handle.subscribe();

        let state = wait_for(&mut rx, |s| !s.is_loading()).await;
        assert_eq!(state.snapshot.buses.len(), 1);
        assert_eq!(state.selected_bus_id.as_deref(), Some("Bus 1"));
        assert_eq!(state.error, None);

        handle.stop();
    }

    #[tokio::test]
    async fn test_http_failure_shows_empty_snapshot() {
        let handle = Poller::new(ScriptedClient::ok(500, ""), URL).spawn();
        let mut rx = handle.subscribe();

        let state = wait_for(&mut rx, |s| s.phase == Phase::Ready).await;
        assert!(state.snapshot.is_empty());
        assert!(state.last_fallback.is_some());
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_keeps_polling_on_interval() {
        let handle = Poller::new(ScriptedClient::ok(200, ROUTE_SEVEN), URL)
            .with_interval(Duration::from_millis(20))
            .spawn();
        let mut rx = handle.subscribe();

        let state = wait_for(&mut rx, |s| s.refresh_count >= 3).await;
        assert_eq!(state.snapshot.buses[0].name, "Route 7");
    }

    #[tokio::test]
    async fn test_select_through_handle() {
        let handle = Poller::new(ScriptedClient::ok(200, ROUTE_SEVEN), URL).spawn();
        let mut rx = handle.subscribe();
        wait_for(&mut rx, |s| !s.is_loading()).await;

        assert!(handle.select("Bus 4").is_err());
        handle.clear_selection();
        assert_eq!(handle.current().selected_bus_id, None);
        handle.select("Bus 1").unwrap();
        assert_eq!(handle.current().selected_bus().unwrap().name, "Route 7");
    }

    /// First call answers late with two buses, second answers at once with
    /// one bus, later calls never answer.
    struct SlowFirstClient {
        calls: AtomicUsize,
        slow_done: Arc<AtomicBool>,
    }

    #[async_trait]
    impl HttpClient for SlowFirstClient {
        async fn execute(&self, _req: reqwest::Request) -> Result<FetchedResponse> {
            let body = match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    let mut two_buses: serde_json::Value = serde_json::from_str(ROUTE_SEVEN)?;
                    let line = two_buses["bus_lines"][0].clone();
                    two_buses["bus_lines"] = serde_json::Value::Array(vec![line.clone(), line]);
                    self.slow_done.store(true, Ordering::SeqCst);
                    serde_json::to_vec(&two_buses)?
                }
                1 => ROUTE_SEVEN.as_bytes().to_vec(),
                _ => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Vec::new()
                }
            };
            Ok(FetchedResponse {
                status: reqwest::StatusCode::OK,
                body,
            })
        }
    }

    #[tokio::test]
    async fn test_slow_earlier_refresh_does_not_overwrite_newer() {
        let slow_done = Arc::new(AtomicBool::new(false));
        let client = SlowFirstClient {
            calls: AtomicUsize::new(0),
            slow_done: slow_done.clone(),
        };
        let handle = Poller::new(client, URL)
            .with_interval(Duration::from_millis(50))
            .spawn();
        let mut rx = handle.subscribe();

        let state = wait_for(&mut rx, |s| !s.is_loading()).await;
        assert_eq!(state.snapshot.buses.len(), 1);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !slow_done.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("slow refresh never finished");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = handle.current();
        assert_eq!(state.snapshot.buses.len(), 1);
        assert_eq!(state.refresh_count, 1);
    }

    struct PanickingClient;

    #[async_trait]
    impl HttpClient for PanickingClient {
        async fn execute(&self, _req: reqwest::Request) -> Result<FetchedResponse> {
            panic!("client exploded");
        }
    }

    #[tokio::test]
    async fn test_pipeline_panic_raises_error_banner() {
        let handle = Poller::new(PanickingClient, URL).spawn();
        let mut rx = handle.subscribe();

        let state = wait_for(&mut rx, |s| s.phase == Phase::Ready).await;
        assert_eq!(state.error.as_deref(), Some(LOAD_ERROR_MESSAGE));
        assert!(state.snapshot.is_empty());
    }
}
