// ── Polling coordinator ──
//
// Runs poll cycles against the Minut API and publishes one immutable
// `Snapshot` per successful cycle. Owns the current token set (rotated in
// place on 401 via the refresh grant, broadcast so the host can persist
// it), the cached device list, and an optional background refresh loop.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::try_join_all;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use minutly_api::{Device, MinutClient, TimelineEvent, Tokens};

use crate::config::{CoordinatorConfig, EventSource};
use crate::error::CoreError;
use crate::model::{DeviceSnapshot, Snapshot};

// ── CoordinatorHealth ────────────────────────────────────────────

/// Outcome of the most recent cycle, observable by hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorHealth {
    /// No cycle has completed yet.
    Pending,
    Healthy,
    /// Transient failure; the next cycle may succeed.
    Unavailable { reason: String },
    /// The host should widen its polling interval.
    RateLimited { retry_after_secs: Option<u64> },
    /// Credentials were rejected; only new credentials will help.
    ReauthRequired { message: String },
}

impl CoordinatorHealth {
    fn from_error(err: &CoreError) -> Self {
        match err.root() {
            CoreError::AuthenticationFailed { message } => Self::ReauthRequired {
                message: message.clone(),
            },
            CoreError::RateLimited { retry_after_secs } => Self::RateLimited {
                retry_after_secs: *retry_after_secs,
            },
            other => Self::Unavailable {
                reason: other.to_string(),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Polls the Minut API and publishes per-device snapshots.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Call
/// [`refresh()`](Self::refresh) from an external scheduler, or
/// [`start()`](Self::start) to run the first cycle and spawn a
/// background loop at `scan_interval`.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    client: MinutClient,
    config: CoordinatorConfig,
    tokens: watch::Sender<Tokens>,
    /// Serializes token refreshes across concurrent requests.
    refresh_lock: Mutex<()>,
    /// Serializes poll cycles.
    cycle_lock: Mutex<()>,
    /// Populated by the first successful device listing; only
    /// `invalidate_devices()` clears it.
    devices: Mutex<Option<Arc<Vec<Device>>>>,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    health: watch::Sender<CoordinatorHealth>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator. Does NOT poll -- call [`refresh()`](Self::refresh)
    /// or [`start()`](Self::start).
    pub fn new(client: MinutClient, tokens: Tokens, config: CoordinatorConfig) -> Self {
        let (tokens, _) = watch::channel(tokens);
        let (snapshot, _) = watch::channel(None);
        let (health, _) = watch::channel(CoordinatorHealth::Pending);

        Self {
            inner: Arc::new(CoordinatorInner {
                client,
                config,
                tokens,
                refresh_lock: Mutex::new(()),
                cycle_lock: Mutex::new(()),
                devices: Mutex::new(None),
                snapshot,
                health,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &MinutClient {
        &self.inner.client
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the first cycle, then spawn the background refresh loop.
    ///
    /// A failing first cycle is reported as [`CoreError::NotReady`] and
    /// no loop is spawned.
    pub async fn start(&self) -> Result<Arc<Snapshot>, CoreError> {
        let snapshot = self.first_refresh().await?;

        let interval = self.inner.config.scan_interval;
        if !interval.is_zero() {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(ctrl, interval, cancel)));
            debug!(?interval, "background refresh started");
        }

        Ok(snapshot)
    }

    /// Stop the background loop and wait for it to exit. The coordinator
    /// can still be refreshed manually afterwards.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("coordinator stopped");
    }

    /// Run one cycle, wrapping any failure as [`CoreError::NotReady`].
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.refresh().await.map_err(|e| CoreError::NotReady {
            source: Box::new(e),
        })
    }

    // ── Poll cycle ───────────────────────────────────────────────

    /// Run one poll cycle and publish its snapshot.
    ///
    /// Any error aborts the whole cycle: the previously published
    /// snapshot stays in place and health reflects the failure.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        let _cycle = self.inner.cycle_lock.lock().await;

        match self.run_cycle().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
                self.inner.health.send_replace(CoordinatorHealth::Healthy);
                debug!(devices = snapshot.len(), "poll cycle complete");
                Ok(snapshot)
            }
            Err(e) => {
                self.inner
                    .health
                    .send_replace(CoordinatorHealth::from_error(&e));
                warn!(error = %e, "poll cycle failed");
                Err(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<Snapshot, CoreError> {
        let devices = self.load_devices().await?;
        let seen = self.recent_event_types(&devices).await?;
        let client = &self.inner.client;
        let triggers = &self.inner.config.triggers;
        let none = BTreeSet::new();

        let per_device = try_join_all(devices.iter().filter_map(|device| {
            let id = device.id()?;
            let seen = seen.get(&id).unwrap_or(&none);
            Some(async move {
                let values = self
                    .authorized(|t| {
                        let id = id.as_str();
                        async move { client.get_latest_values(&t, id).await }
                    })
                    .await?;
                let snap = DeviceSnapshot::build(device.clone(), &values, seen, triggers);
                Ok::<_, CoreError>((id, snap))
            })
        }))
        .await?;

        Ok(Snapshot {
            taken_at: Utc::now(),
            devices: per_device.into_iter().collect(),
        })
    }

    /// The cached device list, fetched on first use.
    async fn load_devices(&self) -> Result<Arc<Vec<Device>>, CoreError> {
        let mut cache = self.inner.devices.lock().await;
        if let Some(ref devices) = *cache {
            return Ok(Arc::clone(devices));
        }

        let client = &self.inner.client;
        let listed = self
            .authorized(|t| async move { client.get_devices(&t).await })
            .await?;

        let devices: Vec<Device> = listed
            .into_iter()
            .filter(|device| {
                let has_id = device.id().is_some();
                if !has_id {
                    warn!("skipping device without an id");
                }
                has_id
            })
            .collect();
        info!(count = devices.len(), "device list loaded");

        let devices = Arc::new(devices);
        *cache = Some(Arc::clone(&devices));
        Ok(devices)
    }

    /// Event types seen per device inside the recency window.
    async fn recent_event_types(
        &self,
        devices: &[Device],
    ) -> Result<BTreeMap<String, BTreeSet<String>>, CoreError> {
        let client = &self.inner.client;
        let within = self.inner.config.event_window;

        let events: Vec<TimelineEvent> = match self.inner.config.event_source {
            EventSource::Account => {
                self.authorized(|t| async move { client.get_account_events(&t, within).await })
                    .await?
            }
            EventSource::PerDevice => {
                let ids: Vec<String> = devices.iter().filter_map(Device::id).collect();
                try_join_all(ids.iter().map(|id| {
                    self.authorized(move |t| async move {
                        client.get_recent_events(&t, id, within).await
                    })
                }))
                .await?
                .into_iter()
                .flatten()
                .collect()
            }
        };

        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for event in events {
            grouped
                .entry(event.device_id)
                .or_default()
                .insert(event.event_type);
        }
        Ok(grouped)
    }

    // ── Token handling ───────────────────────────────────────────

    /// Run `op` with the current tokens. On an authentication failure,
    /// rotate once via the refresh grant and retry once. Never falls back
    /// to a password exchange.
    async fn authorized<T, F, Fut>(&self, op: F) -> Result<T, CoreError>
    where
        F: Fn(Tokens) -> Fut,
        Fut: Future<Output = Result<T, minutly_api::Error>>,
    {
        let tokens = self.current_tokens();
        match op(tokens.clone()).await {
            Err(e) if e.is_auth_error() && tokens.has_refresh_token() => {
                debug!("access token rejected, refreshing");
                let refreshed = self.rotate_tokens(&tokens).await?;
                Ok(op(refreshed).await?)
            }
            other => Ok(other?),
        }
    }

    /// Single-flight refresh: if another task already replaced `stale`,
    /// reuse its result instead of spending the refresh token again.
    async fn rotate_tokens(&self, stale: &Tokens) -> Result<Tokens, CoreError> {
        let _guard = self.inner.refresh_lock.lock().await;

        let current = self.current_tokens();
        if !current.same_access_token(stale) {
            debug!("token already rotated by a concurrent request");
            return Ok(current);
        }

        let refreshed = self.inner.client.refresh_tokens(&current).await?;
        self.inner.tokens.send_replace(refreshed.clone());
        info!("access token rotated");
        Ok(refreshed)
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to token rotations, e.g. to persist them.
    pub fn tokens(&self) -> watch::Receiver<Tokens> {
        self.inner.tokens.subscribe()
    }

    pub fn current_tokens(&self) -> Tokens {
        self.inner.tokens.borrow().clone()
    }

    /// Subscribe to published snapshots. `None` until the first success.
    pub fn snapshots(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn health(&self) -> watch::Receiver<CoordinatorHealth> {
        self.inner.health.subscribe()
    }

    // ── Device cache ─────────────────────────────────────────────

    /// The cached device list, if loaded.
    pub async fn cached_devices(&self) -> Option<Arc<Vec<Device>>> {
        self.inner.devices.lock().await.clone()
    }

    /// Drop the cached device list so the next cycle lists devices again.
    pub async fn invalidate_devices(&self) {
        *self.inner.devices.lock().await = None;
        debug!("device cache invalidated");
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn refresh_task(coordinator: Coordinator, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                // Failures are already logged and reflected in health.
                let _ = coordinator.refresh().await;
            }
        }
    }
}
