use crate::adapters::platform::WorkerScope;
use crate::config::WorkerConfig;
use crate::domain::{NotificationPayload, ShownNotification};
use crate::workers::dedup::DedupWindow;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::task::TaskTracker;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    received_total: Counter<u64>,
    suppressed_total: Counter<u64>,
    shown_total: Counter<u64>,
    clicks_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("crm-push");
        Self {
            received_total: meter
                .u64_counter("push_received_total")
                .with_description("Total push events delivered to the worker")
                .build(),
            suppressed_total: meter
                .u64_counter("push_suppressed_total")
                .with_description("Push events dropped by the dedup window or for lacking a payload")
                .build(),
            shown_total: meter
                .u64_counter("notifications_shown_total")
                .with_description("Total notification display attempts")
                .build(),
            clicks_total: meter
                .u64_counter("notification_clicks_total")
                .with_description("Total notification clicks routed to a window")
                .build(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Active,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushEvent {
    pub data: Option<Vec<u8>>,
}

impl PushEvent {
    #[must_use]
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self { data: Some(data.into()) }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self { data: None }
    }
}

#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Push(PushEvent),
    NotificationClick(ShownNotification),
}

/// The background worker: turns push events into notifications and routes clicks.
///
/// Events are handled one at a time through `&mut self`, so the dedup state needs no
/// lock. Displays are spawned on a tracker, which keeps the worker alive until they
/// settle.
#[derive(Debug)]
pub struct NotificationWorker {
    scope: Arc<dyn WorkerScope>,
    state: LifecycleState,
    dedup: DedupWindow,
    default_icon: String,
    tracker: TaskTracker,
    metrics: Metrics,
}

impl NotificationWorker {
    #[must_use]
    pub fn new(scope: Arc<dyn WorkerScope>, config: &WorkerConfig) -> Self {
        Self {
            scope,
            state: LifecycleState::Installing,
            dedup: DedupWindow::new(Duration::from_millis(config.dedup_window_ms)),
            default_icon: config.default_icon.clone(),
            tracker: TaskTracker::new(),
            metrics: Metrics::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Number of displays still in flight.
    #[must_use]
    pub fn pending_displays(&self) -> usize {
        self.tracker.len()
    }

    pub async fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Install => self.on_install().await,
            WorkerEvent::Activate => self.on_activate().await,
            WorkerEvent::Push(push) => {
                self.on_push(push);
            }
            WorkerEvent::NotificationClick(notification) => self.on_notification_click(&notification).await,
        }
    }

    /// Consumes events until the sender side closes or shutdown is signalled, then waits for
    /// in-flight displays.
    pub async fn run(mut self, mut events: mpsc::Receiver<WorkerEvent>, mut shutdown: watch::Receiver<bool>) {
        while !*shutdown.borrow() {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle(event).await,
                        None => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!(pending = self.pending_displays(), "Notification worker shutting down...");
        self.drain().await;
    }

    /// Waits until every scheduled display has settled.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    #[tracing::instrument(skip(self))]
    pub async fn on_install(&mut self) {
        self.state = LifecycleState::Installing;
        if let Err(e) = self.scope.skip_waiting().await {
            tracing::warn!(error = %e, "skip_waiting failed");
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn on_activate(&mut self) {
        if let Err(e) = self.scope.claim_clients().await {
            tracing::warn!(error = %e, "Failed to claim open clients");
        }
        self.state = LifecycleState::Active;
        tracing::info!("Notification worker active");
    }

    /// Handles one push delivery. Returns whether a display was scheduled.
    #[tracing::instrument(skip_all)]
    pub fn on_push(&mut self, event: PushEvent) -> bool {
        self.metrics.received_total.add(1, &[]);

        let Some(data) = event.data else {
            tracing::debug!("Push event without payload, ignoring");
            self.metrics.suppressed_total.add(1, &[KeyValue::new("reason", "empty")]);
            return false;
        };

        if !self.dedup.admit(tokio::time::Instant::now()) {
            tracing::debug!("Push event inside dedup window, suppressing");
            self.metrics.suppressed_total.add(1, &[KeyValue::new("reason", "duplicate")]);
            return false;
        }

        let (title, options) = NotificationPayload::parse(&data).into_display(&self.default_icon);
        tracing::debug!(%title, tag = %options.tag, "Scheduling notification");

        let scope = Arc::clone(&self.scope);
        let metrics = self.metrics.clone();
        self.tracker.spawn(
            async move {
                match scope.show_notification(&title, &options).await {
                    Ok(()) => metrics.shown_total.add(1, &[KeyValue::new("status", "shown")]),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to show notification");
                        metrics.shown_total.add(1, &[KeyValue::new("status", "error")]);
                    }
                }
            }
            .instrument(tracing::debug_span!("show_notification")),
        );
        true
    }

    /// Closes the clicked notification and brings up its target page.
    #[tracing::instrument(skip_all, fields(url = %notification.target_url()))]
    pub async fn on_notification_click(&self, notification: &ShownNotification) {
        self.metrics.clicks_total.add(1, &[]);
        if let Err(e) = self.scope.close_notification(notification).await {
            tracing::warn!(error = %e, "Failed to close notification");
        }

        let url = notification.target_url();
        let existing = match self.scope.window_clients().await {
            Ok(clients) => clients.into_iter().find(|c| c.url == url),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list window clients");
                None
            }
        };

        if let Some(client) = existing
            && self.scope.focus(&client.id).await.is_ok()
        {
            tracing::debug!(client_id = %client.id, "Focused existing window");
            return;
        }

        if let Err(e) = self.scope.open_window(url).await {
            tracing::error!(error = %e, "Failed to open window for notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::platform::InMemoryWorkerScope;

    fn worker(scope: &Arc<InMemoryWorkerScope>) -> NotificationWorker {
        NotificationWorker::new(Arc::clone(scope) as Arc<dyn WorkerScope>, &WorkerConfig::default())
    }

    #[tokio::test]
    async fn test_lifecycle_skips_waiting_and_claims() {
        let scope = Arc::new(InMemoryWorkerScope::new());
        let mut worker = worker(&scope);
        assert_eq!(worker.state(), LifecycleState::Installing);

        worker.handle(WorkerEvent::Install).await;
        assert!(scope.skipped_waiting());
        worker.handle(WorkerEvent::Activate).await;
        assert!(scope.clients_claimed());
        assert_eq!(worker.state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_empty_push_does_not_consume_window() {
        let scope = Arc::new(InMemoryWorkerScope::new());
        let mut worker = worker(&scope);

        assert!(!worker.on_push(PushEvent::empty()));
        // The next real payload is still admitted.
        assert!(worker.on_push(PushEvent::with_data(r#"{"title":"T","body":"B"}"#)));
        worker.drain().await;
        assert_eq!(scope.shown_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_still_updates_window() {
        let scope = Arc::new(InMemoryWorkerScope::new());
        let mut worker = worker(&scope);

        assert!(worker.on_push(PushEvent::with_data("{broken")));
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!worker.on_push(PushEvent::with_data(r#"{"title":"T"}"#)));
        worker.drain().await;

        let shown = scope.notifications();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "New notification");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_slow_display() {
        let scope = Arc::new(InMemoryWorkerScope::new().with_display_delay(Duration::from_secs(3)));
        let mut worker = worker(&scope);

        worker.on_push(PushEvent::with_data(r#"{"title":"Slow"}"#));
        assert_eq!(worker.pending_displays(), 1);
        assert_eq!(scope.shown_total(), 0);

        worker.drain().await;
        assert_eq!(worker.pending_displays(), 0);
        assert_eq!(scope.shown_total(), 1);
    }

    #[tokio::test]
    async fn test_click_focuses_existing_window() {
        let scope = Arc::new(InMemoryWorkerScope::new());
        let client_id = scope.add_client("/leads/5");
        let mut worker = worker(&scope);

        worker.on_push(PushEvent::with_data(r#"{"data":{"type":"lead_assigned","url":"/leads/5"}}"#));
        worker.drain().await;
        let notification = scope.notifications().remove(0);

        worker.on_notification_click(&notification).await;

        assert!(scope.opened_windows().is_empty());
        assert!(scope.clients().iter().any(|c| c.id == client_id && c.focused));
        assert!(scope.notifications().is_empty());
    }
}
