use super::{AlertSink, PushPlatform, WindowClient, WorkerScope};
use crate::domain::{
    NotificationOptions, Permission, PushSubscription, PushSubscriptionKeys, ShownNotification, SubscribeOptions,
    WorkerRegistration, WorkerState,
};
use crate::error::PlatformError;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use dashmap::DashMap;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Browser stand-in used by the simulator binary and the tests.
#[derive(Debug)]
pub struct InMemoryPlatform {
    supported: AtomicBool,
    permission: Mutex<Permission>,
    prompt_answer: Mutex<Permission>,
    prompts_shown: AtomicUsize,
    registrations: DashMap<String, Arc<watch::Sender<WorkerRegistration>>>,
    subscriptions: DashMap<String, PushSubscription>,
    subscriptions_created: AtomicUsize,
    activation_delay: Duration,
    push_service_url: String,
    register_failure: Mutex<Option<PlatformError>>,
    subscribe_failure: Mutex<Option<PlatformError>>,
    lookup_failure: Mutex<Option<PlatformError>>,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: AtomicBool::new(true),
            permission: Mutex::new(Permission::Default),
            prompt_answer: Mutex::new(Permission::Granted),
            prompts_shown: AtomicUsize::new(0),
            registrations: DashMap::new(),
            subscriptions: DashMap::new(),
            subscriptions_created: AtomicUsize::new(0),
            activation_delay: Duration::ZERO,
            push_service_url: "https://push.example.net/wpush".to_string(),
            register_failure: Mutex::new(None),
            subscribe_failure: Mutex::new(None),
            lookup_failure: Mutex::new(None),
        }
    }

    /// Delay between installing a worker and it becoming active.
    #[must_use]
    pub const fn with_activation_delay(mut self, delay: Duration) -> Self {
        self.activation_delay = delay;
        self
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    pub fn set_permission(&self, permission: Permission) {
        *lock(&self.permission) = permission;
    }

    /// What the user picks when the permission prompt is shown.
    pub fn answer_prompts_with(&self, answer: Permission) {
        *lock(&self.prompt_answer) = answer;
    }

    pub fn fail_next_register(&self, err: PlatformError) {
        *lock(&self.register_failure) = Some(err);
    }

    pub fn fail_next_subscribe(&self, err: PlatformError) {
        *lock(&self.subscribe_failure) = Some(err);
    }

    pub fn fail_next_subscription_lookup(&self, err: PlatformError) {
        *lock(&self.lookup_failure) = Some(err);
    }

    /// Drops the subscription for `scope`, as a push service revocation would.
    pub fn revoke_subscription(&self, scope: &str) {
        self.subscriptions.remove(scope);
    }

    pub fn prompts_shown(&self) -> usize {
        self.prompts_shown.load(Ordering::SeqCst)
    }

    pub fn subscriptions_created(&self) -> usize {
        self.subscriptions_created.load(Ordering::SeqCst)
    }

    fn generate_subscription(&self) -> PushSubscription {
        let mut rng = rand::thread_rng();
        let mut p256dh = [0u8; 65];
        rng.fill_bytes(&mut p256dh);
        p256dh[0] = 0x04;
        let mut auth = [0u8; 16];
        rng.fill_bytes(&mut auth);

        PushSubscription {
            endpoint: format!("{}/{}", self.push_service_url, Uuid::new_v4()),
            expiration_time: None,
            keys: PushSubscriptionKeys { p256dh: URL_SAFE_NO_PAD.encode(p256dh), auth: URL_SAFE_NO_PAD.encode(auth) },
        }
    }
}

#[async_trait]
impl PushPlatform for InMemoryPlatform {
    fn supports_push(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    async fn permission(&self) -> Permission {
        *lock(&self.permission)
    }

    async fn request_permission(&self) -> Permission {
        self.prompts_shown.fetch_add(1, Ordering::SeqCst);
        let answer = *lock(&self.prompt_answer);
        *lock(&self.permission) = answer;
        answer
    }

    async fn registration(&self, scope: &str) -> Result<Option<WorkerRegistration>, PlatformError> {
        Ok(self.registrations.get(scope).map(|tx| tx.borrow().clone()))
    }

    async fn register(&self, script_url: &str, scope: &str) -> Result<WorkerRegistration, PlatformError> {
        if let Some(err) = lock(&self.register_failure).take() {
            return Err(err);
        }
        if let Some(existing) = self.registrations.get(scope) {
            return Ok(existing.borrow().clone());
        }

        let registration = WorkerRegistration {
            scope: scope.to_string(),
            script_url: script_url.to_string(),
            state: WorkerState::Installing,
        };
        let tx = Arc::new(watch::Sender::new(registration.clone()));
        self.registrations.insert(scope.to_string(), Arc::clone(&tx));

        let delay = self.activation_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_modify(|reg| reg.state = WorkerState::Active);
        });

        Ok(registration)
    }

    async fn ready(&self, scope: &str) -> Result<WorkerRegistration, PlatformError> {
        let tx = self
            .registrations
            .get(scope)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PlatformError::InvalidState(format!("no worker registered for scope {scope}")))?;

        let mut rx = tx.subscribe();
        let registration = rx
            .wait_for(WorkerRegistration::is_active)
            .await
            .map_err(|_| PlatformError::InvalidState("worker registration was dropped".into()))?
            .clone();
        Ok(registration)
    }

    async fn subscription(&self, registration: &WorkerRegistration) -> Result<Option<PushSubscription>, PlatformError> {
        if let Some(err) = lock(&self.lookup_failure).take() {
            return Err(err);
        }
        Ok(self.subscriptions.get(&registration.scope).map(|s| s.value().clone()))
    }

    async fn subscribe(
        &self,
        registration: &WorkerRegistration,
        options: &SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError> {
        if let Some(err) = lock(&self.subscribe_failure).take() {
            return Err(err);
        }
        if !options.user_visible_only {
            return Err(PlatformError::Other(anyhow::anyhow!("silent push subscriptions are not allowed")));
        }
        let active = self.registrations.get(&registration.scope).is_some_and(|tx| tx.borrow().is_active());
        if !active {
            return Err(PlatformError::InvalidState("subscribing requires an active worker".into()));
        }

        let subscription = self
            .subscriptions
            .entry(registration.scope.clone())
            .or_insert_with(|| {
                self.subscriptions_created.fetch_add(1, Ordering::SeqCst);
                self.generate_subscription()
            })
            .value()
            .clone();
        Ok(subscription)
    }
}

/// Worker-side stand-in that records what the worker asked the platform to do.
#[derive(Debug, Default)]
pub struct InMemoryWorkerScope {
    skipped_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    display_delay: Duration,
    shown_total: AtomicUsize,
    notifications: Mutex<Vec<ShownNotification>>,
    clients: Mutex<Vec<WindowClient>>,
    opened: Mutex<Vec<String>>,
}

impl InMemoryWorkerScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time the notification surface takes to display each notification.
    #[must_use]
    pub const fn with_display_delay(mut self, delay: Duration) -> Self {
        self.display_delay = delay;
        self
    }

    pub fn add_client(&self, url: &str) -> String {
        let id = Uuid::new_v4().to_string();
        lock(&self.clients).push(WindowClient { id: id.clone(), url: url.to_string(), focused: false });
        id
    }

    pub fn skipped_waiting(&self) -> bool {
        self.skipped_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Number of `show_notification` calls, collapsed or not.
    pub fn shown_total(&self) -> usize {
        self.shown_total.load(Ordering::SeqCst)
    }

    /// Notifications currently on screen.
    pub fn notifications(&self) -> Vec<ShownNotification> {
        lock(&self.notifications).clone()
    }

    pub fn clients(&self) -> Vec<WindowClient> {
        lock(&self.clients).clone()
    }

    pub fn opened_windows(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

#[async_trait]
impl WorkerScope for InMemoryWorkerScope {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        self.skipped_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        self.clients_claimed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result<(), PlatformError> {
        if !self.display_delay.is_zero() {
            tokio::time::sleep(self.display_delay).await;
        }
        tracing::info!(%title, body = %options.body, tag = %options.tag, "Displaying notification");
        let shown = ShownNotification { title: title.to_string(), options: options.clone() };

        let mut notifications = lock(&self.notifications);
        if let Some(existing) = notifications.iter_mut().find(|n| n.options.tag == options.tag) {
            *existing = shown;
        } else {
            notifications.push(shown);
        }
        self.shown_total.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_notification(&self, notification: &ShownNotification) -> Result<(), PlatformError> {
        lock(&self.notifications).retain(|n| n.options.tag != notification.options.tag);
        Ok(())
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, PlatformError> {
        Ok(self.clients())
    }

    async fn focus(&self, client_id: &str) -> Result<(), PlatformError> {
        let mut clients = lock(&self.clients);
        if !clients.iter().any(|c| c.id == client_id) {
            return Err(PlatformError::InvalidState(format!("unknown client {client_id}")));
        }
        for client in clients.iter_mut() {
            client.focused = client.id == client_id;
        }
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), PlatformError> {
        lock(&self.opened).push(url.to_string());
        let mut clients = lock(&self.clients);
        for client in clients.iter_mut() {
            client.focused = false;
        }
        clients.push(WindowClient { id: Uuid::new_v4().to_string(), url: url.to_string(), focused: true });
        Ok(())
    }
}

/// Alert sink that logs and remembers every alert.
#[derive(Debug, Default)]
pub struct RecordingAlerts {
    messages: Mutex<Vec<String>>,
}

impl RecordingAlerts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl AlertSink for RecordingAlerts {
    fn alert(&self, message: &str) {
        tracing::warn!(%message, "User alert");
        lock(&self.messages).push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VAPID_PUBLIC_KEY;
    use crate::domain::ApplicationServerKey;

    fn options() -> SubscribeOptions {
        SubscribeOptions::new(ApplicationServerKey::from_base64url(DEFAULT_VAPID_PUBLIC_KEY).unwrap())
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let platform = InMemoryPlatform::new();
        let first = platform.register("/sw.js", "/").await.unwrap();
        let second = platform.register("/sw.js", "/").await.unwrap();
        assert_eq!(first.scope, second.scope);
        assert_eq!(platform.registrations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_before_activation_fails() {
        let platform = InMemoryPlatform::new().with_activation_delay(Duration::from_secs(5));
        let registration = platform.register("/sw.js", "/").await.unwrap();

        let err = platform.subscribe(&registration, &options()).await.unwrap_err();
        assert!(matches!(err, PlatformError::InvalidState(_)));

        let ready = platform.ready("/").await.unwrap();
        assert!(ready.is_active());
        assert!(platform.subscribe(&ready, &options()).await.is_ok());
    }

    #[tokio::test]
    async fn test_ready_without_registration_errors() {
        let platform = InMemoryPlatform::new();
        assert!(platform.ready("/").await.is_err());
    }

    #[tokio::test]
    async fn test_same_tag_replaces_notification() {
        let scope = InMemoryWorkerScope::new();
        let (title, opts) = crate::domain::NotificationPayload::parse(br#"{"title":"A"}"#).into_display("/i.png");
        scope.show_notification(&title, &opts).await.unwrap();
        let (title, opts) = crate::domain::NotificationPayload::parse(br#"{"title":"B"}"#).into_display("/i.png");
        scope.show_notification(&title, &opts).await.unwrap();

        assert_eq!(scope.shown_total(), 2);
        let on_screen = scope.notifications();
        assert_eq!(on_screen.len(), 1);
        assert_eq!(on_screen[0].title, "B");
    }
}
