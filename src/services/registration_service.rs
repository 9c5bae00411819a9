use crate::adapters::crm_api::SubscriptionApi;
use crate::adapters::platform::{AlertSink, PushPlatform};
use crate::adapters::storage::CredentialStore;
use crate::config::{ApiConfig, WorkerConfig};
use crate::domain::{ApplicationServerKey, Permission, PushSubscription, SubscribeOptions, WorkerRegistration};
use crate::error::{PushError, Result};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    attempts_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("crm-push");
        Self {
            attempts_total: meter
                .u64_counter("push_subscribe_attempts_total")
                .with_description("Total push subscription attempts by outcome")
                .build(),
        }
    }
}

/// Non-error results of [`RegistrationService::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed { notification_sent: bool },
    Unsupported,
    PermissionDenied,
    MissingCredential,
    /// The server answered `success: false`.
    Rejected { message: Option<String> },
}

impl SubscribeOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Subscribed { .. } => "subscribed",
            Self::Unsupported => "unsupported",
            Self::PermissionDenied => "permission_denied",
            Self::MissingCredential => "missing_credential",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Enables web push for the current user: permission, worker, subscription, upload.
#[derive(Debug, Clone)]
pub struct RegistrationService {
    platform: Arc<dyn PushPlatform>,
    api: Arc<dyn SubscriptionApi>,
    credentials: Arc<dyn CredentialStore>,
    alerts: Arc<dyn AlertSink>,
    options: SubscribeOptions,
    script_path: String,
    scope: String,
    token_key: String,
    metrics: Metrics,
}

impl RegistrationService {
    /// # Errors
    /// Returns `PushError::InvalidKey` if the configured VAPID key does not decode.
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        api: Arc<dyn SubscriptionApi>,
        credentials: Arc<dyn CredentialStore>,
        alerts: Arc<dyn AlertSink>,
        api_config: &ApiConfig,
        worker_config: &WorkerConfig,
    ) -> Result<Self> {
        let key = ApplicationServerKey::from_base64url(&api_config.vapid_public_key)?;
        Ok(Self {
            platform,
            api,
            credentials,
            alerts,
            options: SubscribeOptions::new(key),
            script_path: worker_config.script_path.clone(),
            scope: worker_config.scope.clone(),
            token_key: api_config.token_storage_key.clone(),
            metrics: Metrics::new(),
        })
    }

    #[must_use]
    pub fn platform(&self) -> &dyn PushPlatform {
        self.platform.as_ref()
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Runs the whole enable flow once.
    ///
    /// Errors are logged, and storage or subscription failures have already been shown to
    /// the user when this returns; callers only need to keep the status unchanged.
    ///
    /// # Errors
    /// Returns the failure that aborted the flow. Nothing is retried.
    #[tracing::instrument(skip(self), fields(scope = %self.scope))]
    pub async fn subscribe(&self) -> Result<SubscribeOutcome> {
        let result = self.run().await;
        match &result {
            Ok(outcome) => {
                self.metrics.attempts_total.add(1, &[KeyValue::new("outcome", outcome.label())]);
            }
            Err(e) => {
                tracing::error!(error = %e, "Enabling push notifications failed");
                self.metrics.attempts_total.add(1, &[KeyValue::new("outcome", "error")]);
                if let Some(message) = e.user_message() {
                    self.alerts.alert(message);
                }
            }
        }
        result
    }

    async fn run(&self) -> Result<SubscribeOutcome> {
        if !self.platform.supports_push() {
            tracing::info!("Push messaging unsupported, nothing to do");
            return Ok(SubscribeOutcome::Unsupported);
        }

        if !self.ensure_permission().await {
            tracing::info!("Notification permission not granted");
            return Ok(SubscribeOutcome::PermissionDenied);
        }

        self.ensure_registration().await?;
        let registration = self.platform.ready(&self.scope).await.map_err(PushError::from_subscribe)?;
        let subscription = self.ensure_subscription(&registration).await?;

        let Some(token) = self.credentials.get(&self.token_key) else {
            tracing::warn!(key = %self.token_key, "No auth token in storage, skipping subscription upload");
            return Ok(SubscribeOutcome::MissingCredential);
        };

        let ack = self.api.upload(&subscription, &token).await?;
        if ack.success {
            tracing::info!(endpoint = %subscription.endpoint, "Push subscription stored by server");
            Ok(SubscribeOutcome::Subscribed { notification_sent: ack.notification_sent.unwrap_or(false) })
        } else {
            tracing::warn!(message = ?ack.message, "Server rejected push subscription");
            Ok(SubscribeOutcome::Rejected { message: ack.message })
        }
    }

    async fn ensure_permission(&self) -> bool {
        if self.platform.permission().await == Permission::Granted {
            return true;
        }
        self.platform.request_permission().await == Permission::Granted
    }

    async fn ensure_registration(&self) -> Result<WorkerRegistration> {
        if let Some(existing) = self.platform.registration(&self.scope).await? {
            tracing::debug!(state = ?existing.state, "Reusing worker registration");
            return Ok(existing);
        }

        tracing::info!(script = %self.script_path, "Registering background worker");
        self.platform.register(&self.script_path, &self.scope).await.map_err(PushError::from_registration)
    }

    async fn ensure_subscription(&self, registration: &WorkerRegistration) -> Result<PushSubscription> {
        let existing = self.platform.subscription(registration).await.map_err(PushError::from_subscribe)?;
        if let Some(existing) = existing {
            tracing::debug!("Reusing existing push subscription");
            return Ok(existing);
        }

        let subscription =
            self.platform.subscribe(registration, &self.options).await.map_err(PushError::from_subscribe)?;
        tracing::info!(endpoint = %subscription.endpoint, "Created push subscription");
        Ok(subscription)
    }
}
