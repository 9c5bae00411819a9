use crate::adapters::platform::PushPlatform;
use crate::domain::SwStatus;
use crate::services::registration_service::{RegistrationService, SubscribeOutcome};

/// Derives the notification status from the platform. Never cached.
#[tracing::instrument(level = "debug", skip(platform))]
pub async fn query_status(platform: &dyn PushPlatform, scope: &str) -> SwStatus {
    if !platform.supports_push() {
        return SwStatus::Unsupported;
    }

    let registration = match platform.registration(scope).await {
        Ok(Some(registration)) => registration,
        Ok(None) => return SwStatus::Inactive,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to look up worker registration");
            return SwStatus::Inactive;
        }
    };

    match platform.subscription(&registration).await {
        Ok(Some(_)) => SwStatus::Active,
        Ok(None) => SwStatus::Inactive,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to look up push subscription");
            SwStatus::Inactive
        }
    }
}

/// Backs the notification toggle: one status query per mount, plus the enable action.
#[derive(Debug)]
pub struct StatusObserver {
    registration: RegistrationService,
    status: SwStatus,
}

impl StatusObserver {
    pub async fn mount(registration: RegistrationService) -> Self {
        let status = query_status(registration.platform(), registration.scope()).await;
        tracing::debug!(?status, "Notification status resolved");
        Self { registration, status }
    }

    #[must_use]
    pub const fn status(&self) -> SwStatus {
        self.status
    }

    /// Runs the enable flow. Only a server-acknowledged subscription flips the status to
    /// active; every other result leaves it as it was.
    pub async fn enable(&mut self) -> SwStatus {
        match self.registration.subscribe().await {
            Ok(SubscribeOutcome::Subscribed { .. }) => self.status = SwStatus::Active,
            Ok(outcome) => tracing::info!(?outcome, "Notifications not enabled"),
            Err(_) => {}
        }
        self.status
    }

    /// Re-runs the status query, e.g. after the subscription may have been revoked.
    pub async fn refresh(&mut self) -> SwStatus {
        self.status = query_status(self.registration.platform(), self.registration.scope()).await;
        self.status
    }
}
